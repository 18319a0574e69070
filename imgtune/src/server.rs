use crate::{
    config::Config,
    db::UserDb,
    logic,
    session::{TokenSigner, session_layer},
    storage::Storage,
};
use anyhow::{Context, Result};
use axum::{
    Router,
    extract::{DefaultBodyLimit, Request},
    middleware::{self, Next},
    response::{Html, Response},
    routing::{get, post},
};
use std::{sync::Arc, time::Instant};
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    services::ServeDir,
};

pub const WEB_INDEX: &str = include_str!("../web/index.html");

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    db: UserDb,
    storage: Storage,
    signer: TokenSigner,
}

impl AppState {
    /// Resolve the data and upload directories to absolute paths and create
    /// them when absent.
    pub fn new(mut config: Config) -> Result<Self> {
        config.data_dir = std::path::absolute(&config.data_dir)
            .with_context(|| format!("resolve {} failed", config.data_dir.display()))?;
        config.upload_dir = std::path::absolute(&config.upload_dir)
            .with_context(|| format!("resolve {} failed", config.upload_dir.display()))?;

        cutil::fs::ensure_dir(&config.data_dir)?;
        cutil::fs::ensure_dir(&config.upload_dir)?;

        log::info!("session records: {}", config.db_path().display());
        log::info!("upload directory: {}", config.upload_dir.display());

        Ok(Self {
            inner: Arc::new(AppStateInner {
                db: UserDb::new(config.db_path()),
                storage: Storage::new(&config.upload_dir),
                signer: TokenSigner::new(&config.jwt_secret, config.token_ttl_days),
                config,
            }),
        })
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn db(&self) -> &UserDb {
        &self.inner.db
    }

    pub fn storage(&self) -> &Storage {
        &self.inner.storage
    }

    pub fn signer(&self) -> &TokenSigner {
        &self.inner.signer
    }
}

/// Mirror the caller's origin and allow cookies
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

async fn log_request(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(req).await;

    log::info!(
        "{method} {path} {} {:.3} ms",
        response.status().as_u16(),
        start.elapsed().as_secs_f64() * 1000.0
    );
    response
}

async fn index() -> Html<&'static str> {
    Html(WEB_INDEX)
}

pub fn app_router(state: AppState) -> Router {
    let uploads = ServeDir::new(state.storage().upload_dir());

    Router::new()
        .route("/", get(index))
        .route("/upload", post(logic::upload))
        .route("/process", post(logic::process))
        .route("/download", get(logic::download))
        .nest_service("/uploads", uploads)
        .layer(middleware::from_fn_with_state(state.clone(), session_layer))
        .layer(DefaultBodyLimit::max(state.config().max_upload_bytes))
        .layer(cors_layer())
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

pub async fn run(config: Config) -> Result<()> {
    let addr = config.listen_addr();
    let state = AppState::new(config)?;

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("bind {addr} failed"))?;
    log::info!("Server running on http://{}", listener.local_addr()?);

    axum::serve(listener, app_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Server exit...");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::warn!("listen for ctrl-c failed: {e}");
        std::future::pending::<()>().await;
    }
    log::info!("Received Ctrl+C, shutting down...");
}
