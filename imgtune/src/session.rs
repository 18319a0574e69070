//! Cookie based session identification
//!
//! Every request carries a `SessionContext` in its extensions. The
//! identifier comes from the signed `userToken` cookie, or is freshly minted
//! and sent back as a new cookie.

use crate::{config::InvalidTokenPolicy, error::AppError, server::AppState};
use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const TOKEN_COOKIE: &str = "userToken";

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(thiserror::Error, Debug)]
pub enum TokenError {
    #[error("{0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("userId is not a session identifier: {0}")]
    InvalidUserId(String),
}

/// HS256 signer for session tokens
#[derive(Clone)]
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl_secs: i64,
}

impl TokenSigner {
    pub fn new(secret: &str, ttl_days: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
            ttl_secs: ttl_days * 24 * 60 * 60,
        }
    }

    pub fn sign(&self, user_id: &str) -> Result<String, TokenError> {
        let iat = cutil::time::timestamp();
        let claims = Claims {
            user_id: user_id.to_string(),
            iat,
            exp: iat + self.ttl_secs,
        };

        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding,
        )?)
    }

    /// Check signature and expiry.
    ///
    /// The `userId` claim must be a UUID since it ends up in file names.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let claims = jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)?.claims;

        if Uuid::parse_str(&claims.user_id).is_err() {
            return Err(TokenError::InvalidUserId(claims.user_id));
        }

        Ok(claims)
    }
}

/// Session of the current request
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    pub user_id: Option<String>,
}

impl SessionContext {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
        }
    }
}

/// Session identifier of the current request, 401 without one
#[derive(Debug, Clone)]
pub struct CurrentUser(pub String);

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionContext>()
            .and_then(|ctx| ctx.user_id.clone())
            .map(CurrentUser)
            .ok_or(AppError::Unauthorized)
    }
}

pub fn token_cookie(token: String) -> Cookie<'static> {
    Cookie::build((TOKEN_COOKIE, token))
        .http_only(true)
        .secure(false)
        .path("/")
        .build()
}

/// Middleware attaching a `SessionContext` to every request
pub async fn session_layer(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let (ctx, new_token) = resolve_session(&state, &jar);
    req.extensions_mut().insert(ctx);

    let response = next.run(req).await;

    match new_token {
        Some(token) => (jar.add(token_cookie(token)), response).into_response(),
        None => response,
    }
}

fn resolve_session(state: &AppState, jar: &CookieJar) -> (SessionContext, Option<String>) {
    if let Some(cookie) = jar.get(TOKEN_COOKIE) {
        match state.signer().verify(cookie.value()) {
            Ok(claims) => return (SessionContext::new(claims.user_id), None),
            Err(e) => {
                log::warn!("verify {TOKEN_COOKIE} failed: {e}");

                if state.config().invalid_token_policy == InvalidTokenPolicy::Reject {
                    return (SessionContext::default(), None);
                }
            }
        }
    }

    let user_id = Uuid::new_v4().to_string();
    match state.signer().sign(&user_id) {
        Ok(token) => {
            log::info!("new session {user_id}");
            (SessionContext::new(user_id), Some(token))
        }
        Err(e) => {
            log::error!("sign session token failed: {e}");
            (SessionContext::default(), None)
        }
    }
}
