//! Image tuning web service
//!
//! Accepts an uploaded image per browser session, renders adjusted previews
//! and streams full size downloads.
//!
//! # Architecture
//! - `session`: signed cookie token to session identifier
//! - `logic`: upload, process and download handlers
//! - `db`: per session record of the original and preview files
//! - `server`: router, CORS, request log and the embedded front end

#[macro_use]
extern crate derivative;

pub mod config;
pub mod db;
pub mod error;
pub mod logic;
pub mod server;
pub mod session;
pub mod storage;


pub use config::{Config, InvalidTokenPolicy};
pub use error::AppError;
pub use server::{AppState, app_router, run};

/// Initializes the logger.
///
/// Lines look like `[HH:MM:SS LEVEL file line] message`. The level defaults
/// to `info` and follows `RUST_LOG` when set.
pub fn init_logger() {
    use std::io::Write;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let style = buf.default_level_style(record.level());
            let ts = cutil::time::local_now("%H:%M:%S");

            writeln!(
                buf,
                "[{} {style}{}{style:#} {} {}] {}",
                ts,
                record.level(),
                record
                    .file()
                    .unwrap_or("None")
                    .split('/')
                    .next_back()
                    .unwrap_or("None"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .init();
}
