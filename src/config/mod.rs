use std::env;
use std::path::PathBuf;

use crate::uploads::DEFAULT_MAX_UPLOAD_BYTES;

/// Process configuration, read once at startup. `.env` is loaded by main
/// before this runs.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub database_url: String,
    pub api_url: Option<String>,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub production: bool,
}

impl Config {
    pub fn from_env() -> Self {
        let port = env::var("PORT").unwrap_or_else(|_| "3000".into());
        let max_upload_bytes = env::var("MAX_UPLOAD_BYTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);
        Self {
            bind_addr: format!("0.0.0.0:{port}"),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://pedidos.db?mode=rwc".into()),
            api_url: env::var("API_URL").ok().filter(|v| !v.is_empty()),
            upload_dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("uploads")),
            max_upload_bytes,
            production: env::var("APP_ENV")
                .map(|v| v.eq_ignore_ascii_case("production"))
                .unwrap_or(false),
        }
    }
}
