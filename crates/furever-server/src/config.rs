use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use tracing::info;

const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

pub struct Config {
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    /// Photos travel inline as base64, so bodies run larger than axum's default.
    pub max_body_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let port = match env::var("FUREVER_PORT").or_else(|_| env::var("PORT")) {
            Ok(raw) => raw.parse().with_context(|| format!("Invalid port '{}'", raw))?,
            Err(_) => 8000,
        };

        Ok(Self {
            db_path: try_load("FUREVER_DB_PATH", "furever.db")?,
            host: try_load("FUREVER_HOST", "0.0.0.0")?,
            port,
            max_body_bytes: try_load("FUREVER_MAX_BODY_BYTES", &DEFAULT_MAX_BODY_BYTES.to_string())?,
        })
    }
}

fn try_load<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    raw.parse()
        .map_err(|e| anyhow::anyhow!("Invalid {key} value '{raw}': {e}"))
}
