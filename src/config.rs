// src/config.rs

use dotenvy::dotenv;
use std::{env, net::SocketAddr, path::PathBuf};

/// Identifier of the test served when a request does not name one.
pub const DEFAULT_TEST_ID: &str = "default-test";

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub rust_log: String,
    pub log_dir: String,
    /// Optional JSON catalog replacing the bundled one.
    pub catalog_path: Option<PathBuf>,
    pub default_test_id: String,
    pub cors_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
            .parse()
            .expect("BIND_ADDR must be a valid socket address");

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let log_dir = env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string());

        let catalog_path = env::var("TEST_CATALOG_PATH")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        let default_test_id =
            env::var("DEFAULT_TEST_ID").unwrap_or_else(|_| DEFAULT_TEST_ID.to_string());

        let cors_origins = env::var("CORS_ORIGINS")
            .map(|raw| parse_origins(&raw))
            .unwrap_or_else(|_| default_origins());

        Self {
            bind_addr,
            rust_log,
            log_dir,
            catalog_path,
            default_test_id,
            cors_origins,
        }
    }
}

fn default_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://127.0.0.1:3000".to_string(),
    ]
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect()
}
