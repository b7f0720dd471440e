use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;

use shutter_api::uploads::DEFAULT_MAX_UPLOAD_BYTES;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub upload_dir: PathBuf,
    /// Base for absolute image URLs in responses.
    pub public_url: String,
    /// `None` allows any origin.
    pub cors_origin: Option<String>,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let host = var("SHUTTER_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = match var("SHUTTER_PORT") {
            Some(p) => p.parse().with_context(|| format!("SHUTTER_PORT '{}' is not a port", p))?,
            None => 3000,
        };
        let max_upload_bytes = match var("SHUTTER_MAX_UPLOAD_BYTES") {
            Some(n) => n
                .parse()
                .with_context(|| format!("SHUTTER_MAX_UPLOAD_BYTES '{}' is not a byte count", n))?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        Ok(Self {
            db_path: var("SHUTTER_DB_PATH").unwrap_or_else(|| "shutter.db".into()).into(),
            upload_dir: var("SHUTTER_UPLOAD_DIR").unwrap_or_else(|| "./uploads".into()).into(),
            public_url: var("SHUTTER_PUBLIC_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| format!("http://localhost:{}", port)),
            cors_origin: var("SHUTTER_CORS_ORIGIN"),
            host,
            port,
            max_upload_bytes,
        })
    }

    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}
