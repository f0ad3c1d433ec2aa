//! Process settings read from the environment (after `.env` is loaded by the binary).

use crate::error::ConfigError;

const DEFAULT_DATABASE_URL: &str = "sqlite://dossier.db";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_CORS_ORIGINS: &[&str] = &["http://localhost", "http://localhost:3000"];

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub database_url: String,
    pub bind_addr: String,
    pub max_connections: u32,
    /// Origins allowed by the CORS layer. From `CORS_ORIGINS`, comma-separated.
    pub cors_origins: Vec<String>,
    /// Request body limit, applied mostly for CSV uploads.
    pub max_upload_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            database_url: DEFAULT_DATABASE_URL.into(),
            bind_addr: DEFAULT_BIND_ADDR.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            cors_origins: DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl Settings {
    /// Read `DATABASE_URL`, `BIND_ADDR`, `DATABASE_MAX_CONNECTIONS`, `CORS_ORIGINS` and
    /// `MAX_UPLOAD_BYTES`, falling back to defaults for unset variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Settings::default();
        if let Some(url) = lookup("DATABASE_URL").filter(|s| !s.trim().is_empty()) {
            settings.database_url = url;
        }
        if let Some(addr) = lookup("BIND_ADDR").filter(|s| !s.trim().is_empty()) {
            settings.bind_addr = addr;
        }
        if let Some(raw) = lookup("DATABASE_MAX_CONNECTIONS") {
            settings.max_connections = parse_number("DATABASE_MAX_CONNECTIONS", &raw)?;
            if settings.max_connections == 0 {
                return Err(ConfigError::Invalid {
                    key: "DATABASE_MAX_CONNECTIONS",
                    value: raw,
                });
            }
        }
        if let Some(raw) = lookup("MAX_UPLOAD_BYTES") {
            settings.max_upload_bytes = parse_number("MAX_UPLOAD_BYTES", &raw)?;
        }
        if let Some(raw) = lookup("CORS_ORIGINS") {
            settings.cors_origins = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        Ok(settings)
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: raw.to_string(),
    })
}
