use std::{env, fmt::Display, str::FromStr};

use anyhow::{anyhow, Context};
use tracing::info;

pub const DEFAULT_FALLBACK_DATABASE_URL: &str = "postgres://localhost:5432/student_db";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub database_url: Option<String>,
    pub fallback_database_url: Option<String>,
    pub port: u16,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
    pub cors_allowed_origins: Vec<String>,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup. An empty
    /// `DATABASE_FALLBACK_URL` disables the fallback attempt.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let fallback_database_url = match lookup("DATABASE_FALLBACK_URL") {
            Some(url) if url.trim().is_empty() => None,
            Some(url) => Some(url),
            None => Some(DEFAULT_FALLBACK_DATABASE_URL.to_string()),
        };

        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|| "http://localhost:5173".to_string())
            .split(',')
            .map(|origin| origin.trim().trim_end_matches('/').to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Ok(Self {
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            fallback_database_url,
            port: try_load(&lookup, "PORT", "5000")?,
            max_connections: try_load(&lookup, "DATABASE_MAX_CONNECTIONS", "5")?,
            connect_timeout_secs: try_load(&lookup, "DATABASE_CONNECT_TIMEOUT_SECS", "5")?,
            cors_allowed_origins,
        })
    }

    pub fn require_database_url(&self) -> anyhow::Result<&str> {
        self.database_url
            .as_deref()
            .context("DATABASE_URL must be set to a Postgres instance")
    }
}

fn try_load<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: &str,
) -> anyhow::Result<T>
where
    T::Err: Display,
{
    let raw = lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.trim()
        .parse()
        .map_err(|e| anyhow!("invalid {key} value {raw:?}: {e}"))
}
