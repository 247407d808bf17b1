//! MySQL connection handling

use crate::error::{ImportError, Result};
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use std::time::Duration;

/// Default pool size. A run issues one statement at a time.
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 2;

/// Default connection timeout in seconds.
pub const DEFAULT_DB_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
}

impl DbConfig {
    /// Config for `url`, with pool settings taken from the environment
    ///
    /// - `DB_MAX_CONNECTIONS`
    /// - `DB_CONNECT_TIMEOUT`
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: std::env::var("DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS),
            connect_timeout_secs: std::env::var("DB_CONNECT_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_DB_CONNECT_TIMEOUT_SECS),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(ImportError::config("database URL cannot be empty"));
        }
        if !self.url.starts_with("mysql://") && !self.url.starts_with("mariadb://") {
            return Err(ImportError::config("database URL must start with mysql://"));
        }
        if self.max_connections == 0 {
            return Err(ImportError::config("DB_MAX_CONNECTIONS must be greater than 0"));
        }
        Ok(())
    }

    /// Database URL with the password replaced, for logs
    pub fn redacted_url(&self) -> String {
        match (self.url.find("://"), self.url.rfind('@')) {
            (Some(scheme_end), Some(at)) if at > scheme_end => {
                let credentials = &self.url[scheme_end + 3..at];
                let user = credentials.split(':').next().unwrap_or_default();
                format!("{}{}:***{}", &self.url[..scheme_end + 3], user, &self.url[at..])
            },
            _ => self.url.clone(),
        }
    }
}

/// Connect and verify the server answers
pub async fn create_pool(config: &DbConfig) -> Result<MySqlPool> {
    config.validate()?;

    let pool = MySqlPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .connect(&config.url)
        .await?;

    health_check(&pool).await?;

    tracing::info!(
        url = %config.redacted_url(),
        max_connections = config.max_connections,
        "Database connection pool created"
    );

    Ok(pool)
}

pub async fn health_check(pool: &MySqlPool) -> Result<()> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
