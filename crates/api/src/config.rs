//! Environment-driven configuration.

use std::env;

use anyhow::{Context, Result, bail};

const DEFAULT_PORT: u16 = 4000;
const DEV_JWT_SECRET: &str = "dev-secret";

/// Deployment environment; `production` hides internal error detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    /// Postgres connection string. Required in production; elsewhere the
    /// in-memory store is used when absent.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    /// Base URL of the customer-facing frontend (for `/r/:data` redirects).
    pub frontend_url: Option<String>,
    pub environment: Environment,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the process environment in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port = match var("PORT") {
            Some(raw) => raw.parse::<u16>().with_context(|| format!("invalid PORT value {raw:?}"))?,
            None => DEFAULT_PORT,
        };

        let jwt_secret = var("JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            DEV_JWT_SECRET.to_string()
        });

        let environment = match var("APP_ENV").as_deref() {
            Some(v) if v.eq_ignore_ascii_case("production") => Environment::Production,
            _ => Environment::Development,
        };

        let database_url = var("DATABASE_URL");
        if environment == Environment::Production && database_url.is_none() {
            bail!("DATABASE_URL is required when APP_ENV=production");
        }

        Ok(Self {
            port,
            database_url,
            jwt_secret,
            frontend_url: var("FRONTEND_URL").map(|url| url.trim_end_matches('/').to_string()),
            environment,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_url: None,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            frontend_url: None,
            environment: Environment::Development,
        }
    }
}
