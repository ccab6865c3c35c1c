//! Infrastructure wiring: which `BillingStore` backs the API.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;

use dinehub_infra::{BillingStore, InMemoryBillingStore, PostgresBillingStore};

use crate::config::AppConfig;

/// Shared services available to every owner route.
#[derive(Clone)]
pub struct AppServices {
    pub store: Arc<dyn BillingStore>,
}

impl AppServices {
    pub fn new(store: Arc<dyn BillingStore>) -> Self {
        Self { store }
    }
}

/// Connect the configured store: Postgres when `DATABASE_URL` is set,
/// otherwise an empty in-memory store. Production configs always carry a URL.
pub async fn connect_store(config: &AppConfig) -> Result<Arc<dyn BillingStore>> {
    match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .acquire_timeout(Duration::from_secs(5))
                .connect(url)
                .await
                .context("failed to connect to DATABASE_URL")?;
            tracing::info!("using postgres billing store");
            Ok(Arc::new(PostgresBillingStore::new(pool)))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory billing store (data is not persisted)");
            Ok(Arc::new(InMemoryBillingStore::new()))
        }
    }
}
