//! Store configuration.

use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::ledger_store::{LedgerError, LedgerResult};

/// Connection settings for the ledger store.
///
/// Without a `database_url` the service runs on the in-memory store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            max_connections: 10,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

impl StoreConfig {
    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(url.into());
        self
    }

    /// Open a Postgres pool; `Ok(None)` when no database is configured.
    pub async fn connect(&self) -> LedgerResult<Option<PgPool>> {
        let Some(url) = self.database_url.as_deref() else {
            return Ok(None);
        };

        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(self.acquire_timeout)
            .connect(url)
            .await
            .map(Some)
            .map_err(|e| LedgerError::store(format!("failed to connect to database: {e}")))
    }
}
