//! Store wiring: Postgres when a database is configured, in-memory otherwise.

use std::sync::Arc;

use gymdesk_infra::{
    InMemoryLedgerStore, LedgerResult, LedgerStore, PostgresLedgerStore, StockLedgerService,
    StoreConfig,
};

/// Shared application services, injected into handlers as an `Extension`.
#[derive(Debug, Clone)]
pub struct AppServices {
    pub ledger: StockLedgerService,
    pub backend: &'static str,
}

pub async fn build_services(config: &StoreConfig) -> LedgerResult<AppServices> {
    let (store, backend): (Arc<dyn LedgerStore>, &'static str) = match config.connect().await? {
        Some(pool) => {
            let store = PostgresLedgerStore::new(pool);
            store.ensure_schema().await?;
            tracing::info!(max_connections = config.max_connections, "using postgres ledger store");
            (Arc::new(store), "postgres")
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory ledger store (data is lost on restart)");
            (Arc::new(InMemoryLedgerStore::new()), "memory")
        }
    };

    Ok(AppServices {
        ledger: StockLedgerService::new(store),
        backend,
    })
}
