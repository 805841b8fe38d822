//! Infrastructure layer: ledger stores, store configuration and the stock ledger service.

pub mod config;
pub mod ledger_store;
pub mod service;

pub use config::StoreConfig;
pub use ledger_store::{
    InMemoryLedgerStore, LedgerError, LedgerResult, LedgerStore, PostgresLedgerStore,
};
pub use service::{Reconciliation, StockLedgerService};
