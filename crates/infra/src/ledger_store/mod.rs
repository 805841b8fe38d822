//! Stock ledger persistence.
//!
//! Both backends share the planner in `gymdesk_inventory::ledger`; they differ
//! only in how they lock, read and write rows.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryLedgerStore;
pub use postgres::PostgresLedgerStore;
pub use r#trait::{LedgerError, LedgerResult, LedgerStore};
