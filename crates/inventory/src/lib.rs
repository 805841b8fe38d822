//! Inventory domain module (stock ledger).
//!
//! This crate contains the business rules for inventory items and their ledger,
//! implemented purely as deterministic domain logic (no IO, no HTTP, no storage).
//! Stores load a locked snapshot of the items involved, ask the planner in
//! [`ledger`] what to write, and persist the resulting plan as one unit.

pub mod item;
pub mod ledger;
pub mod money;
pub mod transaction;

pub use item::{InventoryItem, NewItem};
pub use ledger::{LedgerPlan, derive_quantity, plan_entries, plan_new_item};
pub use money::{MAX_AMOUNT, checked_amount, checked_sum, line_total, money};
pub use transaction::{
    EntryRequest, LedgerMeta, PaymentStatus, RecordBulkTransaction, RecordTransaction,
    StockTransaction, TransactionKind,
};
