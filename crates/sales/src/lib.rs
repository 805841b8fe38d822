//! Point-of-sale domain module.
//!
//! This crate contains the business rules for POS sales, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage). A sale is a parent
//! record over one `sale` ledger entry per line; the ledger side is planned by
//! `gymdesk-inventory`.

pub mod sale;

pub use sale::{Customer, PaymentMethod, Sale, SaleDraft, SaleLine, SaleLineRequest, SaleTotals};
