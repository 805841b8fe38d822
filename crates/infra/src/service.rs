//! Stock ledger application service.
//!
//! Validates commands, hands them to the injected [`LedgerStore`] and logs the
//! outcome. All stock arithmetic lives in the planner; all atomicity and
//! locking lives in the store.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use gymdesk_core::{BranchId, DomainError, ItemId, SaleId, UserId};
use gymdesk_inventory::{
    InventoryItem, LedgerMeta, NewItem, RecordBulkTransaction, RecordTransaction,
    StockTransaction,
};
use gymdesk_sales::{Sale, SaleDraft};

use crate::ledger_store::{LedgerError, LedgerResult, LedgerStore};

/// Cached quantity next to the quantity recomputed from the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    pub item_id: ItemId,
    pub cached: i64,
    pub derived: i64,
}

impl Reconciliation {
    pub fn is_consistent(&self) -> bool {
        self.cached == self.derived
    }
}

#[derive(Clone)]
pub struct StockLedgerService {
    store: Arc<dyn LedgerStore>,
}

impl core::fmt::Debug for StockLedgerService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StockLedgerService").finish_non_exhaustive()
    }
}

impl StockLedgerService {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Register an item owned by the caller's branch (global when unscoped).
    pub async fn add_item(
        &self,
        new_item: NewItem,
        actor: Option<UserId>,
        branch_id: Option<BranchId>,
    ) -> LedgerResult<InventoryItem> {
        new_item.validate()?;

        let meta = LedgerMeta {
            notes: Some("Beginning balance".to_string()),
            created_by: actor,
            branch_id,
            ..LedgerMeta::default()
        };
        let (item, seed) = self
            .store
            .insert_item(new_item, &meta)
            .await
            .inspect_err(|e| log_rejection("add_item", e))?;

        info!(
            item_id = %item.id,
            sku = %item.sku,
            quantity = item.quantity,
            seeded = seed.is_some(),
            "inventory item added"
        );
        Ok(item)
    }

    pub async fn remove_item(&self, item_id: ItemId, branch_id: Option<BranchId>) -> LedgerResult<()> {
        self.store
            .remove_item(item_id, branch_id)
            .await
            .inspect_err(|e| log_rejection("remove_item", e))?;
        info!(item_id = %item_id, "inventory item removed");
        Ok(())
    }

    pub async fn get_item(
        &self,
        item_id: ItemId,
        branch_id: Option<BranchId>,
    ) -> LedgerResult<InventoryItem> {
        self.store.get_item(item_id, branch_id).await
    }

    pub async fn list_items(&self, branch_id: Option<BranchId>) -> LedgerResult<Vec<InventoryItem>> {
        self.store.list_items(branch_id).await
    }

    pub async fn list_transactions(
        &self,
        item_id: ItemId,
        branch_id: Option<BranchId>,
    ) -> LedgerResult<Vec<StockTransaction>> {
        self.store.list_transactions(item_id, branch_id).await
    }

    /// Append one ledger entry and move the cached quantity with it.
    pub async fn record_transaction(&self, cmd: RecordTransaction) -> LedgerResult<StockTransaction> {
        cmd.validate()?;

        let written = self
            .store
            .append(cmd.kind, std::slice::from_ref(&cmd.entry), &cmd.meta)
            .await
            .inspect_err(|e| log_rejection("record_transaction", e))?;

        let transaction = written
            .into_iter()
            .next()
            .ok_or_else(|| LedgerError::store("append returned no ledger entry"))?;

        info!(
            transaction_id = %transaction.id,
            item_id = %transaction.item_id,
            kind = %transaction.kind,
            quantity = transaction.quantity,
            "stock transaction recorded"
        );
        Ok(transaction)
    }

    /// Append several purchase or sale entries as one unit; nothing is written on failure.
    pub async fn record_bulk_transaction(
        &self,
        cmd: RecordBulkTransaction,
    ) -> LedgerResult<Vec<StockTransaction>> {
        cmd.validate()?;

        let written = self
            .store
            .append(cmd.kind, &cmd.entries, &cmd.meta)
            .await
            .inspect_err(|e| log_rejection("record_bulk_transaction", e))?;

        info!(kind = %cmd.kind, entries = written.len(), "bulk stock transaction recorded");
        Ok(written)
    }

    /// Record a POS sale: the sale, its lines and one `sale` entry per line.
    pub async fn record_sale(
        &self,
        draft: SaleDraft,
        actor: Option<UserId>,
        branch_id: Option<BranchId>,
    ) -> LedgerResult<Sale> {
        draft.validate()?;

        let sale_id = SaleId::new();
        let meta = draft.ledger_meta(sale_id, actor, branch_id);
        let sale = self
            .store
            .append_sale(sale_id, &draft, &meta)
            .await
            .inspect_err(|e| log_rejection("record_sale", e))?;

        info!(
            sale_id = %sale.id,
            lines = sale.lines.len(),
            total = %sale.totals.total,
            payment_method = %sale.payment_method,
            "sale recorded"
        );
        Ok(sale)
    }

    pub async fn get_sale(&self, sale_id: SaleId, branch_id: Option<BranchId>) -> LedgerResult<Sale> {
        self.store.get_sale(sale_id, branch_id).await
    }

    /// Quantity recomputed from the ledger alone. Read-only.
    pub async fn derive_current_quantity(
        &self,
        item_id: ItemId,
        branch_id: Option<BranchId>,
    ) -> LedgerResult<i64> {
        self.store.derive_quantity(item_id, branch_id).await
    }

    pub async fn reconcile(
        &self,
        item_id: ItemId,
        branch_id: Option<BranchId>,
    ) -> LedgerResult<Reconciliation> {
        let item = self.store.get_item(item_id, branch_id).await?;
        let derived = self.store.derive_quantity(item_id, branch_id).await?;

        let report = Reconciliation {
            item_id,
            cached: item.quantity,
            derived,
        };
        if !report.is_consistent() {
            warn!(
                item_id = %item_id,
                cached = report.cached,
                derived = report.derived,
                "cached quantity diverges from ledger"
            );
        }
        Ok(report)
    }
}

fn log_rejection(operation: &str, err: &LedgerError) {
    match err {
        LedgerError::Domain(DomainError::InsufficientStock {
            item_id,
            available,
            requested,
        }) => warn!(
            operation,
            item_id = %item_id,
            available,
            requested,
            "insufficient stock"
        ),
        LedgerError::Domain(e) => debug!(operation, error = %e, "ledger write rejected"),
        LedgerError::Store(e) => warn!(operation, error = %e, "ledger store failure"),
    }
}
