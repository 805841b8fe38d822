use std::sync::Arc;

use async_trait::async_trait;

use gymdesk_core::{BranchId, DomainError, ItemId, SaleId};
use gymdesk_inventory::{
    EntryRequest, InventoryItem, LedgerMeta, NewItem, StockTransaction, TransactionKind,
};
use gymdesk_sales::{Sale, SaleDraft};

/// Ledger store error.
///
/// `Domain` carries business-rule rejections (validation, missing items,
/// insufficient stock, duplicate SKUs). `Store` is an infrastructure failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("store error: {0}")]
    Store(String),
}

impl LedgerError {
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Persistence boundary for items, the stock ledger and sales.
///
/// Every write method is one atomic unit: it either commits all of its rows
/// (ledger entries, quantity updates, sale header and lines) or none of them.
/// Writes touching the same item are serialized, so concurrent units never
/// lose an update or take an item below zero.
///
/// Every `scope` argument is the caller's branch: `None` sees all rows, `Some`
/// sees global rows and that branch's rows. Invisible rows behave as missing.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Insert a new item; a positive starting quantity is seeded with a
    /// `beginning` entry in the same unit. Duplicate SKUs are a `Conflict`.
    async fn insert_item(
        &self,
        new_item: NewItem,
        meta: &LedgerMeta,
    ) -> LedgerResult<(InventoryItem, Option<StockTransaction>)>;

    /// Delete an item together with its ledger entries.
    async fn remove_item(&self, item_id: ItemId, scope: Option<BranchId>) -> LedgerResult<()>;

    async fn get_item(&self, item_id: ItemId, scope: Option<BranchId>) -> LedgerResult<InventoryItem>;

    /// Items visible to `scope`, ordered by name.
    async fn list_items(&self, scope: Option<BranchId>) -> LedgerResult<Vec<InventoryItem>>;

    /// Ledger history of one item, oldest first.
    async fn list_transactions(
        &self,
        item_id: ItemId,
        scope: Option<BranchId>,
    ) -> LedgerResult<Vec<StockTransaction>>;

    /// Append entries of one kind as a single unit, returning them in request order.
    async fn append(
        &self,
        kind: TransactionKind,
        entries: &[EntryRequest],
        meta: &LedgerMeta,
    ) -> LedgerResult<Vec<StockTransaction>>;

    /// Record a sale: one `sale` entry per line plus the sale header and lines.
    async fn append_sale(
        &self,
        sale_id: SaleId,
        draft: &SaleDraft,
        meta: &LedgerMeta,
    ) -> LedgerResult<Sale>;

    async fn get_sale(&self, sale_id: SaleId, scope: Option<BranchId>) -> LedgerResult<Sale>;

    /// Signed sum of the item's ledger, ignoring the cached quantity.
    async fn derive_quantity(&self, item_id: ItemId, scope: Option<BranchId>) -> LedgerResult<i64>;
}

#[async_trait]
impl<S> LedgerStore for Arc<S>
where
    S: LedgerStore + ?Sized,
{
    async fn insert_item(
        &self,
        new_item: NewItem,
        meta: &LedgerMeta,
    ) -> LedgerResult<(InventoryItem, Option<StockTransaction>)> {
        (**self).insert_item(new_item, meta).await
    }

    async fn remove_item(&self, item_id: ItemId, scope: Option<BranchId>) -> LedgerResult<()> {
        (**self).remove_item(item_id, scope).await
    }

    async fn get_item(&self, item_id: ItemId, scope: Option<BranchId>) -> LedgerResult<InventoryItem> {
        (**self).get_item(item_id, scope).await
    }

    async fn list_items(&self, scope: Option<BranchId>) -> LedgerResult<Vec<InventoryItem>> {
        (**self).list_items(scope).await
    }

    async fn list_transactions(
        &self,
        item_id: ItemId,
        scope: Option<BranchId>,
    ) -> LedgerResult<Vec<StockTransaction>> {
        (**self).list_transactions(item_id, scope).await
    }

    async fn append(
        &self,
        kind: TransactionKind,
        entries: &[EntryRequest],
        meta: &LedgerMeta,
    ) -> LedgerResult<Vec<StockTransaction>> {
        (**self).append(kind, entries, meta).await
    }

    async fn append_sale(
        &self,
        sale_id: SaleId,
        draft: &SaleDraft,
        meta: &LedgerMeta,
    ) -> LedgerResult<Sale> {
        (**self).append_sale(sale_id, draft, meta).await
    }

    async fn get_sale(&self, sale_id: SaleId, scope: Option<BranchId>) -> LedgerResult<Sale> {
        (**self).get_sale(sale_id, scope).await
    }

    async fn derive_quantity(&self, item_id: ItemId, scope: Option<BranchId>) -> LedgerResult<i64> {
        (**self).derive_quantity(item_id, scope).await
    }
}
