use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use gymdesk_core::{BranchId, DomainError, ItemId, SaleId};
use gymdesk_inventory::{
    EntryRequest, InventoryItem, LedgerMeta, LedgerPlan, NewItem, StockTransaction,
    TransactionKind, derive_quantity, plan_entries, plan_new_item,
};
use gymdesk_sales::{Sale, SaleDraft};

use super::r#trait::{LedgerResult, LedgerStore};

#[derive(Debug, Default)]
struct LedgerState {
    items: BTreeMap<ItemId, InventoryItem>,
    /// Append-only, in commit order.
    transactions: Vec<StockTransaction>,
    sales: HashMap<SaleId, Sale>,
}

impl LedgerState {
    fn visible_item(&self, item_id: ItemId, scope: Option<BranchId>) -> LedgerResult<&InventoryItem> {
        self.items
            .get(&item_id)
            .filter(|item| item.visible_to(scope))
            .ok_or_else(|| DomainError::item_not_found(item_id).into())
    }

    fn apply(&mut self, plan: LedgerPlan) {
        let now = plan.transactions.first().map(|t| t.created_at).unwrap_or_else(Utc::now);
        for (item_id, quantity) in &plan.quantities {
            if let Some(item) = self.items.get_mut(item_id) {
                item.quantity = *quantity;
                item.updated_at = now;
            }
        }
        self.transactions.extend(plan.transactions);
    }
}

/// In-memory ledger store for tests and database-less runs.
///
/// A single async mutex guards all state, so every unit is atomic and units
/// are fully serialized. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    state: Mutex<LedgerState>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn insert_item(
        &self,
        new_item: NewItem,
        meta: &LedgerMeta,
    ) -> LedgerResult<(InventoryItem, Option<StockTransaction>)> {
        let mut state = self.state.lock().await;

        let sku = new_item.sku.trim();
        if state.items.values().any(|item| item.sku == sku) {
            return Err(DomainError::conflict(format!("sku '{sku}' already exists")).into());
        }

        let (item, seed) = plan_new_item(new_item, meta, Utc::now())?;
        state.items.insert(item.id, item.clone());
        if let Some(seed) = &seed {
            state.transactions.push(seed.clone());
        }
        Ok((item, seed))
    }

    async fn remove_item(&self, item_id: ItemId, scope: Option<BranchId>) -> LedgerResult<()> {
        let mut state = self.state.lock().await;
        state.visible_item(item_id, scope)?;

        state.items.remove(&item_id);
        state.transactions.retain(|t| t.item_id != item_id);
        Ok(())
    }

    async fn get_item(&self, item_id: ItemId, scope: Option<BranchId>) -> LedgerResult<InventoryItem> {
        let state = self.state.lock().await;
        state.visible_item(item_id, scope).cloned()
    }

    async fn list_items(&self, scope: Option<BranchId>) -> LedgerResult<Vec<InventoryItem>> {
        let state = self.state.lock().await;
        let mut items: Vec<InventoryItem> = state
            .items
            .values()
            .filter(|item| item.visible_to(scope))
            .cloned()
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(items)
    }

    async fn list_transactions(
        &self,
        item_id: ItemId,
        scope: Option<BranchId>,
    ) -> LedgerResult<Vec<StockTransaction>> {
        let state = self.state.lock().await;
        state.visible_item(item_id, scope)?;

        Ok(state
            .transactions
            .iter()
            .filter(|t| t.item_id == item_id)
            .cloned()
            .collect())
    }

    async fn append(
        &self,
        kind: TransactionKind,
        entries: &[EntryRequest],
        meta: &LedgerMeta,
    ) -> LedgerResult<Vec<StockTransaction>> {
        let mut state = self.state.lock().await;

        let plan = plan_entries(&state.items, kind, entries, meta, Utc::now())?;
        let written = plan.transactions.clone();
        state.apply(plan);
        Ok(written)
    }

    async fn append_sale(
        &self,
        sale_id: SaleId,
        draft: &SaleDraft,
        meta: &LedgerMeta,
    ) -> LedgerResult<Sale> {
        let mut state = self.state.lock().await;

        let now = Utc::now();
        let plan = plan_entries(&state.items, TransactionKind::Sale, &draft.entries(), meta, now)?;
        let sale = Sale::assemble(
            sale_id,
            draft,
            &plan.transactions,
            meta.created_by,
            meta.branch_id,
            now,
        )?;

        state.apply(plan);
        state.sales.insert(sale.id, sale.clone());
        Ok(sale)
    }

    async fn get_sale(&self, sale_id: SaleId, scope: Option<BranchId>) -> LedgerResult<Sale> {
        let state = self.state.lock().await;
        state
            .sales
            .get(&sale_id)
            .filter(|sale| sale.visible_to(scope))
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("sale {sale_id}")).into())
    }

    async fn derive_quantity(&self, item_id: ItemId, scope: Option<BranchId>) -> LedgerResult<i64> {
        let state = self.state.lock().await;
        state.visible_item(item_id, scope)?;

        Ok(derive_quantity(
            state.transactions.iter().filter(|t| t.item_id == item_id),
        ))
    }
}
