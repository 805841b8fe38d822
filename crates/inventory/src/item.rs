use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use gymdesk_core::{BranchId, DomainError, DomainResult, Entity, ItemId};

use crate::money::{checked_amount, money};
use crate::transaction::TransactionKind;

/// Inventory item with its cached quantity.
///
/// `quantity` is a cache of the ledger total; it only changes through ledger
/// entries planned in [`crate::ledger`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: ItemId,
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub quantity: i64,
    pub price: Decimal,
    pub cost: Decimal,
    pub reorder_level: Option<i64>,
    /// `None` means the item is shared by every branch.
    pub branch_id: Option<BranchId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InventoryItem {
    /// Whether a caller with the given branch scope may see and touch this item.
    ///
    /// Unscoped callers see everything; scoped callers see global items and
    /// their own branch.
    pub fn visible_to(&self, scope: Option<BranchId>) -> bool {
        match (scope, self.branch_id) {
            (None, _) => true,
            (Some(_), None) => true,
            (Some(scope), Some(own)) => scope == own,
        }
    }

    pub fn is_low_stock(&self) -> bool {
        self.reorder_level
            .is_some_and(|level| self.quantity <= level)
    }

    /// Unit price used when the caller does not supply one.
    ///
    /// Sales fall back to the selling price; every other kind to cost.
    pub fn default_unit_price(&self, kind: TransactionKind) -> Decimal {
        match kind {
            TransactionKind::Sale => self.price,
            _ => self.cost,
        }
    }
}

impl Entity for InventoryItem {
    type Id = ItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Input for registering a new item. `quantity` is the optional starting stock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Decimal,
    pub cost: Decimal,
    pub quantity: i64,
    pub reorder_level: Option<i64>,
}

impl NewItem {
    pub fn validate(&self) -> DomainResult<()> {
        if self.sku.trim().is_empty() {
            return Err(DomainError::validation("sku cannot be empty"));
        }
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        checked_amount(self.price, "price")?;
        checked_amount(self.cost, "cost")?;
        if self.quantity < 0 {
            return Err(DomainError::validation("starting quantity cannot be negative"));
        }
        if self.reorder_level.is_some_and(|l| l < 0) {
            return Err(DomainError::validation("reorderLevel cannot be negative"));
        }
        Ok(())
    }

    /// Build the item row with zero stock; starting stock is added by the beginning entry.
    pub(crate) fn into_item(
        self,
        id: ItemId,
        branch_id: Option<BranchId>,
        now: DateTime<Utc>,
    ) -> InventoryItem {
        InventoryItem {
            id,
            sku: self.sku.trim().to_string(),
            name: self.name.trim().to_string(),
            description: self.description,
            category: self.category,
            quantity: 0,
            price: money(self.price),
            cost: money(self.cost),
            reorder_level: self.reorder_level,
            branch_id,
            created_at: now,
            updated_at: now,
        }
    }
}
