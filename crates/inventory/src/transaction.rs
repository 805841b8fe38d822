use core::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use gymdesk_core::{BranchId, DomainError, DomainResult, Entity, ItemId, TransactionId, UserId};

use crate::money::checked_amount;

/// Ledger entry kind. The kind alone decides the direction of the quantity change.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Purchase,
    Sale,
    AdjustmentIn,
    AdjustmentOut,
    Beginning,
}

impl TransactionKind {
    pub const ALL: [TransactionKind; 5] = [
        TransactionKind::Purchase,
        TransactionKind::Sale,
        TransactionKind::AdjustmentIn,
        TransactionKind::AdjustmentOut,
        TransactionKind::Beginning,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TransactionKind::Purchase => "purchase",
            TransactionKind::Sale => "sale",
            TransactionKind::AdjustmentIn => "adjustment_in",
            TransactionKind::AdjustmentOut => "adjustment_out",
            TransactionKind::Beginning => "beginning",
        }
    }

    /// `true` when the entry adds stock.
    pub fn is_inbound(self) -> bool {
        matches!(
            self,
            TransactionKind::Purchase | TransactionKind::AdjustmentIn | TransactionKind::Beginning
        )
    }

    /// Signed quantity change for a positive magnitude.
    pub fn signed(self, magnitude: i64) -> i64 {
        if self.is_inbound() { magnitude } else { -magnitude }
    }

    /// Only purchases and sales may be recorded through the bulk path.
    pub fn allowed_in_bulk(self) -> bool {
        matches!(self, TransactionKind::Purchase | TransactionKind::Sale)
    }
}

impl core::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TransactionKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| {
                DomainError::validation(format!(
                    "type must be one of: purchase, sale, adjustment_in, adjustment_out, beginning (got '{s}')"
                ))
            })
    }
}

/// Settlement state recorded on purchase/sale entries.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Paid,
    Pending,
    Partial,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Paid => "paid",
            PaymentStatus::Pending => "pending",
            PaymentStatus::Partial => "partial",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "paid" => Ok(PaymentStatus::Paid),
            "pending" => Ok(PaymentStatus::Pending),
            "partial" => Ok(PaymentStatus::Partial),
            other => Err(DomainError::validation(format!(
                "paymentStatus must be one of: paid, pending, partial (got '{other}')"
            ))),
        }
    }
}

/// Immutable ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockTransaction {
    pub id: TransactionId,
    pub item_id: ItemId,
    pub kind: TransactionKind,
    /// Positive magnitude; direction comes from `kind`.
    pub quantity: i64,
    pub price: Decimal,
    pub total_amount: Decimal,
    pub notes: Option<String>,
    pub customer_supplier: Option<String>,
    pub payment_status: Option<PaymentStatus>,
    pub created_by: Option<UserId>,
    pub branch_id: Option<BranchId>,
    pub created_at: DateTime<Utc>,
}

impl StockTransaction {
    pub fn signed_quantity(&self) -> i64 {
        self.kind.signed(self.quantity)
    }
}

impl Entity for StockTransaction {
    type Id = TransactionId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Descriptive fields shared by every entry written in one unit, plus the caller's scope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerMeta {
    pub notes: Option<String>,
    pub customer_supplier: Option<String>,
    pub payment_status: Option<PaymentStatus>,
    pub created_by: Option<UserId>,
    pub branch_id: Option<BranchId>,
}

/// One requested quantity change against one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRequest {
    pub item_id: ItemId,
    pub quantity: i64,
    pub price: Option<Decimal>,
}

impl EntryRequest {
    fn validate(&self, position: Option<usize>) -> DomainResult<()> {
        let at = position.map(|i| format!(" (items[{i}])")).unwrap_or_default();
        if self.quantity <= 0 {
            return Err(DomainError::validation(format!(
                "quantity must be a positive integer{at}"
            )));
        }
        if let Some(price) = self.price {
            checked_amount(price, &format!("price{at}"))?;
        }
        Ok(())
    }
}

/// Command: record one ledger entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordTransaction {
    pub kind: TransactionKind,
    pub entry: EntryRequest,
    pub meta: LedgerMeta,
}

impl RecordTransaction {
    pub fn validate(&self) -> DomainResult<()> {
        self.entry.validate(None)
    }
}

/// Command: record several entries of one kind as a single atomic unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordBulkTransaction {
    pub kind: TransactionKind,
    pub entries: Vec<EntryRequest>,
    pub meta: LedgerMeta,
}

impl RecordBulkTransaction {
    pub fn validate(&self) -> DomainResult<()> {
        if !self.kind.allowed_in_bulk() {
            return Err(DomainError::validation(
                "bulk transactions support only 'purchase' or 'sale'",
            ));
        }
        if self.entries.is_empty() {
            return Err(DomainError::validation("items cannot be empty"));
        }
        for (i, entry) in self.entries.iter().enumerate() {
            entry.validate(Some(i))?;
        }
        Ok(())
    }
}
