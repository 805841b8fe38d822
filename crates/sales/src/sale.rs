use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use gymdesk_core::{BranchId, DomainError, DomainResult, Entity, ItemId, SaleId, TransactionId, UserId};
use gymdesk_inventory::{
    EntryRequest, LedgerMeta, PaymentStatus, StockTransaction, TransactionKind, checked_amount,
    checked_sum, line_total,
};

/// Payment method label (e.g. `cash`, `card`, `gcash`); stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentMethod(String);

impl PaymentMethod {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let value = raw.trim().to_lowercase();
        if value.is_empty() {
            return Err(DomainError::validation("payment_method is required"));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Optional walk-in customer details captured at the register.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// One requested line: `quantity` units of `item_id` at `price` each.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleLineRequest {
    pub item_id: ItemId,
    pub quantity: i64,
    pub price: Decimal,
}

impl SaleLineRequest {
    pub fn line_total(&self) -> DomainResult<Decimal> {
        line_total(self.price, self.quantity)
    }
}

/// Register input before it touches the ledger.
///
/// Amounts left `None` are computed: subtotal from the lines, tax and discount
/// as zero, total as `subtotal + tax - discount`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleDraft {
    pub lines: Vec<SaleLineRequest>,
    pub subtotal: Option<Decimal>,
    pub tax: Option<Decimal>,
    pub discount: Option<Decimal>,
    pub total: Option<Decimal>,
    pub payment_method: PaymentMethod,
    pub customer: Customer,
}

/// Resolved sale amounts.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleTotals {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

impl SaleDraft {
    pub fn validate(&self) -> DomainResult<()> {
        if self.lines.is_empty() {
            return Err(DomainError::validation("sale must contain at least one item"));
        }
        for (i, line) in self.lines.iter().enumerate() {
            if line.quantity <= 0 {
                return Err(DomainError::validation(format!(
                    "items[{i}].quantity must be a positive integer"
                )));
            }
            checked_amount(line.price, &format!("items[{i}].price"))?;
        }
        self.totals().map(|_| ())
    }

    pub fn totals(&self) -> DomainResult<SaleTotals> {
        let line_totals = self
            .lines
            .iter()
            .map(SaleLineRequest::line_total)
            .collect::<DomainResult<Vec<_>>>()?;

        let subtotal = match self.subtotal {
            Some(v) => checked_amount(v, "subtotal")?,
            None => checked_amount(checked_sum(line_totals)?, "subtotal")?,
        };
        let tax = checked_amount(self.tax.unwrap_or(Decimal::ZERO), "tax")?;
        let discount = checked_amount(self.discount.unwrap_or(Decimal::ZERO), "discount")?;
        let total = match self.total {
            Some(v) => checked_amount(v, "total")?,
            None => {
                let gross = checked_sum([subtotal, tax])?;
                let net = gross
                    .checked_sub(discount)
                    .ok_or_else(|| DomainError::validation("amount out of range"))?;
                checked_amount(net, "total")?
            }
        };

        Ok(SaleTotals {
            subtotal,
            tax,
            discount,
            total,
        })
    }

    /// Ledger entries for the lines, in line order.
    pub fn entries(&self) -> Vec<EntryRequest> {
        self.lines
            .iter()
            .map(|l| EntryRequest {
                item_id: l.item_id,
                quantity: l.quantity,
                price: Some(l.price),
            })
            .collect()
    }

    /// Descriptive fields stamped on each line's ledger entry.
    pub fn ledger_meta(
        &self,
        sale_id: SaleId,
        created_by: Option<UserId>,
        branch_id: Option<BranchId>,
    ) -> LedgerMeta {
        LedgerMeta {
            notes: Some(format!("POS sale {sale_id}")),
            customer_supplier: self.customer.name.clone(),
            payment_status: Some(PaymentStatus::Paid),
            created_by,
            branch_id,
        }
    }
}

/// Persisted sale line; `transaction_id` is the matching `sale` ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleLine {
    pub item_id: ItemId,
    pub transaction_id: TransactionId,
    pub quantity: i64,
    pub price: Decimal,
    pub total: Decimal,
}

/// Completed POS sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    pub id: SaleId,
    pub lines: Vec<SaleLine>,
    pub totals: SaleTotals,
    pub payment_method: PaymentMethod,
    pub customer: Customer,
    pub created_by: Option<UserId>,
    pub branch_id: Option<BranchId>,
    pub created_at: DateTime<Utc>,
}

impl Sale {
    /// Build the sale record over the ledger entries planned for its lines.
    ///
    /// `transactions` must be the planner's output for `draft.entries()`, so it
    /// pairs 1:1 with the draft lines.
    pub fn assemble(
        id: SaleId,
        draft: &SaleDraft,
        transactions: &[StockTransaction],
        created_by: Option<UserId>,
        branch_id: Option<BranchId>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if transactions.len() != draft.lines.len()
            || transactions.iter().any(|t| t.kind != TransactionKind::Sale)
        {
            return Err(DomainError::validation(
                "sale lines and ledger entries do not correspond",
            ));
        }

        let lines = transactions
            .iter()
            .map(|t| SaleLine {
                item_id: t.item_id,
                transaction_id: t.id,
                quantity: t.quantity,
                price: t.price,
                total: t.total_amount,
            })
            .collect();

        Ok(Self {
            id,
            lines,
            totals: draft.totals()?,
            payment_method: draft.payment_method.clone(),
            customer: draft.customer.clone(),
            created_by,
            branch_id,
            created_at: now,
        })
    }

    /// Whether a caller with the given branch scope may read this sale.
    pub fn visible_to(&self, scope: Option<BranchId>) -> bool {
        match (scope, self.branch_id) {
            (None, _) => true,
            (Some(scope), own) => own == Some(scope),
        }
    }
}

impl Entity for Sale {
    type Id = SaleId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
