//! Request/response DTOs and their mapping to domain types.
//!
//! Inventory payloads use camelCase keys; the sales endpoint uses snake_case.
//! Required fields are `Option`s so a missing field is reported as a
//! `validation_error` instead of an extractor rejection.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use gymdesk_core::{BranchId, DomainError, DomainResult, ItemId, SaleId, TransactionId, UserId};
use gymdesk_infra::Reconciliation;
use gymdesk_inventory::{
    EntryRequest, InventoryItem, LedgerMeta, NewItem, PaymentStatus, RecordBulkTransaction,
    RecordTransaction, StockTransaction, TransactionKind,
};
use gymdesk_sales::{Customer, PaymentMethod, Sale, SaleDraft, SaleLineRequest};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemRequest {
    pub sku: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Option<Decimal>,
    pub cost: Option<Decimal>,
    pub quantity: Option<i64>,
    pub reorder_level: Option<i64>,
}

impl CreateItemRequest {
    pub fn into_new_item(self) -> DomainResult<NewItem> {
        Ok(NewItem {
            sku: required(self.sku, "sku")?,
            name: required(self.name, "name")?,
            description: non_empty(self.description),
            category: non_empty(self.category),
            price: required(self.price, "price")?,
            cost: required(self.cost, "cost")?,
            quantity: self.quantity.unwrap_or(0),
            reorder_level: self.reorder_level,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordTransactionRequest {
    pub item_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub quantity: Option<i64>,
    pub price: Option<Decimal>,
    pub notes: Option<String>,
    pub customer_supplier: Option<String>,
    pub payment_status: Option<String>,
}

impl RecordTransactionRequest {
    pub fn into_command(
        self,
        actor: UserId,
        branch_id: Option<BranchId>,
    ) -> DomainResult<RecordTransaction> {
        let kind = parse_kind(self.kind)?;
        let entry = EntryRequest {
            item_id: parse_item_id(self.item_id, "itemId")?,
            quantity: required(self.quantity, "quantity")?,
            price: self.price,
        };
        let meta = ledger_meta(
            self.notes,
            self.customer_supplier,
            self.payment_status,
            actor,
            branch_id,
        )?;
        Ok(RecordTransaction { kind, entry, meta })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkItemRequest {
    pub item_id: Option<String>,
    pub quantity: Option<i64>,
    pub price: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkTransactionRequest {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub items: Option<Vec<BulkItemRequest>>,
    pub notes: Option<String>,
    pub customer_supplier: Option<String>,
    pub payment_status: Option<String>,
}

impl BulkTransactionRequest {
    pub fn into_command(
        self,
        actor: UserId,
        branch_id: Option<BranchId>,
    ) -> DomainResult<RecordBulkTransaction> {
        let kind = parse_kind(self.kind)?;
        let entries = self
            .items
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(i, item)| -> DomainResult<EntryRequest> {
                Ok(EntryRequest {
                    item_id: parse_item_id(item.item_id, &format!("items[{i}].itemId"))?,
                    quantity: required(item.quantity, &format!("items[{i}].quantity"))?,
                    price: item.price,
                })
            })
            .collect::<DomainResult<Vec<_>>>()?;
        let meta = ledger_meta(
            self.notes,
            self.customer_supplier,
            self.payment_status,
            actor,
            branch_id,
        )?;
        Ok(RecordBulkTransaction {
            kind,
            entries,
            meta,
        })
    }
}

/// Sale line as sent by the register. A client-computed `total` is ignored;
/// line totals are always `price × quantity`.
#[derive(Debug, Deserialize)]
pub struct SaleItemRequest {
    pub id: Option<String>,
    pub quantity: Option<i64>,
    pub price: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct RecordSaleRequest {
    pub items: Option<Vec<SaleItemRequest>>,
    pub subtotal: Option<Decimal>,
    pub tax: Option<Decimal>,
    pub discount: Option<Decimal>,
    pub total: Option<Decimal>,
    pub payment_method: Option<String>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
}

impl RecordSaleRequest {
    pub fn into_draft(self) -> DomainResult<SaleDraft> {
        let lines = self
            .items
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(i, item)| -> DomainResult<SaleLineRequest> {
                Ok(SaleLineRequest {
                    item_id: parse_item_id(item.id, &format!("items[{i}].id"))?,
                    quantity: required(item.quantity, &format!("items[{i}].quantity"))?,
                    price: required(item.price, &format!("items[{i}].price"))?,
                })
            })
            .collect::<DomainResult<Vec<_>>>()?;

        let payment_method = PaymentMethod::parse(self.payment_method.as_deref().unwrap_or(""))?;

        Ok(SaleDraft {
            lines,
            subtotal: self.subtotal,
            tax: self.tax,
            discount: self.discount,
            total: self.total,
            payment_method,
            customer: Customer {
                name: non_empty(self.customer_name),
                email: non_empty(self.customer_email),
                phone: non_empty(self.customer_phone),
            },
        })
    }
}

fn required<T>(value: Option<T>, field: &str) -> DomainResult<T> {
    value.ok_or_else(|| DomainError::validation(format!("{field} is required")))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_kind(raw: Option<String>) -> DomainResult<TransactionKind> {
    required(raw, "type")?.parse()
}

fn parse_item_id(raw: Option<String>, field: &str) -> DomainResult<ItemId> {
    required(raw, field)?.trim().parse()
}

fn ledger_meta(
    notes: Option<String>,
    customer_supplier: Option<String>,
    payment_status: Option<String>,
    actor: UserId,
    branch_id: Option<BranchId>,
) -> DomainResult<LedgerMeta> {
    let payment_status = non_empty(payment_status)
        .map(|s| s.parse::<PaymentStatus>())
        .transpose()?;
    Ok(LedgerMeta {
        notes: non_empty(notes),
        customer_supplier: non_empty(customer_supplier),
        payment_status,
        created_by: Some(actor),
        branch_id,
    })
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemResponse {
    pub id: ItemId,
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub quantity: i64,
    pub price: Decimal,
    pub cost: Decimal,
    pub reorder_level: Option<i64>,
    pub low_stock: bool,
    pub branch_id: Option<BranchId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<InventoryItem> for ItemResponse {
    fn from(item: InventoryItem) -> Self {
        Self {
            low_stock: item.is_low_stock(),
            id: item.id,
            sku: item.sku,
            name: item.name,
            description: item.description,
            category: item.category,
            quantity: item.quantity,
            price: item.price,
            cost: item.cost,
            reorder_level: item.reorder_level,
            branch_id: item.branch_id,
            created_at: item.created_at,
            updated_at: item.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    pub id: TransactionId,
    pub item_id: ItemId,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
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

impl From<StockTransaction> for TransactionResponse {
    fn from(t: StockTransaction) -> Self {
        Self {
            id: t.id,
            item_id: t.item_id,
            kind: t.kind,
            quantity: t.quantity,
            price: t.price,
            total_amount: t.total_amount,
            notes: t.notes,
            customer_supplier: t.customer_supplier,
            payment_status: t.payment_status,
            created_by: t.created_by,
            branch_id: t.branch_id,
            created_at: t.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BulkTransactionResponse {
    pub success: bool,
    pub transactions: Vec<TransactionResponse>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationResponse {
    pub item_id: ItemId,
    pub cached_quantity: i64,
    pub derived_quantity: i64,
    pub consistent: bool,
}

impl From<Reconciliation> for ReconciliationResponse {
    fn from(r: Reconciliation) -> Self {
        Self {
            item_id: r.item_id,
            cached_quantity: r.cached,
            derived_quantity: r.derived,
            consistent: r.is_consistent(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SaleCreatedResponse {
    pub id: SaleId,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct SaleLineResponse {
    pub item_id: ItemId,
    pub transaction_id: TransactionId,
    pub quantity: i64,
    pub price: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Serialize)]
pub struct SaleResponse {
    pub id: SaleId,
    pub items: Vec<SaleLineResponse>,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub payment_method: PaymentMethod,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub created_by: Option<UserId>,
    pub branch_id: Option<BranchId>,
    pub created_at: DateTime<Utc>,
}

impl From<Sale> for SaleResponse {
    fn from(sale: Sale) -> Self {
        Self {
            id: sale.id,
            items: sale
                .lines
                .into_iter()
                .map(|l| SaleLineResponse {
                    item_id: l.item_id,
                    transaction_id: l.transaction_id,
                    quantity: l.quantity,
                    price: l.price,
                    total: l.total,
                })
                .collect(),
            subtotal: sale.totals.subtotal,
            tax: sale.totals.tax,
            discount: sale.totals.discount,
            total: sale.totals.total,
            payment_method: sale.payment_method,
            customer_name: sale.customer.name,
            customer_email: sale.customer.email,
            customer_phone: sale.customer.phone,
            created_by: sale.created_by,
            branch_id: sale.branch_id,
            created_at: sale.created_at,
        }
    }
}
