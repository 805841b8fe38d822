//! Postgres-backed ledger store.
//!
//! Every write runs in one sqlx transaction. The rows of all items a unit
//! touches are locked first with `SELECT … FOR UPDATE`, in id order, so two
//! units over overlapping items queue behind each other instead of
//! deadlocking. The locked rows are handed to the shared planner and the
//! resulting plan is written before commit; any error drops the transaction,
//! which rolls it back.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | LedgerError |
//! |------------|----------------------|-------------|
//! | Database (unique violation) | `23505` | `Domain(Conflict)` |
//! | Database (check violation) | `23514` | `Store` |
//! | Database (other) | Any other | `Store` |
//! | PoolClosed / Io / other | N/A | `Store` |

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use tracing::{debug, instrument};

use gymdesk_core::{BranchId, DomainError, ItemId, SaleId, TransactionId, UserId};
use gymdesk_inventory::{
    EntryRequest, InventoryItem, LedgerMeta, LedgerPlan, NewItem, PaymentStatus,
    StockTransaction, TransactionKind, derive_quantity, plan_entries, plan_new_item,
};
use gymdesk_sales::{Customer, PaymentMethod, Sale, SaleDraft, SaleLine, SaleTotals};

use super::r#trait::{LedgerError, LedgerResult, LedgerStore};

const SCHEMA: &str = include_str!("../../migrations/0001_stock_ledger.sql");

const ITEM_COLUMNS: &str = "id, sku, name, description, category, quantity, price, cost, \
     reorder_level, branch_id, created_at, updated_at";

const TRANSACTION_COLUMNS: &str = "id, item_id, type::text AS kind, quantity, price, total_amount, \
     notes, customer_supplier, payment_status, created_by, branch_id, created_at";

/// Scope predicate for items: unscoped sees all, scoped sees global and own branch.
const ITEM_SCOPE: &str = "($2::uuid IS NULL OR branch_id IS NULL OR branch_id = $2)";

#[derive(Debug, Clone)]
pub struct PostgresLedgerStore {
    pool: PgPool,
}

impl PostgresLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the ledger tables if they do not exist yet.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> LedgerResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }

    async fn fetch_item(
        &self,
        item_id: ItemId,
        scope: Option<BranchId>,
    ) -> LedgerResult<InventoryItem> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM inventory_items WHERE id = $1 AND {ITEM_SCOPE}");
        let row = sqlx::query(&sql)
            .bind(item_id.as_uuid())
            .bind(scope.map(|b| *b.as_uuid()))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_item", e))?
            .ok_or_else(|| DomainError::item_not_found(item_id))?;

        decode::<ItemRow>(&row).map(InventoryItem::from)
    }
}

#[async_trait]
impl LedgerStore for PostgresLedgerStore {
    #[instrument(
        skip(self, new_item, meta),
        fields(operation = "insert_item", sku = %new_item.sku.trim()),
        err
    )]
    async fn insert_item(
        &self,
        new_item: NewItem,
        meta: &LedgerMeta,
    ) -> LedgerResult<(InventoryItem, Option<StockTransaction>)> {
        let (item, seed) = plan_new_item(new_item, meta, Utc::now())?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO inventory_items
                (id, sku, name, description, category, quantity, price, cost,
                 reorder_level, branch_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(item.id.as_uuid())
        .bind(&item.sku)
        .bind(&item.name)
        .bind(&item.description)
        .bind(&item.category)
        .bind(item.quantity)
        .bind(item.price)
        .bind(item.cost)
        .bind(item.reorder_level)
        .bind(item.branch_id.map(|b| *b.as_uuid()))
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&mut *tx)
        .await;

        if let Err(err) = inserted {
            if is_unique_violation(&err) {
                return Err(DomainError::conflict(format!("sku '{}' already exists", item.sku)).into());
            }
            return Err(map_sqlx_error("insert_item", err));
        }

        if let Some(seed) = &seed {
            insert_transaction(&mut tx, seed).await?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))?;

        Ok((item, seed))
    }

    #[instrument(skip(self), fields(operation = "remove_item", item_id = %item_id), err)]
    async fn remove_item(&self, item_id: ItemId, scope: Option<BranchId>) -> LedgerResult<()> {
        let sql = format!("DELETE FROM inventory_items WHERE id = $1 AND {ITEM_SCOPE}");
        let result = sqlx::query(&sql)
            .bind(item_id.as_uuid())
            .bind(scope.map(|b| *b.as_uuid()))
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("remove_item", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::item_not_found(item_id).into());
        }
        Ok(())
    }

    async fn get_item(&self, item_id: ItemId, scope: Option<BranchId>) -> LedgerResult<InventoryItem> {
        self.fetch_item(item_id, scope).await
    }

    #[instrument(skip(self), fields(operation = "list_items"), err)]
    async fn list_items(&self, scope: Option<BranchId>) -> LedgerResult<Vec<InventoryItem>> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM inventory_items \
             WHERE ($1::uuid IS NULL OR branch_id IS NULL OR branch_id = $1) \
             ORDER BY name, id"
        );
        let rows = sqlx::query(&sql)
            .bind(scope.map(|b| *b.as_uuid()))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_items", e))?;

        rows.iter()
            .map(|row| decode::<ItemRow>(row).map(InventoryItem::from))
            .collect()
    }

    #[instrument(skip(self), fields(operation = "list_transactions", item_id = %item_id), err)]
    async fn list_transactions(
        &self,
        item_id: ItemId,
        scope: Option<BranchId>,
    ) -> LedgerResult<Vec<StockTransaction>> {
        self.fetch_item(item_id, scope).await?;

        let sql = format!(
            "SELECT {TRANSACTION_COLUMNS} FROM inventory_transactions \
             WHERE item_id = $1 ORDER BY created_at, id"
        );
        let rows = sqlx::query(&sql)
            .bind(item_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_transactions", e))?;

        rows.iter()
            .map(|row| -> LedgerResult<StockTransaction> {
                decode::<TransactionRow>(row)?.try_into()
            })
            .collect()
    }

    #[instrument(
        skip(self, entries, meta),
        fields(operation = "append", kind = %kind, entry_count = entries.len()),
        err
    )]
    async fn append(
        &self,
        kind: TransactionKind,
        entries: &[EntryRequest],
        meta: &LedgerMeta,
    ) -> LedgerResult<Vec<StockTransaction>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let snapshot = lock_items(&mut tx, entries.iter().map(|e| e.item_id)).await?;
        let plan = plan_entries(&snapshot, kind, entries, meta, Utc::now())?;
        write_plan(&mut tx, &plan).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))?;

        Ok(plan.transactions)
    }

    #[instrument(
        skip(self, draft, meta),
        fields(operation = "append_sale", sale_id = %sale_id, line_count = draft.lines.len()),
        err
    )]
    async fn append_sale(
        &self,
        sale_id: SaleId,
        draft: &SaleDraft,
        meta: &LedgerMeta,
    ) -> LedgerResult<Sale> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let entries = draft.entries();
        let snapshot = lock_items(&mut tx, entries.iter().map(|e| e.item_id)).await?;

        let now = Utc::now();
        let plan = plan_entries(&snapshot, TransactionKind::Sale, &entries, meta, now)?;
        let sale = Sale::assemble(
            sale_id,
            draft,
            &plan.transactions,
            meta.created_by,
            meta.branch_id,
            now,
        )?;

        write_plan(&mut tx, &plan).await?;
        insert_sale(&mut tx, &sale).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))?;

        Ok(sale)
    }

    #[instrument(skip(self), fields(operation = "get_sale", sale_id = %sale_id), err)]
    async fn get_sale(&self, sale_id: SaleId, scope: Option<BranchId>) -> LedgerResult<Sale> {
        let header = sqlx::query(
            r#"
            SELECT id, subtotal, tax, discount, total, payment_method,
                   customer_name, customer_email, customer_phone,
                   created_by, branch_id, created_at
            FROM sales
            WHERE id = $1 AND ($2::uuid IS NULL OR branch_id = $2)
            "#,
        )
        .bind(sale_id.as_uuid())
        .bind(scope.map(|b| *b.as_uuid()))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_sale", e))?
        .ok_or_else(|| DomainError::not_found(format!("sale {sale_id}")))?;

        let lines = sqlx::query(
            r#"
            SELECT item_id, transaction_id, quantity, price, total
            FROM sale_items
            WHERE sale_id = $1
            ORDER BY line_no
            "#,
        )
        .bind(sale_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_sale_items", e))?;

        let lines = lines
            .iter()
            .map(|row| decode::<SaleLineRow>(row).map(SaleLine::from))
            .collect::<LedgerResult<Vec<SaleLine>>>()?;

        decode::<SaleRow>(&header)?.into_sale(lines)
    }

    #[instrument(skip(self), fields(operation = "derive_quantity", item_id = %item_id), err)]
    async fn derive_quantity(&self, item_id: ItemId, scope: Option<BranchId>) -> LedgerResult<i64> {
        let history = self.list_transactions(item_id, scope).await?;
        Ok(derive_quantity(&history))
    }
}

/// Lock the rows of every referenced item in id order and return them keyed by id.
///
/// Ids that match no row are simply absent; the planner reports them.
async fn lock_items(
    tx: &mut Transaction<'_, Postgres>,
    ids: impl Iterator<Item = ItemId>,
) -> LedgerResult<BTreeMap<ItemId, InventoryItem>> {
    let mut ids: Vec<uuid::Uuid> = ids.map(|id| *id.as_uuid()).collect();
    ids.sort();
    ids.dedup();

    let sql = format!(
        "SELECT {ITEM_COLUMNS} FROM inventory_items WHERE id = ANY($1) ORDER BY id FOR UPDATE"
    );
    let rows = sqlx::query(&sql)
        .bind(ids)
        .fetch_all(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("lock_items", e))?;

    let mut snapshot = BTreeMap::new();
    for row in &rows {
        let item: InventoryItem = decode::<ItemRow>(row)?.into();
        snapshot.insert(item.id, item);
    }
    debug!(locked = snapshot.len(), "locked inventory rows");
    Ok(snapshot)
}

async fn write_plan(tx: &mut Transaction<'_, Postgres>, plan: &LedgerPlan) -> LedgerResult<()> {
    for transaction in &plan.transactions {
        insert_transaction(tx, transaction).await?;
    }

    let now = plan
        .transactions
        .first()
        .map(|t| t.created_at)
        .unwrap_or_else(Utc::now);
    for (item_id, quantity) in &plan.quantities {
        sqlx::query("UPDATE inventory_items SET quantity = $2, updated_at = $3 WHERE id = $1")
            .bind(item_id.as_uuid())
            .bind(*quantity)
            .bind(now)
            .execute(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("update_quantity", e))?;
    }
    Ok(())
}

async fn insert_transaction(
    tx: &mut Transaction<'_, Postgres>,
    t: &StockTransaction,
) -> LedgerResult<()> {
    sqlx::query(
        r#"
        INSERT INTO inventory_transactions
            (id, item_id, type, quantity, price, total_amount, notes,
             customer_supplier, payment_status, created_by, branch_id, created_at)
        VALUES ($1, $2, $3::inventory_transaction_type, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        "#,
    )
    .bind(t.id.as_uuid())
    .bind(t.item_id.as_uuid())
    .bind(t.kind.as_str())
    .bind(t.quantity)
    .bind(t.price)
    .bind(t.total_amount)
    .bind(&t.notes)
    .bind(&t.customer_supplier)
    .bind(t.payment_status.map(PaymentStatus::as_str))
    .bind(t.created_by.map(|u| *u.as_uuid()))
    .bind(t.branch_id.map(|b| *b.as_uuid()))
    .bind(t.created_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("insert_transaction", e))?;
    Ok(())
}

async fn insert_sale(tx: &mut Transaction<'_, Postgres>, sale: &Sale) -> LedgerResult<()> {
    sqlx::query(
        r#"
        INSERT INTO sales
            (id, subtotal, tax, discount, total, payment_method,
             customer_name, customer_email, customer_phone,
             created_by, branch_id, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        "#,
    )
    .bind(sale.id.as_uuid())
    .bind(sale.totals.subtotal)
    .bind(sale.totals.tax)
    .bind(sale.totals.discount)
    .bind(sale.totals.total)
    .bind(sale.payment_method.as_str())
    .bind(&sale.customer.name)
    .bind(&sale.customer.email)
    .bind(&sale.customer.phone)
    .bind(sale.created_by.map(|u| *u.as_uuid()))
    .bind(sale.branch_id.map(|b| *b.as_uuid()))
    .bind(sale.created_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("insert_sale", e))?;

    for (line_no, line) in sale.lines.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO sale_items
                (sale_id, line_no, item_id, transaction_id, quantity, price, total)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(sale.id.as_uuid())
        .bind(line_no as i32)
        .bind(line.item_id.as_uuid())
        .bind(line.transaction_id.as_uuid())
        .bind(line.quantity)
        .bind(line.price)
        .bind(line.total)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("insert_sale_item", e))?;
    }
    Ok(())
}

fn decode<'r, T: FromRow<'r, PgRow>>(row: &'r PgRow) -> LedgerResult<T> {
    T::from_row(row).map_err(|e| LedgerError::store(format!("failed to decode row: {e}")))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

/// Map SQLx errors to `LedgerError`; see the module docs for the table.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> LedgerError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => LedgerError::Domain(DomainError::conflict(msg)),
                _ => LedgerError::Store(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            LedgerError::Store(format!("connection pool closed in {}", operation))
        }
        other => LedgerError::Store(format!("sqlx error in {}: {}", operation, other)),
    }
}

#[derive(Debug)]
struct ItemRow {
    id: uuid::Uuid,
    sku: String,
    name: String,
    description: Option<String>,
    category: Option<String>,
    quantity: i64,
    price: Decimal,
    cost: Decimal,
    reorder_level: Option<i64>,
    branch_id: Option<uuid::Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for ItemRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ItemRow {
            id: row.try_get("id")?,
            sku: row.try_get("sku")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            category: row.try_get("category")?,
            quantity: row.try_get("quantity")?,
            price: row.try_get("price")?,
            cost: row.try_get("cost")?,
            reorder_level: row.try_get("reorder_level")?,
            branch_id: row.try_get("branch_id")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl From<ItemRow> for InventoryItem {
    fn from(row: ItemRow) -> Self {
        InventoryItem {
            id: ItemId::from_uuid(row.id),
            sku: row.sku,
            name: row.name,
            description: row.description,
            category: row.category,
            quantity: row.quantity,
            price: row.price,
            cost: row.cost,
            reorder_level: row.reorder_level,
            branch_id: row.branch_id.map(BranchId::from_uuid),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug)]
struct TransactionRow {
    id: uuid::Uuid,
    item_id: uuid::Uuid,
    kind: String,
    quantity: i64,
    price: Decimal,
    total_amount: Decimal,
    notes: Option<String>,
    customer_supplier: Option<String>,
    payment_status: Option<String>,
    created_by: Option<uuid::Uuid>,
    branch_id: Option<uuid::Uuid>,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for TransactionRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(TransactionRow {
            id: row.try_get("id")?,
            item_id: row.try_get("item_id")?,
            kind: row.try_get("kind")?,
            quantity: row.try_get("quantity")?,
            price: row.try_get("price")?,
            total_amount: row.try_get("total_amount")?,
            notes: row.try_get("notes")?,
            customer_supplier: row.try_get("customer_supplier")?,
            payment_status: row.try_get("payment_status")?,
            created_by: row.try_get("created_by")?,
            branch_id: row.try_get("branch_id")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl TryFrom<TransactionRow> for StockTransaction {
    type Error = LedgerError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        let kind: TransactionKind = row
            .kind
            .parse()
            .map_err(|e| LedgerError::store(format!("stored transaction {}: {e}", row.id)))?;
        let payment_status = row
            .payment_status
            .as_deref()
            .map(str::parse::<PaymentStatus>)
            .transpose()
            .map_err(|e| LedgerError::store(format!("stored transaction {}: {e}", row.id)))?;

        Ok(StockTransaction {
            id: TransactionId::from_uuid(row.id),
            item_id: ItemId::from_uuid(row.item_id),
            kind,
            quantity: row.quantity,
            price: row.price,
            total_amount: row.total_amount,
            notes: row.notes,
            customer_supplier: row.customer_supplier,
            payment_status,
            created_by: row.created_by.map(UserId::from_uuid),
            branch_id: row.branch_id.map(BranchId::from_uuid),
            created_at: row.created_at,
        })
    }
}

#[derive(Debug)]
struct SaleRow {
    id: uuid::Uuid,
    subtotal: Decimal,
    tax: Decimal,
    discount: Decimal,
    total: Decimal,
    payment_method: String,
    customer_name: Option<String>,
    customer_email: Option<String>,
    customer_phone: Option<String>,
    created_by: Option<uuid::Uuid>,
    branch_id: Option<uuid::Uuid>,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for SaleRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(SaleRow {
            id: row.try_get("id")?,
            subtotal: row.try_get("subtotal")?,
            tax: row.try_get("tax")?,
            discount: row.try_get("discount")?,
            total: row.try_get("total")?,
            payment_method: row.try_get("payment_method")?,
            customer_name: row.try_get("customer_name")?,
            customer_email: row.try_get("customer_email")?,
            customer_phone: row.try_get("customer_phone")?,
            created_by: row.try_get("created_by")?,
            branch_id: row.try_get("branch_id")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl SaleRow {
    fn into_sale(self, lines: Vec<SaleLine>) -> LedgerResult<Sale> {
        let payment_method = PaymentMethod::parse(&self.payment_method)
            .map_err(|e| LedgerError::store(format!("stored sale {}: {e}", self.id)))?;

        Ok(Sale {
            id: SaleId::from_uuid(self.id),
            lines,
            totals: SaleTotals {
                subtotal: self.subtotal,
                tax: self.tax,
                discount: self.discount,
                total: self.total,
            },
            payment_method,
            customer: Customer {
                name: self.customer_name,
                email: self.customer_email,
                phone: self.customer_phone,
            },
            created_by: self.created_by.map(UserId::from_uuid),
            branch_id: self.branch_id.map(BranchId::from_uuid),
            created_at: self.created_at,
        })
    }
}

#[derive(Debug)]
struct SaleLineRow {
    item_id: uuid::Uuid,
    transaction_id: uuid::Uuid,
    quantity: i64,
    price: Decimal,
    total: Decimal,
}

impl<'r> FromRow<'r, PgRow> for SaleLineRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(SaleLineRow {
            item_id: row.try_get("item_id")?,
            transaction_id: row.try_get("transaction_id")?,
            quantity: row.try_get("quantity")?,
            price: row.try_get("price")?,
            total: row.try_get("total")?,
        })
    }
}

impl From<SaleLineRow> for SaleLine {
    fn from(row: SaleLineRow) -> Self {
        SaleLine {
            item_id: ItemId::from_uuid(row.item_id),
            transaction_id: TransactionId::from_uuid(row.transaction_id),
            quantity: row.quantity,
            price: row.price,
            total: row.total,
        }
    }
}
