//! Ledger planning: the single place where stock arithmetic happens.
//!
//! Stores lock the rows of every item a unit touches, hand the locked snapshot to
//! [`plan_entries`], and then persist the returned [`LedgerPlan`] (append every
//! transaction, set every quantity) in the same store transaction. A planning
//! error means nothing is written.
//!
//! Invariant kept by every plan: for each touched item,
//! `planned quantity == snapshot quantity + Σ signed(entry)`, and no planned
//! quantity is negative at any point in request order.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use gymdesk_core::{DomainError, DomainResult, ItemId, TransactionId};

use crate::item::{InventoryItem, NewItem};
use crate::money::{line_total, money};
use crate::transaction::{EntryRequest, LedgerMeta, StockTransaction, TransactionKind};

/// Writes decided for one atomic unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerPlan {
    /// New ledger rows, in request order.
    pub transactions: Vec<StockTransaction>,
    /// Resulting cached quantity per touched item.
    pub quantities: BTreeMap<ItemId, i64>,
}

impl LedgerPlan {
    pub fn quantity_for(&self, item_id: &ItemId) -> Option<i64> {
        self.quantities.get(item_id).copied()
    }
}

/// Plan a unit of entries of one kind against a locked snapshot.
///
/// Entries are applied in order, so the same item may appear more than once.
/// The first unknown (or out-of-scope) item fails with `NotFound`; the first
/// entry that would take an item below zero fails with `InsufficientStock`.
pub fn plan_entries(
    snapshot: &BTreeMap<ItemId, InventoryItem>,
    kind: TransactionKind,
    entries: &[EntryRequest],
    meta: &LedgerMeta,
    now: DateTime<Utc>,
) -> DomainResult<LedgerPlan> {
    let mut quantities: BTreeMap<ItemId, i64> = BTreeMap::new();
    let mut transactions = Vec::with_capacity(entries.len());

    for entry in entries {
        if entry.quantity <= 0 {
            return Err(DomainError::validation("quantity must be a positive integer"));
        }

        let item = snapshot
            .get(&entry.item_id)
            .filter(|item| item.visible_to(meta.branch_id))
            .ok_or_else(|| DomainError::item_not_found(entry.item_id))?;

        let current = quantities.get(&item.id).copied().unwrap_or(item.quantity);
        let next = current
            .checked_add(kind.signed(entry.quantity))
            .ok_or_else(|| DomainError::validation("quantity out of range"))?;
        if next < 0 {
            return Err(DomainError::insufficient_stock(item.id, current, entry.quantity));
        }
        quantities.insert(item.id, next);

        let price = money(entry.price.unwrap_or_else(|| item.default_unit_price(kind)));
        let total_amount = line_total(price, entry.quantity)?;
        transactions.push(StockTransaction {
            id: TransactionId::new(),
            item_id: item.id,
            kind,
            quantity: entry.quantity,
            price,
            total_amount,
            notes: meta.notes.clone(),
            customer_supplier: meta.customer_supplier.clone(),
            payment_status: meta.payment_status,
            created_by: meta.created_by,
            branch_id: meta.branch_id,
            created_at: now,
        });
    }

    Ok(LedgerPlan {
        transactions,
        quantities,
    })
}

/// Plan the creation of an item and, for a positive starting quantity, its
/// `beginning` entry priced at cost.
///
/// The returned item already carries the seeded quantity.
pub fn plan_new_item(
    new_item: NewItem,
    meta: &LedgerMeta,
    now: DateTime<Utc>,
) -> DomainResult<(InventoryItem, Option<StockTransaction>)> {
    new_item.validate()?;

    let starting = new_item.quantity;
    let mut item = new_item.into_item(ItemId::new(), meta.branch_id, now);
    if starting == 0 {
        return Ok((item, None));
    }

    let snapshot = BTreeMap::from([(item.id, item.clone())]);
    let entry = EntryRequest {
        item_id: item.id,
        quantity: starting,
        price: None,
    };
    let mut plan = plan_entries(&snapshot, TransactionKind::Beginning, &[entry], meta, now)?;
    item.quantity = plan.quantity_for(&item.id).unwrap_or(starting);

    Ok((item, plan.transactions.pop()))
}

/// Recompute an item's quantity purely from its ledger history.
pub fn derive_quantity<'a, I>(entries: I) -> i64
where
    I: IntoIterator<Item = &'a StockTransaction>,
{
    entries.into_iter().map(StockTransaction::signed_quantity).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::str::FromStr;
    use gymdesk_core::BranchId;
    use proptest::prelude::*;
    use rust_decimal::Decimal;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn new_item(quantity: i64) -> NewItem {
        NewItem {
            sku: format!("SKU-{}", ItemId::new()),
            name: "Protein bar".to_string(),
            description: None,
            category: None,
            price: dec("4.99"),
            cost: dec("2.00"),
            quantity,
            reorder_level: None,
        }
    }

    fn snapshot_of(items: &[&InventoryItem]) -> BTreeMap<ItemId, InventoryItem> {
        items.iter().map(|i| (i.id, (*i).clone())).collect()
    }

    /// Apply a plan the way a store would.
    fn commit(
        items: &mut BTreeMap<ItemId, InventoryItem>,
        ledger: &mut Vec<StockTransaction>,
        plan: LedgerPlan,
    ) {
        for (id, q) in plan.quantities {
            items.get_mut(&id).unwrap().quantity = q;
        }
        ledger.extend(plan.transactions);
    }

    fn entry(item_id: ItemId, quantity: i64, price: Option<&str>) -> EntryRequest {
        EntryRequest {
            item_id,
            quantity,
            price: price.map(dec),
        }
    }

    #[test]
    fn new_item_with_starting_stock_seeds_beginning_entry() {
        let (item, seed) = plan_new_item(new_item(50), &LedgerMeta::default(), test_time()).unwrap();
        let seed = seed.expect("beginning entry");
        assert_eq!(item.quantity, 50);
        assert_eq!(seed.kind, TransactionKind::Beginning);
        assert_eq!(seed.quantity, 50);
        assert_eq!(seed.price.to_string(), "2.00");
        assert_eq!(seed.total_amount.to_string(), "100.00");
        assert_eq!(derive_quantity([&seed]), item.quantity);
    }

    #[test]
    fn new_item_without_starting_stock_has_no_entry() {
        let (item, seed) = plan_new_item(new_item(0), &LedgerMeta::default(), test_time()).unwrap();
        assert_eq!(item.quantity, 0);
        assert!(seed.is_none());
    }

    #[test]
    fn new_item_inherits_caller_branch() {
        let branch = BranchId::new();
        let meta = LedgerMeta {
            branch_id: Some(branch),
            ..LedgerMeta::default()
        };
        let (item, seed) = plan_new_item(new_item(3), &meta, test_time()).unwrap();
        assert_eq!(item.branch_id, Some(branch));
        assert_eq!(seed.unwrap().branch_id, Some(branch));
    }

    #[test]
    fn beginning_then_sale_then_oversell() {
        let (item, _) = plan_new_item(new_item(0), &LedgerMeta::default(), test_time()).unwrap();
        let mut items = snapshot_of(&[&item]);
        let mut ledger = Vec::new();
        let meta = LedgerMeta::default();

        let plan = plan_entries(
            &items,
            TransactionKind::Beginning,
            &[entry(item.id, 50, Some("2.00"))],
            &meta,
            test_time(),
        )
        .unwrap();
        assert_eq!(plan.transactions[0].total_amount.to_string(), "100.00");
        commit(&mut items, &mut ledger, plan);
        assert_eq!(items[&item.id].quantity, 50);

        let plan = plan_entries(
            &items,
            TransactionKind::Sale,
            &[entry(item.id, 5, Some("4.99"))],
            &meta,
            test_time(),
        )
        .unwrap();
        assert_eq!(plan.transactions[0].total_amount.to_string(), "24.95");
        commit(&mut items, &mut ledger, plan);
        assert_eq!(items[&item.id].quantity, 45);

        let err = plan_entries(
            &items,
            TransactionKind::Sale,
            &[entry(item.id, 1000, None)],
            &meta,
            test_time(),
        )
        .unwrap_err();
        assert_eq!(err, DomainError::insufficient_stock(item.id, 45, 1000));
        assert_eq!(items[&item.id].quantity, 45);
        assert_eq!(derive_quantity(&ledger), 45);
    }

    #[test]
    fn missing_price_falls_back_by_kind() {
        let (item, _) = plan_new_item(new_item(10), &LedgerMeta::default(), test_time()).unwrap();
        let items = snapshot_of(&[&item]);
        let meta = LedgerMeta::default();

        let sale = plan_entries(&items, TransactionKind::Sale, &[entry(item.id, 1, None)], &meta, test_time())
            .unwrap();
        assert_eq!(sale.transactions[0].price.to_string(), "4.99");

        let out = plan_entries(
            &items,
            TransactionKind::AdjustmentOut,
            &[entry(item.id, 1, None)],
            &meta,
            test_time(),
        )
        .unwrap();
        assert_eq!(out.transactions[0].price.to_string(), "2.00");
    }

    #[test]
    fn repeated_item_in_one_unit_sees_earlier_entries() {
        let (item, _) = plan_new_item(new_item(10), &LedgerMeta::default(), test_time()).unwrap();
        let items = snapshot_of(&[&item]);

        let ok = plan_entries(
            &items,
            TransactionKind::Sale,
            &[entry(item.id, 6, None), entry(item.id, 4, None)],
            &LedgerMeta::default(),
            test_time(),
        )
        .unwrap();
        assert_eq!(ok.quantity_for(&item.id), Some(0));

        let err = plan_entries(
            &items,
            TransactionKind::Sale,
            &[entry(item.id, 6, None), entry(item.id, 5, None)],
            &LedgerMeta::default(),
            test_time(),
        )
        .unwrap_err();
        assert_eq!(err, DomainError::insufficient_stock(item.id, 4, 5));
    }

    #[test]
    fn unknown_item_fails_the_whole_unit() {
        let (a, _) = plan_new_item(new_item(0), &LedgerMeta::default(), test_time()).unwrap();
        let items = snapshot_of(&[&a]);
        let missing = ItemId::new();

        let err = plan_entries(
            &items,
            TransactionKind::Purchase,
            &[entry(a.id, 10, None), entry(missing, 5, None)],
            &LedgerMeta::default(),
            test_time(),
        )
        .unwrap_err();
        assert_eq!(err, DomainError::item_not_found(missing));
    }

    #[test]
    fn oversized_amounts_are_rejected_without_writes() {
        let (a, _) = plan_new_item(new_item(0), &LedgerMeta::default(), test_time()).unwrap();
        let items = snapshot_of(&[&a]);

        for (quantity, price) in [(1_000_000_000, "100000000000000000000"), (2, "9999999999.99")] {
            let err = plan_entries(
                &items,
                TransactionKind::Purchase,
                &[entry(a.id, 1, None), entry(a.id, quantity, Some(price))],
                &LedgerMeta::default(),
                test_time(),
            )
            .unwrap_err();
            assert!(matches!(err, DomainError::Validation(_)), "{err:?}");
        }
    }

    #[test]
    fn items_of_other_branches_are_not_found() {
        let owner = LedgerMeta {
            branch_id: Some(BranchId::new()),
            ..LedgerMeta::default()
        };
        let (item, _) = plan_new_item(new_item(5), &owner, test_time()).unwrap();
        let items = snapshot_of(&[&item]);
        let stranger = LedgerMeta {
            branch_id: Some(BranchId::new()),
            ..LedgerMeta::default()
        };

        let err = plan_entries(&items, TransactionKind::Sale, &[entry(item.id, 1, None)], &stranger, test_time())
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[test]
    fn entries_carry_meta() {
        let (item, _) = plan_new_item(new_item(5), &LedgerMeta::default(), test_time()).unwrap();
        let items = snapshot_of(&[&item]);
        let meta = LedgerMeta {
            notes: Some("restock".to_string()),
            customer_supplier: Some("Acme Nutrition".to_string()),
            payment_status: Some(crate::PaymentStatus::Pending),
            created_by: Some(gymdesk_core::UserId::new()),
            branch_id: None,
        };
        let plan = plan_entries(&items, TransactionKind::Purchase, &[entry(item.id, 2, None)], &meta, test_time())
            .unwrap();
        let tx = &plan.transactions[0];
        assert_eq!(tx.notes, meta.notes);
        assert_eq!(tx.customer_supplier, meta.customer_supplier);
        assert_eq!(tx.payment_status, meta.payment_status);
        assert_eq!(tx.created_by, meta.created_by);
    }

    fn arb_kind() -> impl Strategy<Value = TransactionKind> {
        prop_oneof![
            Just(TransactionKind::Purchase),
            Just(TransactionKind::Sale),
            Just(TransactionKind::AdjustmentIn),
            Just(TransactionKind::AdjustmentOut),
            Just(TransactionKind::Beginning),
        ]
    }

    proptest! {
        #[test]
        fn cached_quantity_always_matches_ledger(ops in prop::collection::vec((arb_kind(), 1i64..40), 0..60)) {
            let (item, seed) = plan_new_item(new_item(0), &LedgerMeta::default(), test_time()).unwrap();
            prop_assert!(seed.is_none());
            let mut items = snapshot_of(&[&item]);
            let mut ledger = Vec::new();

            for (kind, quantity) in ops {
                let before = items[&item.id].quantity;
                match plan_entries(&items, kind, &[entry(item.id, quantity, None)], &LedgerMeta::default(), test_time()) {
                    Ok(plan) => commit(&mut items, &mut ledger, plan),
                    Err(DomainError::InsufficientStock { available, requested, .. }) => {
                        prop_assert!(!kind.is_inbound());
                        prop_assert_eq!(available, before);
                        prop_assert!(requested > available);
                    }
                    Err(other) => prop_assert!(false, "unexpected error: {other:?}"),
                }
                prop_assert!(items[&item.id].quantity >= 0);
                prop_assert_eq!(items[&item.id].quantity, derive_quantity(&ledger));
            }
        }

        #[test]
        fn bulk_with_a_bad_entry_plans_nothing(
            quantities in prop::collection::vec(1i64..20, 1..8),
            bad_at in 0usize..8,
        ) {
            let (a, _) = plan_new_item(new_item(100), &LedgerMeta::default(), test_time()).unwrap();
            let items = snapshot_of(&[&a]);
            let mut entries: Vec<EntryRequest> =
                quantities.iter().map(|q| entry(a.id, *q, None)).collect();
            let bad_at = bad_at.min(entries.len());
            entries.insert(bad_at, entry(ItemId::new(), 1, None));

            let result = plan_entries(&items, TransactionKind::Purchase, &entries, &LedgerMeta::default(), test_time());
            prop_assert!(matches!(result, Err(DomainError::NotFound(_))));
        }
    }
}
