//! The inventory ledger engine.
//!
//! Two tables, one owner: the append-only `InventoryTransaction` log (source
//! of truth) and the derived `BranchInventory` balance cache (accelerator).
//! Both are mutated under a single write guard per call, so a reader can
//! never observe a ledger row without its cache update or vice versa, and
//! two concurrent mutations of the same balance cannot interleave their
//! read-modify-write steps.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use franops_core::{
    ActorId, BranchId, Clock, OpsError, OpsResult, Quantity, RequestId, SaleLineId, StockItemId,
    SystemClock, TransactionId,
};

use crate::catalog::Catalog;
use crate::kind::{normalize, TransactionKind};

/// Optional back-reference to the operation that caused a transaction.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionLink {
    PurchaseRequest(RequestId),
    SaleLine(SaleLineId),
}

/// Immutable ledger row. Once appended, never mutated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: TransactionId,
    pub branch: BranchId,
    pub stock_item: StockItemId,
    pub kind: TransactionKind,
    /// Normalized signed delta (see [`crate::kind::normalize`]).
    pub quantity_change: Quantity,
    pub unit_cost: Option<Quantity>,
    pub link: Option<TransactionLink>,
    pub created_by: ActorId,
    pub approved_by: Option<ActorId>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Point-in-time balance view, shaped for dashboards and reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    pub branch: BranchId,
    pub stock_item: StockItemId,
    pub quantity: Quantity,
    pub reorder_level: Quantity,
    pub updated_at: DateTime<Utc>,
}

/// Input for one ledger mutation.
#[derive(Debug, Clone)]
pub struct PostTransaction {
    pub branch: BranchId,
    pub stock_item: StockItemId,
    pub kind: TransactionKind,
    /// Caller-signed quantity; normalized by kind before it is applied.
    pub quantity: Quantity,
    pub unit_cost: Option<Quantity>,
    pub link: Option<TransactionLink>,
    pub created_by: ActorId,
    pub approved_by: Option<ActorId>,
    pub note: Option<String>,
}

/// One cache-vs-ledger discrepancy found by [`Ledger::reconcile`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconcileDiff {
    pub branch: BranchId,
    pub stock_item: StockItemId,
    pub cached: Quantity,
    pub recomputed: Quantity,
}

#[derive(Debug, Clone)]
struct BalanceRow {
    quantity: Quantity,
    reorder_level: Quantity,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct LedgerTables {
    balances: HashMap<(BranchId, StockItemId), BalanceRow>,
    transactions: Vec<TransactionRecord>,
    next_transaction_id: i64,
}

/// The only component that writes stock balances.
pub struct Ledger {
    inner: RwLock<LedgerTables>,
    clock: Arc<dyn Clock>,
}

impl Ledger {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: RwLock::new(LedgerTables::default()),
            clock,
        }
    }

    pub fn with_system_clock() -> Self {
        Self::new(Arc::new(SystemClock))
    }

    /// Apply one signed quantity delta to a branch/item balance.
    ///
    /// Negative resulting balances are recorded, not rejected: oversell is
    /// a signal for operational alerting, and upstream flows legitimately
    /// race with delayed restocking.
    pub fn apply(
        &self,
        post: PostTransaction,
        catalog: &dyn Catalog,
    ) -> OpsResult<(TransactionRecord, BalanceSnapshot)> {
        let mut posted = self.apply_all(vec![post], catalog)?;
        posted
            .pop()
            .ok_or_else(|| OpsError::internal("ledger returned an empty batch"))
    }

    /// Apply a batch of deltas as one unit: either every post lands or none
    /// do.
    ///
    /// All catalog checks and all resulting balances (including overflow)
    /// are staged before the first write, so a failure anywhere in the batch
    /// leaves both tables untouched. Approval flows rely on this to post one
    /// stock-in per request item without a partially applied request.
    pub fn apply_all(
        &self,
        posts: Vec<PostTransaction>,
        catalog: &dyn Catalog,
    ) -> OpsResult<Vec<(TransactionRecord, BalanceSnapshot)>> {
        for post in &posts {
            self.check_pair(post.branch, post.stock_item, catalog)?;
        }

        let now = self.clock.now();
        let mut tables = self.write()?;

        let mut running: HashMap<(BranchId, StockItemId), Quantity> = HashMap::new();
        let mut staged = Vec::with_capacity(posts.len());
        let mut next_id = tables.next_transaction_id;
        for post in posts {
            let key = (post.branch, post.stock_item);
            let current = match running.get(&key) {
                Some(quantity) => *quantity,
                None => tables
                    .balances
                    .get(&key)
                    .map(|row| row.quantity)
                    .unwrap_or(Decimal::ZERO),
            };
            let delta = normalize(post.kind, post.quantity);
            let quantity = current.checked_add(delta).ok_or_else(|| {
                OpsError::bad_request("quantity change overflows the stock balance")
            })?;
            running.insert(key, quantity);

            next_id += 1;
            staged.push((
                TransactionRecord {
                    id: TransactionId::new(next_id),
                    branch: post.branch,
                    stock_item: post.stock_item,
                    kind: post.kind,
                    quantity_change: delta,
                    unit_cost: post.unit_cost,
                    link: post.link,
                    created_by: post.created_by,
                    approved_by: post.approved_by,
                    note: post.note,
                    created_at: now,
                },
                quantity,
            ));
        }

        // Commit; nothing below can fail.
        tables.next_transaction_id = next_id;
        let mut out = Vec::with_capacity(staged.len());
        for (record, quantity) in staged {
            let row = tables
                .balances
                .entry((record.branch, record.stock_item))
                .or_insert_with(|| BalanceRow {
                    quantity: Decimal::ZERO,
                    reorder_level: Decimal::ZERO,
                    updated_at: now,
                });
            row.quantity = quantity;
            row.updated_at = now;
            let snapshot = snapshot_of(record.branch, record.stock_item, row);

            tracing::debug!(
                branch = %record.branch,
                stock_item = %record.stock_item,
                kind = %record.kind,
                delta = %record.quantity_change,
                balance = %snapshot.quantity,
                "ledger transaction applied"
            );

            tables.transactions.push(record.clone());
            out.push((record, snapshot));
        }
        Ok(out)
    }

    /// Start tracking an item at a branch with an opening balance.
    ///
    /// Rejects a pair that is already tracked; additions to an existing
    /// balance go through [`Ledger::apply`]. The opening balance lands in
    /// the ledger as one ADJUSTMENT row, so reconciliation holds from the
    /// first day.
    pub fn initialize_item(
        &self,
        branch: BranchId,
        stock_item: StockItemId,
        quantity: Quantity,
        reorder_level: Quantity,
        created_by: ActorId,
        catalog: &dyn Catalog,
    ) -> OpsResult<BalanceSnapshot> {
        self.check_pair(branch, stock_item, catalog)?;
        if quantity < Decimal::ZERO {
            return Err(OpsError::bad_request("opening quantity cannot be negative"));
        }

        let now = self.clock.now();
        let mut tables = self.write()?;

        if tables.balances.contains_key(&(branch, stock_item)) {
            return Err(OpsError::bad_request(
                "item is already tracked at this branch; use a stock-in to add quantity",
            ));
        }

        let row = BalanceRow {
            quantity,
            reorder_level,
            updated_at: now,
        };
        let snapshot = snapshot_of(branch, stock_item, &row);
        tables.balances.insert((branch, stock_item), row);

        tables.next_transaction_id += 1;
        let id = TransactionId::new(tables.next_transaction_id);
        tables.transactions.push(TransactionRecord {
            id,
            branch,
            stock_item,
            kind: TransactionKind::Adjustment,
            quantity_change: quantity,
            unit_cost: None,
            link: None,
            created_by,
            approved_by: None,
            note: Some("Initial inventory load".to_string()),
            created_at: now,
        });

        Ok(snapshot)
    }

    /// Balance snapshot for one branch/item pair, if tracked.
    pub fn balance(&self, branch: BranchId, stock_item: StockItemId) -> Option<BalanceSnapshot> {
        let tables = self.read();
        tables
            .balances
            .get(&(branch, stock_item))
            .map(|row| snapshot_of(branch, stock_item, row))
    }

    /// All tracked balances for a branch, ordered by stock item id.
    pub fn balances(&self, branch: BranchId) -> Vec<BalanceSnapshot> {
        let tables = self.read();
        let mut out: Vec<BalanceSnapshot> = tables
            .balances
            .iter()
            .filter(|((b, _), _)| *b == branch)
            .map(|((_, item), row)| snapshot_of(branch, *item, row))
            .collect();
        out.sort_by_key(|s| s.stock_item);
        out
    }

    /// Balances at or below their reorder level (level 0 never flags).
    pub fn below_reorder(&self, branch: BranchId) -> Vec<BalanceSnapshot> {
        self.balances(branch)
            .into_iter()
            .filter(|s| s.reorder_level > Decimal::ZERO && s.quantity <= s.reorder_level)
            .collect()
    }

    /// Audit trail for one branch/item pair, oldest first.
    pub fn transactions_for(
        &self,
        branch: BranchId,
        stock_item: StockItemId,
    ) -> Vec<TransactionRecord> {
        let tables = self.read();
        tables
            .transactions
            .iter()
            .filter(|t| t.branch == branch && t.stock_item == stock_item)
            .cloned()
            .collect()
    }

    /// Total number of ledger rows (all branches).
    pub fn transaction_count(&self) -> usize {
        self.read().transactions.len()
    }

    /// Compare every cached balance against the recomputed ledger sum.
    ///
    /// A healthy system returns an empty list.
    pub fn reconcile(&self) -> Vec<ReconcileDiff> {
        let tables = self.read();
        let sums = ledger_sums(&tables);

        let mut diffs = Vec::new();
        for (key, row) in &tables.balances {
            let recomputed = sums.get(key).copied().unwrap_or(Decimal::ZERO);
            if row.quantity != recomputed {
                diffs.push(ReconcileDiff {
                    branch: key.0,
                    stock_item: key.1,
                    cached: row.quantity,
                    recomputed,
                });
            }
        }
        // Pairs with ledger rows but no cache row at all.
        for (key, recomputed) in &sums {
            if !tables.balances.contains_key(key) {
                diffs.push(ReconcileDiff {
                    branch: key.0,
                    stock_item: key.1,
                    cached: Decimal::ZERO,
                    recomputed: *recomputed,
                });
            }
        }
        diffs.sort_by_key(|d| (d.branch, d.stock_item));
        diffs
    }

    /// Rewrite the cache from the ledger. Idempotent; returns the number of
    /// rows that actually changed (zero on a healthy system).
    pub fn repair(&self) -> OpsResult<usize> {
        let now = self.clock.now();
        let mut tables = self.write()?;
        let sums = ledger_sums(&tables);

        let mut fixed = 0usize;
        for (key, row) in tables.balances.iter_mut() {
            let recomputed = sums.get(key).copied().unwrap_or(Decimal::ZERO);
            if row.quantity != recomputed {
                row.quantity = recomputed;
                row.updated_at = now;
                fixed += 1;
            }
        }
        let missing: Vec<((BranchId, StockItemId), Quantity)> = sums
            .into_iter()
            .filter(|(key, _)| !tables.balances.contains_key(key))
            .collect();
        for (key, recomputed) in missing {
            tables.balances.insert(
                key,
                BalanceRow {
                    quantity: recomputed,
                    reorder_level: Decimal::ZERO,
                    updated_at: now,
                },
            );
            fixed += 1;
        }

        if fixed > 0 {
            tracing::warn!(rows = fixed, "inventory cache repaired from ledger");
        }
        Ok(fixed)
    }

    fn check_pair(
        &self,
        branch: BranchId,
        stock_item: StockItemId,
        catalog: &dyn Catalog,
    ) -> OpsResult<()> {
        let branch_info = catalog
            .branch(branch)
            .ok_or_else(|| OpsError::not_found(format!("branch {branch}")))?;
        if !branch_info.active {
            return Err(OpsError::bad_request("branch is not active"));
        }
        let item = catalog
            .stock_item(stock_item)
            .ok_or_else(|| OpsError::bad_request(format!("stock item {stock_item} not found")))?;
        if item.franchise != branch_info.franchise {
            return Err(OpsError::bad_request(
                "stock item does not belong to this branch's franchise",
            ));
        }
        Ok(())
    }

    fn write(&self) -> OpsResult<std::sync::RwLockWriteGuard<'_, LedgerTables>> {
        self.inner
            .write()
            .map_err(|_| OpsError::internal("ledger lock poisoned"))
    }

    // Reads recover a poisoned guard: every mutation stages its whole batch
    // before committing, so the tables are consistent even after a panic.
    fn read(&self) -> std::sync::RwLockReadGuard<'_, LedgerTables> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }
}

fn snapshot_of(branch: BranchId, stock_item: StockItemId, row: &BalanceRow) -> BalanceSnapshot {
    BalanceSnapshot {
        branch,
        stock_item,
        quantity: row.quantity,
        reorder_level: row.reorder_level,
        updated_at: row.updated_at,
    }
}

fn ledger_sums(tables: &LedgerTables) -> HashMap<(BranchId, StockItemId), Quantity> {
    let mut sums: HashMap<(BranchId, StockItemId), Quantity> = HashMap::new();
    for t in &tables.transactions {
        *sums.entry((t.branch, t.stock_item)).or_insert(Decimal::ZERO) += t.quantity_change;
    }
    sums
}

#[cfg(test)]
mod tests {
    use super::*;
    use franops_core::{FixedClock, FranchiseId, UserId};
    use proptest::prelude::*;

    use crate::catalog::{BranchInfo, StockItemInfo};

    struct FakeCatalog {
        branches: Vec<BranchInfo>,
        items: Vec<StockItemInfo>,
    }

    impl FakeCatalog {
        fn single() -> Self {
            Self {
                branches: vec![BranchInfo {
                    id: BranchId::new(1),
                    franchise: FranchiseId::new(1),
                    active: true,
                }],
                items: vec![
                    StockItemInfo { id: StockItemId::new(10), franchise: FranchiseId::new(1) },
                    StockItemInfo { id: StockItemId::new(11), franchise: FranchiseId::new(1) },
                    StockItemInfo { id: StockItemId::new(20), franchise: FranchiseId::new(2) },
                ],
            }
        }
    }

    impl Catalog for FakeCatalog {
        fn branch(&self, id: BranchId) -> Option<BranchInfo> {
            self.branches.iter().find(|b| b.id == id).copied()
        }
        fn stock_item(&self, id: StockItemId) -> Option<StockItemInfo> {
            self.items.iter().find(|i| i.id == id).copied()
        }
    }

    fn actor() -> ActorId {
        ActorId::User(UserId::new(1))
    }

    fn post(kind: TransactionKind, quantity: i64) -> PostTransaction {
        PostTransaction {
            branch: BranchId::new(1),
            stock_item: StockItemId::new(10),
            kind,
            quantity: Decimal::from(quantity),
            unit_cost: None,
            link: None,
            created_by: actor(),
            approved_by: None,
            note: None,
        }
    }

    fn ledger() -> Ledger {
        Ledger::new(Arc::new(FixedClock::new(chrono::Utc::now())))
    }

    #[test]
    fn out_with_positive_delta_drives_balance_negative() {
        let ledger = ledger();
        let catalog = FakeCatalog::single();

        ledger.apply(post(TransactionKind::In, 2), &catalog).unwrap();
        let (record, balance) = ledger.apply(post(TransactionKind::Out, 4), &catalog).unwrap();

        assert_eq!(record.quantity_change, Decimal::from(-4));
        assert_eq!(balance.quantity, Decimal::from(-2));
        assert!(ledger.reconcile().is_empty());
    }

    #[test]
    fn cache_and_ledger_row_appear_together() {
        let ledger = ledger();
        let catalog = FakeCatalog::single();

        let (record, balance) = ledger.apply(post(TransactionKind::In, 5), &catalog).unwrap();
        assert_eq!(record.quantity_change, Decimal::from(5));
        assert_eq!(balance.quantity, Decimal::from(5));

        let trail = ledger.transactions_for(BranchId::new(1), StockItemId::new(10));
        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].id, record.id);
    }

    #[test]
    fn unknown_branch_is_not_found_and_inactive_branch_is_rejected() {
        let mut catalog = FakeCatalog::single();
        let ledger = ledger();

        let mut bad = post(TransactionKind::In, 1);
        bad.branch = BranchId::new(9);
        assert!(matches!(
            ledger.apply(bad, &catalog).unwrap_err(),
            OpsError::NotFound(_)
        ));

        catalog.branches[0].active = false;
        assert!(matches!(
            ledger.apply(post(TransactionKind::In, 1), &catalog).unwrap_err(),
            OpsError::BadRequest(_)
        ));
        assert_eq!(ledger.transaction_count(), 0);
    }

    #[test]
    fn foreign_franchise_item_is_bad_request() {
        let ledger = ledger();
        let catalog = FakeCatalog::single();

        let mut bad = post(TransactionKind::In, 1);
        bad.stock_item = StockItemId::new(20);
        assert!(matches!(
            ledger.apply(bad, &catalog).unwrap_err(),
            OpsError::BadRequest(_)
        ));
    }

    #[test]
    fn initialize_item_rejects_duplicates_and_keeps_reconciliation() {
        let ledger = ledger();
        let catalog = FakeCatalog::single();
        let branch = BranchId::new(1);
        let item = StockItemId::new(10);

        let snapshot = ledger
            .initialize_item(branch, item, Decimal::from(12), Decimal::from(3), actor(), &catalog)
            .unwrap();
        assert_eq!(snapshot.quantity, Decimal::from(12));
        assert_eq!(snapshot.reorder_level, Decimal::from(3));

        assert!(matches!(
            ledger
                .initialize_item(branch, item, Decimal::ZERO, Decimal::ZERO, actor(), &catalog)
                .unwrap_err(),
            OpsError::BadRequest(_)
        ));
        assert!(matches!(
            ledger
                .initialize_item(
                    branch,
                    StockItemId::new(11),
                    Decimal::from(-1),
                    Decimal::ZERO,
                    actor(),
                    &catalog
                )
                .unwrap_err(),
            OpsError::BadRequest(_)
        ));

        assert!(ledger.reconcile().is_empty());
        let trail = ledger.transactions_for(branch, item);
        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].kind, TransactionKind::Adjustment);
    }

    #[test]
    fn below_reorder_flags_only_breached_rows() {
        let ledger = ledger();
        let catalog = FakeCatalog::single();
        let branch = BranchId::new(1);

        ledger
            .initialize_item(branch, StockItemId::new(10), Decimal::from(2), Decimal::from(5), actor(), &catalog)
            .unwrap();
        ledger
            .initialize_item(branch, StockItemId::new(11), Decimal::from(9), Decimal::from(5), actor(), &catalog)
            .unwrap();

        let flagged = ledger.below_reorder(branch);
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].stock_item, StockItemId::new(10));
    }

    #[test]
    fn batch_with_one_bad_post_applies_nothing() {
        let ledger = ledger();
        let catalog = FakeCatalog::single();

        let mut foreign = post(TransactionKind::In, 3);
        foreign.stock_item = StockItemId::new(20);
        let err = ledger
            .apply_all(vec![post(TransactionKind::In, 5), foreign], &catalog)
            .unwrap_err();

        assert!(matches!(err, OpsError::BadRequest(_)));
        assert_eq!(ledger.transaction_count(), 0);
        assert!(ledger.balance(BranchId::new(1), StockItemId::new(10)).is_none());
        assert!(ledger.reconcile().is_empty());
    }

    #[test]
    fn batch_posts_share_one_critical_section() {
        let ledger = ledger();
        let catalog = FakeCatalog::single();

        let mut second = post(TransactionKind::In, 3);
        second.stock_item = StockItemId::new(11);
        let posted = ledger
            .apply_all(vec![post(TransactionKind::In, 5), second], &catalog)
            .unwrap();

        assert_eq!(posted.len(), 2);
        assert_eq!(posted[0].1.quantity, Decimal::from(5));
        assert_eq!(posted[1].1.quantity, Decimal::from(3));
        // Ids are contiguous: nothing interleaved between the two posts.
        assert_eq!(
            posted[1].0.id.as_i64(),
            posted[0].0.id.as_i64() + 1
        );
        assert!(ledger.reconcile().is_empty());
    }

    #[test]
    fn overflowing_delta_is_rejected_not_panicked() {
        let ledger = ledger();
        let catalog = FakeCatalog::single();

        let mut max = post(TransactionKind::In, 1);
        max.quantity = Decimal::MAX;
        ledger.apply(max.clone(), &catalog).unwrap();

        assert!(matches!(
            ledger.apply(max, &catalog).unwrap_err(),
            OpsError::BadRequest(_)
        ));
        // The first post is intact and the lock is still healthy.
        assert_eq!(ledger.transaction_count(), 1);
        assert_eq!(
            ledger
                .balance(BranchId::new(1), StockItemId::new(10))
                .map(|s| s.quantity),
            Some(Decimal::MAX)
        );
        assert!(ledger.reconcile().is_empty());
    }

    #[test]
    fn reads_survive_a_poisoned_lock() {
        let ledger = ledger();
        let catalog = FakeCatalog::single();
        ledger.apply(post(TransactionKind::In, 5), &catalog).unwrap();

        std::thread::scope(|s| {
            let handle = s.spawn(|| {
                let _guard = ledger.inner.write().unwrap();
                panic!("poison the ledger lock");
            });
            assert!(handle.join().is_err());
        });

        assert_eq!(
            ledger
                .balance(BranchId::new(1), StockItemId::new(10))
                .map(|s| s.quantity),
            Some(Decimal::from(5))
        );
        assert_eq!(ledger.transaction_count(), 1);
        assert!(ledger.reconcile().is_empty());
    }

    #[test]
    fn repair_is_idempotent_and_zero_on_healthy_state() {
        let ledger = ledger();
        let catalog = FakeCatalog::single();

        ledger.apply(post(TransactionKind::In, 5), &catalog).unwrap();
        ledger.apply(post(TransactionKind::Out, 2), &catalog).unwrap();

        assert_eq!(ledger.repair().unwrap(), 0);
        assert_eq!(ledger.repair().unwrap(), 0);
        assert!(ledger.reconcile().is_empty());
    }

    proptest! {
        /// After any sequence of applies, every cached balance equals the
        /// sum of the normalized deltas in the ledger.
        #[test]
        fn cache_always_equals_ledger_sum(ops in proptest::collection::vec((0u8..3, -1000i64..1000, prop_oneof![Just(10i64), Just(11i64)]), 0..40)) {
            let ledger = ledger();
            let catalog = FakeCatalog::single();

            for (kind_tag, qty, item) in ops {
                let kind = match kind_tag {
                    0 => TransactionKind::In,
                    1 => TransactionKind::Out,
                    _ => TransactionKind::Adjustment,
                };
                let mut p = post(kind, qty);
                p.stock_item = StockItemId::new(item);
                ledger.apply(p, &catalog).unwrap();
            }

            prop_assert!(ledger.reconcile().is_empty());

            for item in [10i64, 11] {
                let expected: Decimal = ledger
                    .transactions_for(BranchId::new(1), StockItemId::new(item))
                    .iter()
                    .map(|t| t.quantity_change)
                    .sum();
                let cached = ledger
                    .balance(BranchId::new(1), StockItemId::new(item))
                    .map(|s| s.quantity)
                    .unwrap_or(Decimal::ZERO);
                prop_assert_eq!(cached, expected);
            }
        }
    }
}
