//! `franops-inventory` — the branch stock ledger.
//!
//! Stock quantities change through exactly one path: [`Ledger::apply`].
//! Every change appends an immutable transaction row and updates the derived
//! balance cache in the same critical section, so the cache always equals
//! the running sum of the ledger.

pub mod catalog;
pub mod kind;
pub mod ledger;

pub use catalog::{BranchInfo, Catalog, StockItemInfo};
pub use kind::{normalize, TransactionKind};
pub use ledger::{
    BalanceSnapshot, Ledger, PostTransaction, ReconcileDiff, TransactionLink, TransactionRecord,
};
