//! Read-only catalog view the ledger validates against.
//!
//! Implemented by the registry; the ledger only needs franchise membership
//! and the branch lifecycle flag, never whole entities.

use franops_core::{BranchId, FranchiseId, StockItemId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BranchInfo {
    pub id: BranchId,
    pub franchise: FranchiseId,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockItemInfo {
    pub id: StockItemId,
    pub franchise: FranchiseId,
}

pub trait Catalog: Send + Sync {
    fn branch(&self, id: BranchId) -> Option<BranchInfo>;
    fn stock_item(&self, id: StockItemId) -> Option<StockItemInfo>;
}
