//! Read-only master-data view the auth layer depends on.
//!
//! Defined here and implemented by the registry so that this crate stays
//! storage-agnostic; tests use small in-crate fakes.

use franops_core::{BranchId, FranchiseId, FranchisorId, UserId};

use crate::role::RoleAssignment;

/// Organization owner record, as authorization sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FranchisorRecord {
    pub id: FranchisorId,
    pub organization_name: String,
    pub email: String,
}

/// Individual login record, as authorization sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub active: bool,
}

/// Branch row with its denormalized owner/manager pointers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BranchRecord {
    pub id: BranchId,
    pub franchise: FranchiseId,
    pub owner: Option<UserId>,
    pub manager: Option<UserId>,
    pub active: bool,
}

/// Principal and scope lookups backing the resolver and authorizer.
pub trait Directory: Send + Sync {
    fn franchisor(&self, id: FranchisorId) -> Option<FranchisorRecord>;
    fn user(&self, id: UserId) -> Option<UserRecord>;
    fn assignments_for(&self, user: UserId) -> Vec<RoleAssignment>;
    fn branch(&self, id: BranchId) -> Option<BranchRecord>;
}
