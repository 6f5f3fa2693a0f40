//! Roles and authorization scopes.
//!
//! Roles are a closed set checked by exhaustive matching; there are no
//! stringly-typed role comparisons anywhere in the workspace. The wire names
//! (`BRANCH_OWNER`, ...) match the reference data the backend ships with.

use serde::{Deserialize, Serialize};

use franops_core::{BranchId, FranchiseId, OpsError, OpsResult, UserId};

/// Role capabilities granted by an assignment.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Organization owner; authority is implicit and global.
    Franchisor,
    /// Owns and funds a branch.
    BranchOwner,
    /// Runs daily branch operations.
    Manager,
    /// Frontline branch staff.
    Staff,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Franchisor => "FRANCHISOR",
            Role::BranchOwner => "BRANCH_OWNER",
            Role::Manager => "MANAGER",
            Role::Staff => "STAFF",
        }
    }

    pub fn parse(raw: &str) -> OpsResult<Self> {
        match raw {
            "FRANCHISOR" => Ok(Role::Franchisor),
            "BRANCH_OWNER" => Ok(Role::BranchOwner),
            "MANAGER" => Ok(Role::Manager),
            "STAFF" => Ok(Role::Staff),
            other => Err(OpsError::unprocessable(format!("unknown role '{other}'"))),
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Breadth of a role assignment.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scope_type", content = "scope_id", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Scope {
    Global,
    Franchise(FranchiseId),
    Branch(BranchId),
}

impl Scope {
    /// Narrowest-first priority used for primary-role selection.
    fn priority(&self) -> u8 {
        match self {
            Scope::Branch(_) => 0,
            Scope::Franchise(_) => 1,
            Scope::Global => 2,
        }
    }

    fn raw_id(&self) -> i64 {
        match self {
            Scope::Global => i64::MAX,
            Scope::Franchise(id) => id.as_i64(),
            Scope::Branch(id) => id.as_i64(),
        }
    }
}

/// A user's membership row: role granted at a scope.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub user: UserId,
    pub role: Role,
    pub scope: Scope,
}

/// Select the primary assignment for authorization purposes.
///
/// Priority is Branch > Franchise > Global; ties break toward the lowest
/// scope id so the result is deterministic.
pub fn primary_assignment(mut assignments: Vec<RoleAssignment>) -> Option<RoleAssignment> {
    assignments.sort_by_key(|a| (a.scope.priority(), a.scope.raw_id()));
    assignments.into_iter().next()
}
