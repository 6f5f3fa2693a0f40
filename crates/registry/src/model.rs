//! Master-data entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use franops_core::{BranchId, FranchiseId, FranchisorId, StockItemId, UserId};

/// Organization that owns one or more franchise networks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Franchisor {
    pub id: FranchisorId,
    pub organization_name: String,
    pub email: String,
    pub phone: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Individual login. Everyone below the franchisor is a user; what they may
/// do comes from role grants, not from the record itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// A brand operated by a franchisor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Franchise {
    pub id: FranchiseId,
    pub franchisor: FranchisorId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BranchStatus {
    Active,
    Inactive,
}

impl BranchStatus {
    pub fn is_active(self) -> bool {
        matches!(self, BranchStatus::Active)
    }
}

/// Physical location of a franchise. Owner and manager pointers are
/// denormalized onto the row and double-checked during authorization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub id: BranchId,
    pub franchise: FranchiseId,
    pub name: String,
    pub address: Option<String>,
    pub owner: Option<UserId>,
    pub manager: Option<UserId>,
    pub status: BranchStatus,
    pub created_at: DateTime<Utc>,
}

/// Catalog definition of something branches keep on hand. Balances live in
/// the inventory ledger, never here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockItem {
    pub id: StockItemId,
    pub franchise: FranchiseId,
    pub name: String,
    pub unit: String,
    pub created_at: DateTime<Utc>,
}
