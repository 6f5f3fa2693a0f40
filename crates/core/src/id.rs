//! Strongly-typed identifiers used across the domain.
//!
//! All tables are arena-style, keyed by a monotonically allocated `i64`.
//! Cross-entity relations are held as id back-references and resolved with
//! explicit lookups, never as in-memory object graphs.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::OpsError;

macro_rules! impl_i64_id {
    ($t:ident, $name:literal) => {
        /// Identifier newtype over an arena row id.
        #[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $t(i64);

        impl $t {
            pub fn new(raw: i64) -> Self {
                Self(raw)
            }

            pub fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<i64> for $t {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$t> for i64 {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = OpsError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let raw = s
                    .parse::<i64>()
                    .map_err(|e| OpsError::bad_request(format!("{}: {}", $name, e)))?;
                Ok(Self(raw))
            }
        }
    };
}

impl_i64_id!(FranchisorId, "FranchisorId");
impl_i64_id!(FranchiseId, "FranchiseId");
impl_i64_id!(BranchId, "BranchId");
impl_i64_id!(UserId, "UserId");
impl_i64_id!(StockItemId, "StockItemId");
impl_i64_id!(TransactionId, "TransactionId");
impl_i64_id!(RequestId, "RequestId");
impl_i64_id!(RequestItemId, "RequestItemId");
impl_i64_id!(SaleLineId, "SaleLineId");

/// Identity of the acting principal on a write, for ledger attribution.
///
/// Organization owners and individual users live in separate tables, so an
/// attribution field has to carry which table the id points into.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorId {
    Franchisor(FranchisorId),
    User(UserId),
}

impl core::fmt::Display for ActorId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ActorId::Franchisor(id) => write!(f, "franchisor:{id}"),
            ActorId::User(id) => write!(f, "user:{id}"),
        }
    }
}
