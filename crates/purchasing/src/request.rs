//! Purchase request rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use franops_core::{ActorId, BranchId, Quantity, RequestId, RequestItemId, StockItemId, UserId};

/// Lifecycle of a purchase request. Approved and Rejected are terminal.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }
}

/// One requested line: what, how much, and the requester's cost estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestItem {
    pub id: RequestItemId,
    pub stock_item: StockItemId,
    pub requested_quantity: Quantity,
    pub estimated_unit_cost: Option<Quantity>,
}

/// A purchase request and its decision trail.
///
/// `decided_by` records whoever approved or rejected; the two timestamps are
/// mutually exclusive because the states are.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseRequest {
    pub id: RequestId,
    pub branch: BranchId,
    pub requested_by: UserId,
    pub decided_by: Option<ActorId>,
    pub status: RequestStatus,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub items: Vec<RequestItem>,
}
