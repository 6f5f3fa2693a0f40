//! Purchase requests: Pending → Approved | Rejected, and nothing else.
//!
//! Approval is the only path from here into the inventory ledger; a request
//! that is approved posts one stock-in per line item, linked back to the
//! request, in a single all-or-nothing step.

pub mod book;
pub mod request;

pub use book::{ensure_request_access, NewRequestItem, RequestBook};
pub use request::{PurchaseRequest, RequestItem, RequestStatus};
