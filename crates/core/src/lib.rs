//! `franops-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod clock;
pub mod error;
pub mod id;
pub mod quantity;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{OpsError, OpsResult};
pub use id::{
    ActorId, BranchId, FranchiseId, FranchisorId, RequestId, RequestItemId, SaleLineId,
    StockItemId, TransactionId, UserId,
};
pub use quantity::{parse_quantity, Quantity};
