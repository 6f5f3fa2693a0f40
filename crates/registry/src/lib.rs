//! Master data for the franchise network.
//!
//! Owns franchisors, users, franchises, branches, stock item definitions and
//! role grants, and serves the read-only views the auth and inventory layers
//! consume ([`franops_auth::Directory`], [`franops_inventory::Catalog`]).

pub mod model;
pub mod store;

pub use model::{Branch, BranchStatus, Franchise, Franchisor, StockItem, User};
pub use store::Registry;
