//! `franops-auth` — authentication/authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: the token
//! codec is pure (plus an injected clock), and the resolver/authorizer read
//! master data through the [`Directory`] trait implemented elsewhere.

pub mod directory;
pub mod password;
pub mod resolver;
pub mod role;
pub mod scope;
pub mod token;

pub use directory::{BranchRecord, Directory, FranchisorRecord, UserRecord};
pub use password::{hash_password, verify_password};
pub use resolver::{resolve_principal, AuthContext, Principal};
pub use role::{primary_assignment, Role, RoleAssignment, Scope};
pub use scope::{require_role, resolve_branch};
pub use token::{PrincipalKind, SigningConfig, TokenClaims, TokenCodec};
