//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type OpsResult<T> = Result<T, OpsError>;

/// Closed error taxonomy for the operations core.
///
/// The first five variants are client outcomes and surface verbatim to the
/// caller with no retry. `Internal` marks missing reference data or broken
/// infrastructure (a deployment defect, not a user error) and must be logged
/// with full context at the raise site.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OpsError {
    /// Missing, malformed, tampered or expired credential.
    ///
    /// Deliberately carries no detail: the caller must not learn which
    /// verification step failed.
    #[error("authentication required")]
    Unauthenticated,

    /// Role or scope mismatch for an authenticated principal.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// A referenced entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed numeric or enumerated input, or a reference that cannot be
    /// used in this context (e.g. stock item outside the branch's franchise).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Invalid state transition (e.g. deciding a non-pending request twice).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Well-formed but semantically invalid input.
    #[error("unprocessable: {0}")]
    Unprocessable(String),

    /// Missing reference data or broken invariant on the server side.
    #[error("internal error: {0}")]
    Internal(String),
}

impl OpsError {
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn unprocessable(msg: impl Into<String>) -> Self {
        Self::Unprocessable(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether the error is a client outcome (surfaced verbatim, no retry).
    pub fn is_client(&self) -> bool {
        !matches!(self, Self::Internal(_))
    }
}
