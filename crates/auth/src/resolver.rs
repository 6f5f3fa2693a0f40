//! Principal resolution: verified token payload → authorization context.

use franops_core::{ActorId, FranchisorId, OpsError, OpsResult, UserId};

use crate::directory::{Directory, FranchisorRecord, UserRecord};
use crate::role::{primary_assignment, Role, Scope};
use crate::token::{PrincipalKind, TokenClaims};

/// An authenticated actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    Franchisor(FranchisorRecord),
    User(UserRecord),
}

impl Principal {
    pub fn actor_id(&self) -> ActorId {
        match self {
            Principal::Franchisor(f) => ActorId::Franchisor(f.id),
            Principal::User(u) => ActorId::User(u.id),
        }
    }

    /// Caller's user id, when the principal is an individual login.
    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Principal::User(u) => Some(u.id),
            Principal::Franchisor(_) => None,
        }
    }
}

/// Immutable authorization context for one call.
///
/// Threaded through function arguments; never stored in any shared or
/// request-global slot, and read-only once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub principal: Principal,
    pub role: Role,
    pub scope: Scope,
}

impl AuthContext {
    pub fn actor_id(&self) -> ActorId {
        self.principal.actor_id()
    }
}

/// Turn a verified payload into a live principal plus its primary scope.
///
/// Organization owners get an implicit global assignment (no stored row);
/// users must be active and must hold at least one assignment — zero
/// assignments is a hard authorization failure, never a default-permit.
pub fn resolve_principal(claims: &TokenClaims, directory: &dyn Directory) -> OpsResult<AuthContext> {
    match claims.typ {
        PrincipalKind::Franchisor => {
            let record = directory
                .franchisor(FranchisorId::new(claims.sub))
                .ok_or(OpsError::Unauthenticated)?;
            Ok(AuthContext {
                principal: Principal::Franchisor(record),
                role: Role::Franchisor,
                scope: Scope::Global,
            })
        }
        PrincipalKind::User => {
            let user_id = UserId::new(claims.sub);
            let record = directory.user(user_id).ok_or(OpsError::Unauthenticated)?;
            if !record.active {
                return Err(OpsError::forbidden("account is inactive"));
            }

            let assignment = primary_assignment(directory.assignments_for(user_id))
                .ok_or_else(|| OpsError::forbidden("no role assigned"))?;

            Ok(AuthContext {
                principal: Principal::User(record),
                role: assignment.role,
                scope: assignment.scope,
            })
        }
    }
}
