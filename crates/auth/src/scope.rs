//! Scope enforcement: pure decision functions, no writes.

use franops_core::{BranchId, OpsError, OpsResult};

use crate::directory::Directory;
use crate::resolver::AuthContext;
use crate::role::{Role, Scope};

/// Reject callers whose primary role is outside the allowed set.
pub fn require_role(ctx: &AuthContext, allowed: &[Role]) -> OpsResult<()> {
    if allowed.contains(&ctx.role) {
        Ok(())
    } else {
        Err(OpsError::forbidden(format!(
            "role {} may not perform this action",
            ctx.role
        )))
    }
}

/// Resolve the branch a call may act on, constrained by the caller's scope.
///
/// Branch-scoped callers are pinned to their own branch; for owner/manager
/// roles the branch row's denormalized pointer must also agree with the
/// assignment, so a stale assignment never grants access after ownership
/// changes. Franchise-scoped callers must name a branch inside their
/// franchise. Global callers must name a branch that exists.
pub fn resolve_branch(
    ctx: &AuthContext,
    explicit: Option<BranchId>,
    directory: &dyn Directory,
) -> OpsResult<BranchId> {
    match ctx.scope {
        Scope::Branch(own) => {
            if let Some(requested) = explicit {
                if requested != own {
                    return Err(OpsError::forbidden("unauthorized branch access"));
                }
            }
            let branch = directory
                .branch(own)
                .ok_or_else(|| OpsError::not_found(format!("branch {own}")))?;

            let caller = ctx.principal.user_id().ok_or_else(|| {
                OpsError::forbidden("branch scope requires an individual login")
            })?;
            let pointer_agrees = match ctx.role {
                Role::Manager => branch.manager == Some(caller),
                Role::BranchOwner => branch.owner == Some(caller),
                // Staff membership is the assignment itself; the branch row
                // carries no staff pointer to cross-check.
                Role::Staff | Role::Franchisor => true,
            };
            if !pointer_agrees {
                return Err(OpsError::forbidden(
                    "assignment does not match current branch records",
                ));
            }
            Ok(own)
        }
        Scope::Franchise(franchise) => {
            let requested =
                explicit.ok_or_else(|| OpsError::bad_request("branch_id is required"))?;
            match directory.branch(requested) {
                Some(branch) if branch.franchise == franchise => Ok(requested),
                _ => Err(OpsError::forbidden(
                    "branch not accessible for this franchise scope",
                )),
            }
        }
        Scope::Global => {
            let requested =
                explicit.ok_or_else(|| OpsError::bad_request("branch_id is required"))?;
            directory
                .branch(requested)
                .ok_or_else(|| OpsError::not_found(format!("branch {requested}")))?;
            Ok(requested)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use franops_core::{FranchiseId, FranchisorId, UserId};

    use crate::directory::{BranchRecord, FranchisorRecord, UserRecord};
    use crate::resolver::Principal;
    use crate::role::RoleAssignment;

    struct BranchesOnly(Vec<BranchRecord>);

    impl Directory for BranchesOnly {
        fn franchisor(&self, _id: FranchisorId) -> Option<FranchisorRecord> {
            None
        }
        fn user(&self, _id: UserId) -> Option<UserRecord> {
            None
        }
        fn assignments_for(&self, _user: UserId) -> Vec<RoleAssignment> {
            Vec::new()
        }
        fn branch(&self, id: BranchId) -> Option<BranchRecord> {
            self.0.iter().find(|b| b.id == id).copied()
        }
    }

    fn branch(id: i64, franchise: i64, owner: Option<i64>, manager: Option<i64>) -> BranchRecord {
        BranchRecord {
            id: BranchId::new(id),
            franchise: FranchiseId::new(franchise),
            owner: owner.map(UserId::new),
            manager: manager.map(UserId::new),
            active: true,
        }
    }

    fn user_ctx(user: i64, role: Role, scope: Scope) -> AuthContext {
        AuthContext {
            principal: Principal::User(UserRecord {
                id: UserId::new(user),
                name: "t".into(),
                email: "t@example.test".into(),
                active: true,
            }),
            role,
            scope,
        }
    }

    #[test]
    fn require_role_rejects_outsiders() {
        let ctx = user_ctx(1, Role::Staff, Scope::Branch(BranchId::new(7)));
        assert!(require_role(&ctx, &[Role::Manager, Role::BranchOwner]).is_err());
        assert!(require_role(&ctx, &[Role::Staff]).is_ok());
    }

    #[test]
    fn branch_scope_cannot_reach_a_sibling_branch() {
        let dir = BranchesOnly(vec![branch(7, 1, None, Some(1)), branch(8, 1, None, None)]);
        let ctx = user_ctx(1, Role::Manager, Scope::Branch(BranchId::new(7)));

        assert!(matches!(
            resolve_branch(&ctx, Some(BranchId::new(8)), &dir).unwrap_err(),
            OpsError::Forbidden(_)
        ));
        assert_eq!(
            resolve_branch(&ctx, Some(BranchId::new(7)), &dir).unwrap(),
            BranchId::new(7)
        );
        assert_eq!(resolve_branch(&ctx, None, &dir).unwrap(), BranchId::new(7));
    }

    #[test]
    fn stale_manager_assignment_is_forbidden() {
        // Branch 7's manager pointer moved to user 2; user 1 still holds an
        // assignment row pointing at the branch.
        let dir = BranchesOnly(vec![branch(7, 1, None, Some(2))]);
        let ctx = user_ctx(1, Role::Manager, Scope::Branch(BranchId::new(7)));

        assert!(matches!(
            resolve_branch(&ctx, None, &dir).unwrap_err(),
            OpsError::Forbidden(_)
        ));
    }

    #[test]
    fn stale_owner_assignment_is_forbidden() {
        let dir = BranchesOnly(vec![branch(7, 1, Some(5), None)]);
        let ctx = user_ctx(1, Role::BranchOwner, Scope::Branch(BranchId::new(7)));

        assert!(matches!(
            resolve_branch(&ctx, None, &dir).unwrap_err(),
            OpsError::Forbidden(_)
        ));
    }

    #[test]
    fn franchise_scope_resolves_only_its_own_branches() {
        let dir = BranchesOnly(vec![branch(10, 2, None, None), branch(11, 3, None, None)]);
        let ctx = user_ctx(1, Role::BranchOwner, Scope::Franchise(FranchiseId::new(2)));

        assert_eq!(
            resolve_branch(&ctx, Some(BranchId::new(10)), &dir).unwrap(),
            BranchId::new(10)
        );
        assert!(matches!(
            resolve_branch(&ctx, Some(BranchId::new(11)), &dir).unwrap_err(),
            OpsError::Forbidden(_)
        ));
        assert!(matches!(
            resolve_branch(&ctx, None, &dir).unwrap_err(),
            OpsError::BadRequest(_)
        ));
    }

    #[test]
    fn global_scope_requires_an_existing_branch() {
        let dir = BranchesOnly(vec![branch(10, 2, None, None)]);
        let ctx = AuthContext {
            principal: Principal::Franchisor(FranchisorRecord {
                id: FranchisorId::new(1),
                organization_name: "hq".into(),
                email: "hq@example.test".into(),
            }),
            role: Role::Franchisor,
            scope: Scope::Global,
        };

        assert_eq!(
            resolve_branch(&ctx, Some(BranchId::new(10)), &dir).unwrap(),
            BranchId::new(10)
        );
        assert!(matches!(
            resolve_branch(&ctx, Some(BranchId::new(99)), &dir).unwrap_err(),
            OpsError::NotFound(_)
        ));
        assert!(matches!(
            resolve_branch(&ctx, None, &dir).unwrap_err(),
            OpsError::BadRequest(_)
        ));
    }
}
