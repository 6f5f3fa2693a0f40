//! In-memory master-data store and provisioning operations.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use franops_core::{
    BranchId, Clock, FranchiseId, FranchisorId, OpsError, OpsResult, StockItemId, SystemClock,
    UserId,
};

use franops_auth::{
    hash_password, verify_password, BranchRecord, Directory, FranchisorRecord, PrincipalKind,
    Role, RoleAssignment, Scope, UserRecord,
};
use franops_inventory::{BranchInfo, Catalog, StockItemInfo};

use crate::model::{Branch, BranchStatus, Franchise, Franchisor, StockItem, User};

#[derive(Default)]
struct Tables {
    franchisors: HashMap<FranchisorId, Franchisor>,
    users: HashMap<UserId, User>,
    franchises: HashMap<FranchiseId, Franchise>,
    branches: HashMap<BranchId, Branch>,
    stock_items: HashMap<StockItemId, StockItem>,
    assignments: Vec<RoleAssignment>,
    next_id: i64,
}

impl Tables {
    fn next(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn email_taken(&self, email: &str) -> bool {
        self.franchisors.values().any(|f| f.email == email)
            || self.users.values().any(|u| u.email == email)
    }
}

/// Master-data store. All provisioning goes through here; the auth and
/// inventory layers see it only through their read-only traits.
pub struct Registry {
    inner: RwLock<Tables>,
    clock: Arc<dyn Clock>,
}

impl Registry {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: RwLock::new(Tables::default()),
            clock,
        }
    }

    pub fn with_system_clock() -> Self {
        Self::new(Arc::new(SystemClock))
    }

    /// Create a franchisor account. Email is the login key, so it must be
    /// unique across franchisors and users alike.
    pub fn register_franchisor(
        &self,
        organization_name: &str,
        email: &str,
        phone: Option<&str>,
        password: &str,
    ) -> OpsResult<Franchisor> {
        validate_email(email)?;
        validate_nonempty(organization_name, "organization name")?;
        let now = self.clock.now();
        let mut tables = self.write()?;
        if tables.email_taken(email) {
            return Err(OpsError::conflict("email is already registered"));
        }
        let franchisor = Franchisor {
            id: FranchisorId::new(tables.next()),
            organization_name: organization_name.to_string(),
            email: email.to_string(),
            phone: phone.map(str::to_string),
            password_hash: hash_password(password),
            created_at: now,
        };
        tables.franchisors.insert(franchisor.id, franchisor.clone());
        tracing::info!(franchisor = %franchisor.id, "franchisor registered");
        Ok(franchisor)
    }

    pub fn register_user(
        &self,
        name: &str,
        email: &str,
        phone: Option<&str>,
        password: &str,
    ) -> OpsResult<User> {
        validate_email(email)?;
        validate_nonempty(name, "name")?;
        let now = self.clock.now();
        let mut tables = self.write()?;
        if tables.email_taken(email) {
            return Err(OpsError::conflict("email is already registered"));
        }
        let user = User {
            id: UserId::new(tables.next()),
            name: name.to_string(),
            email: email.to_string(),
            phone: phone.map(str::to_string),
            password_hash: hash_password(password),
            active: true,
            created_at: now,
        };
        tables.users.insert(user.id, user.clone());
        tracing::info!(user = %user.id, "user registered");
        Ok(user)
    }

    pub fn set_user_active(&self, id: UserId, active: bool) -> OpsResult<()> {
        let mut tables = self.write()?;
        let user = tables
            .users
            .get_mut(&id)
            .ok_or_else(|| OpsError::not_found(format!("user {id}")))?;
        user.active = active;
        Ok(())
    }

    pub fn create_franchise(&self, franchisor: FranchisorId, name: &str) -> OpsResult<Franchise> {
        validate_nonempty(name, "franchise name")?;
        let now = self.clock.now();
        let mut tables = self.write()?;
        if !tables.franchisors.contains_key(&franchisor) {
            return Err(OpsError::not_found(format!("franchisor {franchisor}")));
        }
        let franchise = Franchise {
            id: FranchiseId::new(tables.next()),
            franchisor,
            name: name.to_string(),
            created_at: now,
        };
        tables.franchises.insert(franchise.id, franchise.clone());
        Ok(franchise)
    }

    pub fn create_branch(
        &self,
        franchise: FranchiseId,
        name: &str,
        address: Option<&str>,
    ) -> OpsResult<Branch> {
        validate_nonempty(name, "branch name")?;
        let now = self.clock.now();
        let mut tables = self.write()?;
        if !tables.franchises.contains_key(&franchise) {
            return Err(OpsError::not_found(format!("franchise {franchise}")));
        }
        let branch = Branch {
            id: BranchId::new(tables.next()),
            franchise,
            name: name.to_string(),
            address: address.map(str::to_string),
            owner: None,
            manager: None,
            status: BranchStatus::Active,
            created_at: now,
        };
        tables.branches.insert(branch.id, branch.clone());
        tracing::info!(branch = %branch.id, franchise = %franchise, "branch created");
        Ok(branch)
    }

    pub fn set_branch_status(&self, id: BranchId, status: BranchStatus) -> OpsResult<()> {
        let mut tables = self.write()?;
        let branch = tables
            .branches
            .get_mut(&id)
            .ok_or_else(|| OpsError::not_found(format!("branch {id}")))?;
        branch.status = status;
        Ok(())
    }

    /// Appoint a branch owner: sets the denormalized pointer on the branch
    /// row and records the matching branch-scoped role grant in one step.
    pub fn appoint_owner(&self, branch: BranchId, user: UserId) -> OpsResult<()> {
        self.appoint(branch, user, Role::BranchOwner)
    }

    /// Appoint a branch manager, same shape as [`Registry::appoint_owner`].
    pub fn appoint_manager(&self, branch: BranchId, user: UserId) -> OpsResult<()> {
        self.appoint(branch, user, Role::Manager)
    }

    fn appoint(&self, branch: BranchId, user: UserId, role: Role) -> OpsResult<()> {
        let mut tables = self.write()?;
        if !tables.users.contains_key(&user) {
            return Err(OpsError::not_found(format!("user {user}")));
        }
        let row = tables
            .branches
            .get_mut(&branch)
            .ok_or_else(|| OpsError::not_found(format!("branch {branch}")))?;
        match role {
            Role::BranchOwner => row.owner = Some(user),
            Role::Manager => row.manager = Some(user),
            _ => return Err(OpsError::bad_request("only owner or manager can be appointed")),
        }
        tables.assignments.retain(|a| !(a.user == user && a.role == role));
        tables.assignments.push(RoleAssignment {
            user,
            role,
            scope: Scope::Branch(branch),
        });
        Ok(())
    }

    /// Grant a role to a user at an explicit scope. Franchisor access is
    /// implicit in the franchisor account and cannot be granted here.
    pub fn assign_role(&self, user: UserId, role: Role, scope: Scope) -> OpsResult<()> {
        if role == Role::Franchisor {
            return Err(OpsError::bad_request(
                "franchisor access comes with the franchisor account",
            ));
        }
        let mut tables = self.write()?;
        if !tables.users.contains_key(&user) {
            return Err(OpsError::not_found(format!("user {user}")));
        }
        match scope {
            Scope::Branch(id) if !tables.branches.contains_key(&id) => {
                return Err(OpsError::not_found(format!("branch {id}")));
            }
            Scope::Franchise(id) if !tables.franchises.contains_key(&id) => {
                return Err(OpsError::not_found(format!("franchise {id}")));
            }
            _ => {}
        }
        tables.assignments.push(RoleAssignment { user, role, scope });
        Ok(())
    }

    pub fn create_stock_item(
        &self,
        franchise: FranchiseId,
        name: &str,
        unit: &str,
    ) -> OpsResult<StockItem> {
        validate_nonempty(name, "item name")?;
        validate_nonempty(unit, "unit of measure")?;
        let now = self.clock.now();
        let mut tables = self.write()?;
        if !tables.franchises.contains_key(&franchise) {
            return Err(OpsError::not_found(format!("franchise {franchise}")));
        }
        let item = StockItem {
            id: StockItemId::new(tables.next()),
            franchise,
            name: name.to_string(),
            unit: unit.to_string(),
            created_at: now,
        };
        tables.stock_items.insert(item.id, item.clone());
        Ok(item)
    }

    /// Check credentials and say what kind of principal they belong to.
    ///
    /// Franchisor accounts are tried first, then users. Unknown email and
    /// wrong password both come back as `Unauthenticated` with no hint of
    /// which one it was; a known-but-deactivated user is the one case a
    /// caller may distinguish.
    pub fn login(&self, email: &str, password: &str) -> OpsResult<(i64, PrincipalKind)> {
        let tables = self.read();
        if let Some(f) = tables.franchisors.values().find(|f| f.email == email) {
            if verify_password(password, &f.password_hash) {
                return Ok((f.id.as_i64(), PrincipalKind::Franchisor));
            }
            return Err(OpsError::Unauthenticated);
        }
        if let Some(u) = tables.users.values().find(|u| u.email == email) {
            if !verify_password(password, &u.password_hash) {
                return Err(OpsError::Unauthenticated);
            }
            if !u.active {
                return Err(OpsError::forbidden("account is inactive"));
            }
            return Ok((u.id.as_i64(), PrincipalKind::User));
        }
        Err(OpsError::Unauthenticated)
    }

    pub fn franchise(&self, id: FranchiseId) -> Option<Franchise> {
        self.read().franchises.get(&id).cloned()
    }

    pub fn branch_row(&self, id: BranchId) -> Option<Branch> {
        self.read().branches.get(&id).cloned()
    }

    pub fn stock_items_for(&self, franchise: FranchiseId) -> Vec<StockItem> {
        let tables = self.read();
        let mut items: Vec<StockItem> = tables
            .stock_items
            .values()
            .filter(|i| i.franchise == franchise)
            .cloned()
            .collect();
        items.sort_by_key(|i| i.id);
        items
    }

    // Reads recover a poisoned guard: provisioning writes insert complete
    // rows, so the tables stay consistent even after a panic, and a stuck
    // directory must not turn every login into an auth failure.
    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> OpsResult<RwLockWriteGuard<'_, Tables>> {
        self.inner
            .write()
            .map_err(|_| OpsError::internal("registry lock poisoned"))
    }
}

impl Directory for Registry {
    fn franchisor(&self, id: FranchisorId) -> Option<FranchisorRecord> {
        let tables = self.read();
        tables.franchisors.get(&id).map(|f| FranchisorRecord {
            id: f.id,
            organization_name: f.organization_name.clone(),
            email: f.email.clone(),
        })
    }

    fn user(&self, id: UserId) -> Option<UserRecord> {
        let tables = self.read();
        tables.users.get(&id).map(|u| UserRecord {
            id: u.id,
            name: u.name.clone(),
            email: u.email.clone(),
            active: u.active,
        })
    }

    fn assignments_for(&self, user: UserId) -> Vec<RoleAssignment> {
        let tables = self.read();
        tables
            .assignments
            .iter()
            .filter(|a| a.user == user)
            .cloned()
            .collect()
    }

    fn branch(&self, id: BranchId) -> Option<BranchRecord> {
        let tables = self.read();
        tables.branches.get(&id).map(|b| BranchRecord {
            id: b.id,
            franchise: b.franchise,
            owner: b.owner,
            manager: b.manager,
            active: b.status.is_active(),
        })
    }
}

impl Catalog for Registry {
    fn branch(&self, id: BranchId) -> Option<BranchInfo> {
        let tables = self.read();
        tables.branches.get(&id).map(|b| BranchInfo {
            id: b.id,
            franchise: b.franchise,
            active: b.status.is_active(),
        })
    }

    fn stock_item(&self, id: StockItemId) -> Option<StockItemInfo> {
        let tables = self.read();
        tables.stock_items.get(&id).map(|i| StockItemInfo {
            id: i.id,
            franchise: i.franchise,
        })
    }
}

fn validate_email(email: &str) -> OpsResult<()> {
    if email.trim().is_empty() || !email.contains('@') {
        return Err(OpsError::bad_request("a valid email is required"));
    }
    Ok(())
}

fn validate_nonempty(value: &str, field: &str) -> OpsResult<()> {
    if value.trim().is_empty() {
        return Err(OpsError::bad_request(format!("{field} is required")));
    }
    Ok(())
}
