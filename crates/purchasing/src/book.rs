//! Request arena and the approve/reject state machine.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockWriteGuard};

use rust_decimal::Decimal;

use franops_core::{
    ActorId, BranchId, Clock, OpsError, OpsResult, Quantity, RequestId, RequestItemId,
    StockItemId, SystemClock, UserId,
};

use franops_auth::Scope;
use franops_inventory::{Catalog, Ledger, PostTransaction, TransactionKind, TransactionLink};

use crate::request::{PurchaseRequest, RequestItem, RequestStatus};

/// Line input for [`RequestBook::create`].
#[derive(Debug, Clone)]
pub struct NewRequestItem {
    pub stock_item: StockItemId,
    pub quantity: Quantity,
    pub estimated_unit_cost: Option<Quantity>,
}

#[derive(Default)]
struct Requests {
    rows: HashMap<RequestId, PurchaseRequest>,
    next_id: i64,
    next_item_id: i64,
}

/// All purchase requests, keyed by id.
pub struct RequestBook {
    inner: RwLock<Requests>,
    clock: Arc<dyn Clock>,
}

impl RequestBook {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: RwLock::new(Requests::default()),
            clock,
        }
    }

    pub fn with_system_clock() -> Self {
        Self::new(Arc::new(SystemClock))
    }

    /// File a new request in Pending. No ledger effect until approval.
    pub fn create(
        &self,
        branch: BranchId,
        requested_by: UserId,
        items: Vec<NewRequestItem>,
        note: Option<String>,
        catalog: &dyn Catalog,
    ) -> OpsResult<PurchaseRequest> {
        if items.is_empty() {
            return Err(OpsError::bad_request("a request needs at least one item"));
        }
        let branch_info = catalog
            .branch(branch)
            .ok_or_else(|| OpsError::not_found(format!("branch {branch}")))?;
        for item in &items {
            if item.quantity <= Decimal::ZERO {
                return Err(OpsError::bad_request(
                    "requested quantity must be greater than zero",
                ));
            }
            let info = catalog.stock_item(item.stock_item).ok_or_else(|| {
                OpsError::bad_request(format!("stock item {} not found", item.stock_item))
            })?;
            if info.franchise != branch_info.franchise {
                return Err(OpsError::bad_request(
                    "stock item does not belong to this branch's franchise",
                ));
            }
        }

        let now = self.clock.now();
        let mut requests = self.write()?;
        requests.next_id += 1;
        let id = RequestId::new(requests.next_id);
        let items = items
            .into_iter()
            .map(|i| {
                requests.next_item_id += 1;
                RequestItem {
                    id: RequestItemId::new(requests.next_item_id),
                    stock_item: i.stock_item,
                    requested_quantity: i.quantity,
                    estimated_unit_cost: i.estimated_unit_cost,
                }
            })
            .collect();
        let request = PurchaseRequest {
            id,
            branch,
            requested_by,
            decided_by: None,
            status: RequestStatus::Pending,
            note,
            created_at: now,
            approved_at: None,
            rejected_at: None,
            items,
        };
        requests.rows.insert(id, request.clone());
        tracing::info!(request = %id, branch = %branch, "purchase request created");
        Ok(request)
    }

    /// Approve a pending request and post its items into the ledger.
    ///
    /// Everything that could stop a post is checked before the first one,
    /// so an approval either lands every line or touches nothing. The book
    /// guard is held across the whole decision; two approvers racing on the
    /// same request serialize, and the loser gets `Conflict`.
    pub fn approve(
        &self,
        id: RequestId,
        approver: ActorId,
        ledger: &Ledger,
        catalog: &dyn Catalog,
    ) -> OpsResult<PurchaseRequest> {
        let now = self.clock.now();
        let mut requests = self.write()?;
        let request = requests
            .rows
            .get(&id)
            .ok_or_else(|| OpsError::not_found(format!("purchase request {id}")))?;

        if request.status.is_terminal() {
            return Err(OpsError::conflict("request has already been decided"));
        }
        if request.items.is_empty() {
            return Err(OpsError::conflict("request has no items to receive"));
        }

        let branch_info = catalog
            .branch(request.branch)
            .ok_or_else(|| OpsError::not_found(format!("branch {}", request.branch)))?;
        if !branch_info.active {
            return Err(OpsError::bad_request("branch is not active"));
        }
        for item in &request.items {
            let info = catalog.stock_item(item.stock_item).ok_or_else(|| {
                OpsError::bad_request(format!("stock item {} not found", item.stock_item))
            })?;
            if info.franchise != branch_info.franchise {
                return Err(OpsError::bad_request(
                    "stock item does not belong to this branch's franchise",
                ));
            }
        }

        // One ledger batch for the whole request: the ledger stages every
        // post before writing, so a failure on any line (a catalog change
        // racing the approval included) leaves the ledger untouched and the
        // request Pending, with nothing to double-post on retry.
        let posts: Vec<PostTransaction> = request
            .items
            .iter()
            .map(|item| PostTransaction {
                branch: request.branch,
                stock_item: item.stock_item,
                kind: TransactionKind::In,
                quantity: item.requested_quantity,
                unit_cost: item.estimated_unit_cost,
                link: Some(TransactionLink::PurchaseRequest(id)),
                created_by: approver,
                approved_by: Some(approver),
                note: Some(format!("Auto-approved from request {id}")),
            })
            .collect();
        ledger.apply_all(posts, catalog)?;

        let request = requests
            .rows
            .get_mut(&id)
            .ok_or_else(|| OpsError::internal("request vanished under the write guard"))?;
        request.status = RequestStatus::Approved;
        request.decided_by = Some(approver);
        request.approved_at = Some(now);
        tracing::info!(request = %id, approver = %approver, "purchase request approved");
        Ok(request.clone())
    }

    /// Reject a pending request. No ledger effect.
    pub fn reject(
        &self,
        id: RequestId,
        decider: ActorId,
        note: Option<String>,
    ) -> OpsResult<PurchaseRequest> {
        let now = self.clock.now();
        let mut requests = self.write()?;
        let request = requests
            .rows
            .get_mut(&id)
            .ok_or_else(|| OpsError::not_found(format!("purchase request {id}")))?;

        if request.status.is_terminal() {
            return Err(OpsError::conflict("request has already been decided"));
        }

        request.status = RequestStatus::Rejected;
        request.decided_by = Some(decider);
        request.rejected_at = Some(now);
        if note.is_some() {
            request.note = note;
        }
        tracing::info!(request = %id, decider = %decider, "purchase request rejected");
        Ok(request.clone())
    }

    pub fn get(&self, id: RequestId) -> Option<PurchaseRequest> {
        self.read().rows.get(&id).cloned()
    }

    /// Requests for one branch, newest first.
    pub fn for_branch(&self, branch: BranchId) -> Vec<PurchaseRequest> {
        let requests = self.read();
        let mut rows: Vec<PurchaseRequest> = requests
            .rows
            .values()
            .filter(|r| r.branch == branch)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        rows
    }

    fn write(&self) -> OpsResult<RwLockWriteGuard<'_, Requests>> {
        self.inner
            .write()
            .map_err(|_| OpsError::internal("request book lock poisoned"))
    }

    // Reads recover a poisoned guard; request rows are only ever replaced
    // whole, never left half-written.
    fn read(&self) -> std::sync::RwLockReadGuard<'_, Requests> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }
}

/// Can a caller with this scope see/decide this request?
///
/// Branch scope must be the request's own branch; franchise scope must own
/// that branch; global sees everything. A branch that is missing from the
/// catalog is treated the same as one outside the caller's scope.
pub fn ensure_request_access(
    scope: &Scope,
    request: &PurchaseRequest,
    catalog: &dyn Catalog,
) -> OpsResult<()> {
    match scope {
        Scope::Global => Ok(()),
        Scope::Branch(branch) if *branch == request.branch => Ok(()),
        Scope::Branch(_) => Err(OpsError::forbidden(
            "request belongs to a different branch",
        )),
        Scope::Franchise(franchise) => match catalog.branch(request.branch) {
            Some(info) if info.franchise == *franchise => Ok(()),
            _ => Err(OpsError::forbidden(
                "request belongs to a different franchise",
            )),
        },
    }
}
