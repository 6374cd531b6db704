//! Trait contracts for storage and external collaborators.

use async_trait::async_trait;
use chrono::Duration;
#[cfg(test)]
use mockall::automock;

use crate::domain::{
    ActorId, ActorRole, IncidentId, NewRequest, NewTimelineEntry, Pagination, RequestFilter,
    RequestId, RequestPage, RequestStatus, ReviewerWorkload, StatusChanges, TimelineEntry,
    TimelineId, TransitionPlan, VerificationRequest, WorkloadCounts,
};

use super::Result;

/// Durable record of verification requests.
///
/// `update_status` is a compare-and-set: the caller passes the status it
/// observed, and the call fails with `Conflict` if a concurrent transition
/// changed it since. This is the only concurrency guard the system needs,
/// because transitions are the sole mutation path.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RequestStore: Send + Sync {
    /// Insert a new request row in `pending`. Provenance-complete creation
    /// (row plus its `created` timeline entry) goes through
    /// [`TransitionJournal::open`]; this is the single-table building block.
    async fn create(&self, req: NewRequest) -> Result<VerificationRequest>;

    /// Fetch one request.
    async fn get(&self, id: RequestId) -> Result<VerificationRequest>;

    /// Compare-and-set status update applying the transition's field
    /// changes. Fails with `Conflict` when the stored status no longer
    /// equals `expected`.
    async fn update_status(
        &self,
        id: RequestId,
        expected: RequestStatus,
        new_status: RequestStatus,
        changes: StatusChanges,
    ) -> Result<VerificationRequest>;

    /// Filtered, paginated listing in pending-work order (priority
    /// descending, then created_at ascending).
    async fn list(&self, filter: &RequestFilter, page: Pagination) -> Result<RequestPage>;

    /// Per-status counts for one verifier.
    async fn count_by_verifier(&self, verifier: ActorId) -> Result<WorkloadCounts>;

    /// Workload snapshot for every verifier with at least one assignment;
    /// turnaround averaged over terminal requests verified within `window`.
    async fn reviewer_workloads(&self, window: Duration) -> Result<Vec<ReviewerWorkload>>;
}

/// Append-only audit ledger of request transitions.
///
/// Entries are immutable once written; no update or delete exists.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TimelineLedger: Send + Sync {
    /// Append one entry. Fails only on storage IO error.
    async fn append(&self, entry: NewTimelineEntry) -> Result<TimelineId>;

    /// All entries for a request, oldest first.
    async fn list_for(&self, request_id: RequestId) -> Result<Vec<TimelineEntry>>;
}

/// The atomic unit of the workflow: every mutation commits its request
/// write and its timeline entry together, or not at all.
///
/// The façade performs all mutations through this trait; [`RequestStore`]
/// and [`TimelineLedger`] supply the reads and the single-table building
/// blocks the implementations compose.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TransitionJournal: Send + Sync {
    /// Insert the request and its `created` timeline entry in one
    /// transaction. The entry is derived from the request itself so the two
    /// can never disagree.
    async fn open(&self, req: NewRequest) -> Result<VerificationRequest>;

    /// Apply a planned transition: compare-and-set on `expected`, append the
    /// plan's timeline entry, and (for approve/reject) move the linked
    /// incident, all in one transaction. Either every write is visible or
    /// none is.
    async fn commit(
        &self,
        id: RequestId,
        expected: RequestStatus,
        plan: TransitionPlan,
    ) -> Result<VerificationRequest>;
}

/// Read-only view of the incident collaborator, used to validate that a new
/// request references a real incident. Incident data is owned entirely by
/// the intake module; status write-back happens inside the journal
/// transaction.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait IncidentGateway: Send + Sync {
    async fn incident_exists(&self, id: IncidentId) -> Result<bool>;
}

/// Identity/authorization collaborator: actor-to-role resolution and the
/// candidate pool for assignment.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    /// The actor's role, or `None` for unknown actors.
    async fn role_of(&self, actor: ActorId) -> Result<Option<ActorRole>>;

    /// All actors holding `role`, eligible to receive assignments.
    async fn actors_holding(&self, role: ActorRole) -> Result<Vec<ActorId>>;
}
