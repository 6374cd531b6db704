//! In-memory backend for tests and local development.
//!
//! One [`tokio::sync::Mutex`] guards both tables plus the collaborator
//! fixtures, so the journal's commit keeps the same atomicity the Postgres
//! backend gets from a transaction: a task observes either all of a
//! transition's writes or none of them.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;

use crate::domain::{
    pending_order, ActorId, ActorRole, IncidentId, IncidentStatus, NewRequest, NewTimelineEntry,
    Pagination, RequestFilter, RequestId, RequestPage, RequestStatus, ReviewerWorkload,
    StatusChanges, TimelineAction, TimelineEntry, TimelineId, TransitionPlan, VerificationRequest,
    WorkloadCounts,
};

use super::{
    IdentityDirectory, IncidentGateway, RequestStore, Result, TimelineLedger, TransitionJournal,
    VerificationError,
};

#[derive(Default)]
struct State {
    requests: HashMap<RequestId, VerificationRequest>,
    timeline: Vec<TimelineEntry>,
    incidents: HashMap<IncidentId, IncidentStatus>,
    roles: HashMap<ActorId, ActorRole>,
}

/// Backend implementing every storage and collaborator trait over process
/// memory.
#[derive(Default)]
pub struct InMemoryBackend {
    state: Mutex<State>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an incident row (fixture for the intake collaborator).
    pub async fn register_incident(&self, id: IncidentId, status: IncidentStatus) {
        self.state.lock().await.incidents.insert(id, status);
    }

    /// Seed an actor with a role (fixture for the identity collaborator).
    pub async fn register_actor(&self, actor: ActorId, role: ActorRole) {
        self.state.lock().await.roles.insert(actor, role);
    }

    /// Current status of a seeded incident, for assertions.
    pub async fn incident_status(&self, id: IncidentId) -> Option<IncidentStatus> {
        self.state.lock().await.incidents.get(&id).copied()
    }

    fn materialize(req: NewRequest) -> VerificationRequest {
        let now = Utc::now();
        VerificationRequest {
            request_id: RequestId::new(),
            incident_id: req.incident_id,
            request_type: req.request_type,
            priority_level: req.priority_level,
            status: RequestStatus::Pending,
            title: req.title,
            description: req.description,
            assigned_verifier: None,
            requested_by: req.requested_by,
            created_at: now,
            updated_at: now,
            verification_date: None,
            verification_notes: None,
            rejection_reason: None,
        }
    }

    fn apply_changes(
        req: &mut VerificationRequest,
        new_status: RequestStatus,
        changes: StatusChanges,
    ) {
        req.status = new_status;
        if let Some(verifier) = changes.assigned_verifier {
            req.assigned_verifier = Some(verifier);
        }
        if let Some(date) = changes.verification_date {
            // First write wins; a resubmission cycle keeps the original stamp.
            req.verification_date.get_or_insert(date);
        }
        if let Some(notes) = changes.verification_notes {
            req.verification_notes = Some(notes);
        }
        if let Some(reason) = changes.rejection_reason {
            req.rejection_reason = Some(reason);
        }
        if let Some(priority) = changes.priority_level {
            req.priority_level = priority;
        }
        req.updated_at = Utc::now();
    }

    fn push_entry(state: &mut State, entry: NewTimelineEntry) -> TimelineId {
        let id = TimelineId::new();
        state.timeline.push(TimelineEntry {
            timeline_id: id,
            request_id: entry.request_id,
            action_type: entry.action_type,
            action_by: entry.action_by,
            action_notes: entry.action_notes,
            timestamp: entry.timestamp,
        });
        id
    }

    fn tally(counts: &mut WorkloadCounts, status: RequestStatus) {
        counts.total += 1;
        match status {
            RequestStatus::Pending => counts.pending += 1,
            RequestStatus::InReview => counts.in_review += 1,
            RequestStatus::Approved => counts.approved += 1,
            RequestStatus::Rejected => counts.rejected += 1,
            RequestStatus::RequiresMoreInfo => {}
        }
    }
}

#[async_trait]
impl RequestStore for InMemoryBackend {
    async fn create(&self, req: NewRequest) -> Result<VerificationRequest> {
        let mut state = self.state.lock().await;
        let request = Self::materialize(req);
        state.requests.insert(request.request_id, request.clone());
        Ok(request)
    }

    async fn get(&self, id: RequestId) -> Result<VerificationRequest> {
        let state = self.state.lock().await;
        state
            .requests
            .get(&id)
            .cloned()
            .ok_or(VerificationError::RequestNotFound(id))
    }

    async fn update_status(
        &self,
        id: RequestId,
        expected: RequestStatus,
        new_status: RequestStatus,
        changes: StatusChanges,
    ) -> Result<VerificationRequest> {
        let mut state = self.state.lock().await;
        let req = state
            .requests
            .get_mut(&id)
            .ok_or(VerificationError::RequestNotFound(id))?;
        if req.status != expected {
            return Err(VerificationError::Conflict(id));
        }
        Self::apply_changes(req, new_status, changes);
        Ok(req.clone())
    }

    async fn list(&self, filter: &RequestFilter, page: Pagination) -> Result<RequestPage> {
        let state = self.state.lock().await;
        let mut matched: Vec<VerificationRequest> = state
            .requests
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        matched.sort_by(pending_order);

        let total = matched.len() as u64;
        let requests = matched
            .into_iter()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .collect();

        Ok(RequestPage {
            requests,
            total,
            limit: page.limit,
            offset: page.offset,
        })
    }

    async fn count_by_verifier(&self, verifier: ActorId) -> Result<WorkloadCounts> {
        let state = self.state.lock().await;
        let mut counts = WorkloadCounts::default();
        for req in state.requests.values() {
            if req.assigned_verifier == Some(verifier) {
                Self::tally(&mut counts, req.status);
            }
        }
        Ok(counts)
    }

    async fn reviewer_workloads(&self, window: Duration) -> Result<Vec<ReviewerWorkload>> {
        let state = self.state.lock().await;
        let cutoff = Utc::now() - window;

        let mut by_verifier: HashMap<ActorId, (WorkloadCounts, Vec<f64>)> = HashMap::new();
        for req in state.requests.values() {
            let Some(verifier) = req.assigned_verifier else {
                continue;
            };
            let (counts, turnarounds) = by_verifier.entry(verifier).or_default();
            Self::tally(counts, req.status);
            if req.status.is_terminal() {
                if let Some(verified) = req.verification_date {
                    if verified >= cutoff {
                        let secs = (verified - req.created_at).num_milliseconds() as f64 / 1000.0;
                        turnarounds.push(secs);
                    }
                }
            }
        }

        let mut workloads: Vec<ReviewerWorkload> = by_verifier
            .into_iter()
            .map(|(verifier_id, (counts, turnarounds))| ReviewerWorkload {
                verifier_id,
                counts,
                avg_turnaround_secs: if turnarounds.is_empty() {
                    None
                } else {
                    Some(turnarounds.iter().sum::<f64>() / turnarounds.len() as f64)
                },
            })
            .collect();
        workloads.sort_by_key(|w| w.verifier_id.0);
        Ok(workloads)
    }
}

#[async_trait]
impl TimelineLedger for InMemoryBackend {
    async fn append(&self, entry: NewTimelineEntry) -> Result<TimelineId> {
        let mut state = self.state.lock().await;
        Ok(Self::push_entry(&mut state, entry))
    }

    async fn list_for(&self, request_id: RequestId) -> Result<Vec<TimelineEntry>> {
        let state = self.state.lock().await;
        let mut entries: Vec<TimelineEntry> = state
            .timeline
            .iter()
            .filter(|e| e.request_id == request_id)
            .cloned()
            .collect();
        // Stable sort: insertion order breaks timestamp ties.
        entries.sort_by_key(|e| e.timestamp);
        Ok(entries)
    }
}

#[async_trait]
impl TransitionJournal for InMemoryBackend {
    async fn open(&self, req: NewRequest) -> Result<VerificationRequest> {
        let mut state = self.state.lock().await;
        let request = Self::materialize(req);
        state.requests.insert(request.request_id, request.clone());
        Self::push_entry(
            &mut state,
            NewTimelineEntry::new(
                request.request_id,
                TimelineAction::Created,
                request.requested_by,
                None,
                request.created_at,
            ),
        );
        Ok(request)
    }

    async fn commit(
        &self,
        id: RequestId,
        expected: RequestStatus,
        plan: TransitionPlan,
    ) -> Result<VerificationRequest> {
        let mut state = self.state.lock().await;

        let current = state
            .requests
            .get(&id)
            .ok_or(VerificationError::RequestNotFound(id))?;
        if current.status != expected {
            return Err(VerificationError::Conflict(id));
        }

        // Check every precondition before the first write so a failure
        // leaves nothing half-applied.
        let incident_id = current.incident_id;
        if plan.incident_update.is_some() && !state.incidents.contains_key(&incident_id) {
            return Err(VerificationError::IncidentNotFound(incident_id));
        }

        let mut updated = current.clone();
        Self::apply_changes(&mut updated, plan.new_status, plan.changes);
        state.requests.insert(id, updated.clone());
        Self::push_entry(&mut state, plan.entry);
        if let Some(status) = plan.incident_update {
            state.incidents.insert(incident_id, status);
        }

        Ok(updated)
    }
}

#[async_trait]
impl IncidentGateway for InMemoryBackend {
    async fn incident_exists(&self, id: IncidentId) -> Result<bool> {
        Ok(self.state.lock().await.incidents.contains_key(&id))
    }
}

#[async_trait]
impl IdentityDirectory for InMemoryBackend {
    async fn role_of(&self, actor: ActorId) -> Result<Option<ActorRole>> {
        Ok(self.state.lock().await.roles.get(&actor).copied())
    }

    async fn actors_holding(&self, role: ActorRole) -> Result<Vec<ActorId>> {
        let state = self.state.lock().await;
        let mut actors: Vec<ActorId> = state
            .roles
            .iter()
            .filter(|(_, r)| **r == role)
            .map(|(a, _)| *a)
            .collect();
        actors.sort_by_key(|a| a.0);
        Ok(actors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{plan, PriorityLevel, RequestAction, RequestType};

    fn new_request(incident: IncidentId) -> NewRequest {
        NewRequest {
            incident_id: incident,
            request_type: RequestType::NewReport,
            priority_level: PriorityLevel::High,
            title: "sinkhole forming".to_string(),
            description: "pavement subsiding near storm drain".to_string(),
            requested_by: ActorId::new(),
        }
    }

    #[tokio::test]
    async fn open_writes_request_and_created_entry_together() {
        let backend = InMemoryBackend::new();
        let req = backend.open(new_request(IncidentId::new())).await.unwrap();

        assert_eq!(req.status, RequestStatus::Pending);
        let entries = backend.list_for(req.request_id).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action_type, TimelineAction::Created);
        assert_eq!(entries[0].action_by, req.requested_by);
    }

    #[tokio::test]
    async fn commit_enforces_compare_and_set() {
        let backend = InMemoryBackend::new();
        let req = backend.open(new_request(IncidentId::new())).await.unwrap();
        let verifier = ActorId::new();

        let assign = plan(
            &req,
            RequestAction::Assign { verifier },
            verifier,
            Utc::now(),
        )
        .unwrap();
        backend
            .commit(req.request_id, RequestStatus::Pending, assign)
            .await
            .unwrap();

        // Same expected status again: the row has moved on.
        let stale = plan(
            &req,
            RequestAction::Assign { verifier },
            verifier,
            Utc::now(),
        )
        .unwrap();
        let err = backend
            .commit(req.request_id, RequestStatus::Pending, stale)
            .await
            .unwrap_err();
        assert!(matches!(err, VerificationError::Conflict(_)));
    }

    #[tokio::test]
    async fn failed_commit_leaves_no_partial_writes() {
        let backend = InMemoryBackend::new();
        // Incident deliberately not registered.
        let req = backend.open(new_request(IncidentId::new())).await.unwrap();
        let verifier = ActorId::new();

        let assign = plan(
            &req,
            RequestAction::Assign { verifier },
            verifier,
            Utc::now(),
        )
        .unwrap();
        let req = backend
            .commit(req.request_id, RequestStatus::Pending, assign)
            .await
            .unwrap();

        let approve = plan(
            &req,
            RequestAction::Approve {
                notes: "ok".to_string(),
            },
            verifier,
            Utc::now(),
        )
        .unwrap();
        let err = backend
            .commit(req.request_id, RequestStatus::InReview, approve)
            .await
            .unwrap_err();
        assert!(matches!(err, VerificationError::IncidentNotFound(_)));

        // Status untouched, no approved entry appended.
        let current = backend.get(req.request_id).await.unwrap();
        assert_eq!(current.status, RequestStatus::InReview);
        let entries = backend.list_for(req.request_id).await.unwrap();
        assert!(entries
            .iter()
            .all(|e| e.action_type != TimelineAction::Approved));
    }

    #[tokio::test]
    async fn list_orders_by_priority_then_age() {
        let backend = InMemoryBackend::new();
        let mut low = new_request(IncidentId::new());
        low.priority_level = PriorityLevel::Low;
        let mut critical = new_request(IncidentId::new());
        critical.priority_level = PriorityLevel::Critical;

        let low = backend.open(low).await.unwrap();
        let critical = backend.open(critical).await.unwrap();

        let page = backend
            .list(&RequestFilter::default(), Pagination::default())
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.requests[0].request_id, critical.request_id);
        assert_eq!(page.requests[1].request_id, low.request_id);
    }
}
