//! The verification service façade.
//!
//! All external callers (the portal's API layer today, any future UI) go
//! through [`VerificationService`]; no other code path mutates a request.
//! Every operation takes the acting `ActorId` explicitly; the core never
//! reads ambient session state.

mod assigner;

pub use assigner::{WorkloadAssigner, TURNAROUND_WINDOW_DAYS};

use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::instrument;

use crate::domain::{
    efficiency_score, plan, ActorId, ActorRole, NewRequest, Pagination, PriorityLevel,
    RequestAction, RequestFilter, RequestId, RequestPage, RequestStatus, ReviewerReport,
    TimelineEntry, VerificationRequest,
};
use crate::infra::{
    IdentityDirectory, IncidentGateway, PgVerificationStore, RequestStore, Result, TimelineLedger,
    TransitionJournal, VerificationError,
};

/// Façade over the request store, timeline ledger, state machine and
/// workload assigner.
pub struct VerificationService {
    store: Arc<dyn RequestStore>,
    ledger: Arc<dyn TimelineLedger>,
    journal: Arc<dyn TransitionJournal>,
    incidents: Arc<dyn IncidentGateway>,
    directory: Arc<dyn IdentityDirectory>,
    assigner: WorkloadAssigner,
}

impl VerificationService {
    pub fn new(
        store: Arc<dyn RequestStore>,
        ledger: Arc<dyn TimelineLedger>,
        journal: Arc<dyn TransitionJournal>,
        incidents: Arc<dyn IncidentGateway>,
        directory: Arc<dyn IdentityDirectory>,
    ) -> Self {
        let assigner = WorkloadAssigner::new(store.clone(), directory.clone());
        Self {
            store,
            ledger,
            journal,
            incidents,
            directory,
            assigner,
        }
    }

    /// Wire the façade over the PostgreSQL backend; the identity directory
    /// stays pluggable because account data lives with the host.
    pub fn with_postgres(
        store: Arc<PgVerificationStore>,
        directory: Arc<dyn IdentityDirectory>,
    ) -> Self {
        Self::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store,
            directory,
        )
    }

    /// Open a verification request for an incident. Validates every field
    /// before touching storage; the new request starts in `pending` with its
    /// `created` timeline entry written in the same transaction.
    #[instrument(skip(self, req), fields(incident_id = %req.incident_id, requested_by = %req.requested_by))]
    pub async fn create_request(&self, req: NewRequest) -> Result<VerificationRequest> {
        require_text("title", &req.title)?;
        require_text("description", &req.description)?;
        require_actor("requested_by", req.requested_by)?;

        if !self.incidents.incident_exists(req.incident_id).await? {
            return Err(VerificationError::IncidentNotFound(req.incident_id));
        }

        self.journal.open(req).await
    }

    /// Assign a reviewer and move the request into review. With no explicit
    /// verifier the workload assigner picks one; an explicit verifier must
    /// hold a reviewer role.
    #[instrument(skip(self), fields(request_id = %request_id, assigned_by = %assigned_by))]
    pub async fn assign_verifier(
        &self,
        request_id: RequestId,
        verifier: Option<ActorId>,
        assigned_by: ActorId,
    ) -> Result<VerificationRequest> {
        let request = self.store.get(request_id).await?;

        let verifier = match verifier {
            Some(v) => {
                let eligible = self
                    .directory
                    .role_of(v)
                    .await?
                    .map_or(false, |role| role.can_verify());
                if !eligible {
                    return Err(VerificationError::Validation {
                        field: "verifier_id",
                        message: format!("actor {v} does not hold a reviewer role"),
                    });
                }
                v
            }
            None => self.assigner.pick(ActorRole::Verifier).await?,
        };

        let plan = plan(
            &request,
            RequestAction::Assign { verifier },
            assigned_by,
            Utc::now(),
        )?;
        self.journal.commit(request_id, request.status, plan).await
    }

    /// Approve an in-review request. Stamps the verification date, records
    /// the notes, and moves the linked incident to `approved` in the same
    /// transaction.
    #[instrument(skip(self, notes), fields(request_id = %request_id, approved_by = %approved_by))]
    pub async fn approve(
        &self,
        request_id: RequestId,
        approved_by: ActorId,
        notes: String,
    ) -> Result<VerificationRequest> {
        require_text("notes", &notes)?;
        self.require_reviewer(approved_by, "approve").await?;

        let request = self.store.get(request_id).await?;
        let plan = plan(
            &request,
            RequestAction::Approve { notes },
            approved_by,
            Utc::now(),
        )?;
        self.journal.commit(request_id, request.status, plan).await
    }

    /// Reject an in-review request, recording the reason and moving the
    /// linked incident to `rejected` in the same transaction.
    #[instrument(skip(self, reason), fields(request_id = %request_id, rejected_by = %rejected_by))]
    pub async fn reject(
        &self,
        request_id: RequestId,
        rejected_by: ActorId,
        reason: String,
    ) -> Result<VerificationRequest> {
        require_text("reason", &reason)?;
        self.require_reviewer(rejected_by, "reject").await?;

        let request = self.store.get(request_id).await?;
        let plan = plan(
            &request,
            RequestAction::Reject { reason },
            rejected_by,
            Utc::now(),
        )?;
        self.journal.commit(request_id, request.status, plan).await
    }

    /// Send an in-review request back to the reporter for more information.
    /// A later `assign_verifier` re-enters the review cycle.
    #[instrument(skip(self, notes), fields(request_id = %request_id, requested_by = %requested_by))]
    pub async fn request_more_info(
        &self,
        request_id: RequestId,
        requested_by: ActorId,
        notes: String,
    ) -> Result<VerificationRequest> {
        require_text("notes", &notes)?;
        self.require_reviewer(requested_by, "request_more_info")
            .await?;

        let request = self.store.get(request_id).await?;
        let plan = plan(
            &request,
            RequestAction::RequestMoreInfo { notes },
            requested_by,
            Utc::now(),
        )?;
        self.journal.commit(request_id, request.status, plan).await
    }

    /// Change a non-terminal request's priority. The status is untouched
    /// and the change is always audited.
    #[instrument(skip(self), fields(request_id = %request_id, priority = %priority, updated_by = %updated_by))]
    pub async fn reprioritize(
        &self,
        request_id: RequestId,
        priority: PriorityLevel,
        updated_by: ActorId,
    ) -> Result<VerificationRequest> {
        let request = self.store.get(request_id).await?;
        let plan = plan(
            &request,
            RequestAction::Reprioritize { priority },
            updated_by,
            Utc::now(),
        )?;
        self.journal.commit(request_id, request.status, plan).await
    }

    /// Fetch one request.
    pub async fn get_request(&self, request_id: RequestId) -> Result<VerificationRequest> {
        self.store.get(request_id).await
    }

    /// Full audit history of a request, oldest first.
    pub async fn timeline(&self, request_id: RequestId) -> Result<Vec<TimelineEntry>> {
        // Surface NotFound for unknown requests rather than an empty list.
        self.store.get(request_id).await?;
        self.ledger.list_for(request_id).await
    }

    /// Filtered, paginated listing.
    pub async fn list(&self, filter: &RequestFilter, page: Pagination) -> Result<RequestPage> {
        self.store.list(filter, page).await
    }

    /// The pending work queue: highest priority first, oldest first within
    /// a priority.
    pub async fn list_pending(&self, page: Pagination) -> Result<RequestPage> {
        self.store
            .list(&RequestFilter::by_status(RequestStatus::Pending), page)
            .await
    }

    /// Per-reviewer workload report with the derived efficiency score.
    pub async fn get_workload(&self) -> Result<Vec<ReviewerReport>> {
        let workloads = self
            .store
            .reviewer_workloads(Duration::days(TURNAROUND_WINDOW_DAYS))
            .await?;

        Ok(workloads
            .into_iter()
            .map(|w| {
                let avg_turnaround_hours = w.avg_turnaround_secs.unwrap_or(0.0) / 3600.0;
                ReviewerReport {
                    verifier_id: w.verifier_id,
                    counts: w.counts,
                    avg_turnaround_hours,
                    efficiency_score: efficiency_score(&w.counts, avg_turnaround_hours),
                }
            })
            .collect())
    }

    /// Verification actions require a reviewer role; the identity
    /// collaborator owns the actor-to-role mapping.
    async fn require_reviewer(&self, actor: ActorId, action: &'static str) -> Result<()> {
        let allowed = self
            .directory
            .role_of(actor)
            .await?
            .map_or(false, |role| role.can_verify());
        if allowed {
            Ok(())
        } else {
            tracing::warn!(actor = %actor, action, "actor lacks reviewer role");
            Err(VerificationError::Forbidden { actor, action })
        }
    }
}

fn require_text(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(VerificationError::Validation {
            field,
            message: "must not be empty".to_string(),
        });
    }
    Ok(())
}

fn require_actor(field: &'static str, actor: ActorId) -> Result<()> {
    if actor.0.is_nil() {
        return Err(VerificationError::Validation {
            field,
            message: "must reference an actor".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{IncidentId, RequestType};
    use crate::infra::{
        MockIdentityDirectory, MockIncidentGateway, MockRequestStore, MockTimelineLedger,
        MockTransitionJournal,
    };
    use uuid::Uuid;

    struct Mocks {
        store: MockRequestStore,
        ledger: MockTimelineLedger,
        journal: MockTransitionJournal,
        incidents: MockIncidentGateway,
        directory: MockIdentityDirectory,
    }

    impl Mocks {
        fn new() -> Self {
            Self {
                store: MockRequestStore::new(),
                ledger: MockTimelineLedger::new(),
                journal: MockTransitionJournal::new(),
                incidents: MockIncidentGateway::new(),
                directory: MockIdentityDirectory::new(),
            }
        }

        fn service(self) -> VerificationService {
            VerificationService::new(
                Arc::new(self.store),
                Arc::new(self.ledger),
                Arc::new(self.journal),
                Arc::new(self.incidents),
                Arc::new(self.directory),
            )
        }
    }

    fn new_request() -> NewRequest {
        NewRequest {
            incident_id: IncidentId::new(),
            request_type: RequestType::NewReport,
            priority_level: PriorityLevel::Medium,
            title: "guardrail damage".to_string(),
            description: "bent guardrail after collision".to_string(),
            requested_by: ActorId::new(),
        }
    }

    fn in_review_request(verifier: ActorId) -> VerificationRequest {
        let now = Utc::now();
        VerificationRequest {
            request_id: RequestId::new(),
            incident_id: IncidentId::new(),
            request_type: RequestType::NewReport,
            priority_level: PriorityLevel::Medium,
            status: RequestStatus::InReview,
            title: "guardrail damage".to_string(),
            description: "bent guardrail after collision".to_string(),
            assigned_verifier: Some(verifier),
            requested_by: ActorId::new(),
            created_at: now,
            updated_at: now,
            verification_date: None,
            verification_notes: None,
            rejection_reason: None,
        }
    }

    #[tokio::test]
    async fn create_rejects_blank_title_before_storage() {
        // No expectations registered: any storage call would panic.
        let service = Mocks::new().service();

        let mut req = new_request();
        req.title = "   ".to_string();
        let err = service.create_request(req).await.unwrap_err();
        assert!(matches!(
            err,
            VerificationError::Validation { field: "title", .. }
        ));
    }

    #[tokio::test]
    async fn create_rejects_nil_requester() {
        let service = Mocks::new().service();

        let mut req = new_request();
        req.requested_by = ActorId::from_uuid(Uuid::nil());
        let err = service.create_request(req).await.unwrap_err();
        assert!(matches!(
            err,
            VerificationError::Validation {
                field: "requested_by",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn create_requires_resolvable_incident() {
        let mut mocks = Mocks::new();
        mocks
            .incidents
            .expect_incident_exists()
            .returning(|_| Ok(false));
        let service = mocks.service();

        let err = service.create_request(new_request()).await.unwrap_err();
        assert!(matches!(err, VerificationError::IncidentNotFound(_)));
    }

    #[tokio::test]
    async fn citizens_cannot_approve() {
        let mut mocks = Mocks::new();
        mocks
            .directory
            .expect_role_of()
            .returning(|_| Ok(Some(ActorRole::Citizen)));
        let service = mocks.service();

        let err = service
            .approve(RequestId::new(), ActorId::new(), "looks fine".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, VerificationError::Forbidden { .. }));
    }

    #[tokio::test]
    async fn unknown_actors_cannot_reject() {
        let mut mocks = Mocks::new();
        mocks.directory.expect_role_of().returning(|_| Ok(None));
        let service = mocks.service();

        let err = service
            .reject(RequestId::new(), ActorId::new(), "not a pothole".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, VerificationError::Forbidden { .. }));
    }

    #[tokio::test]
    async fn blank_rejection_reason_is_invalid() {
        let service = Mocks::new().service();
        let err = service
            .reject(RequestId::new(), ActorId::new(), String::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            VerificationError::Validation { field: "reason", .. }
        ));
    }

    #[tokio::test]
    async fn explicit_verifier_must_hold_reviewer_role() {
        let verifier = ActorId::new();
        let mut mocks = Mocks::new();
        mocks
            .store
            .expect_get()
            .returning(move |id| {
                let mut req = in_review_request(ActorId::new());
                req.request_id = id;
                req.status = RequestStatus::Pending;
                req.assigned_verifier = None;
                Ok(req)
            });
        mocks
            .directory
            .expect_role_of()
            .returning(|_| Ok(Some(ActorRole::Citizen)));
        let service = mocks.service();

        let err = service
            .assign_verifier(RequestId::new(), Some(verifier), ActorId::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            VerificationError::Validation {
                field: "verifier_id",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn approve_commits_with_observed_status() {
        let verifier = ActorId::new();
        let request = in_review_request(verifier);
        let request_id = request.request_id;

        let mut mocks = Mocks::new();
        mocks
            .directory
            .expect_role_of()
            .returning(|_| Ok(Some(ActorRole::Verifier)));
        let fetched = request.clone();
        mocks
            .store
            .expect_get()
            .returning(move |_| Ok(fetched.clone()));
        mocks
            .journal
            .expect_commit()
            .withf(move |id, expected, plan| {
                *id == request_id
                    && *expected == RequestStatus::InReview
                    && plan.new_status == RequestStatus::Approved
            })
            .returning(move |_, _, plan| {
                let mut done = request.clone();
                done.status = plan.new_status;
                Ok(done)
            });
        let service = mocks.service();

        let done = service
            .approve(request_id, verifier, "confirmed in field".to_string())
            .await
            .unwrap();
        assert_eq!(done.status, RequestStatus::Approved);
    }

    #[tokio::test]
    async fn workload_report_scores_reviewers() {
        use crate::domain::{ReviewerWorkload, WorkloadCounts};

        let verifier = ActorId::new();
        let mut mocks = Mocks::new();
        mocks.store.expect_reviewer_workloads().returning(move |_| {
            Ok(vec![ReviewerWorkload {
                verifier_id: verifier,
                counts: WorkloadCounts {
                    total: 4,
                    approved: 4,
                    ..WorkloadCounts::default()
                },
                avg_turnaround_secs: None,
            }])
        });
        let service = mocks.service();

        let report = service.get_workload().await.unwrap();
        assert_eq!(report.len(), 1);
        // All approved, no turnaround history: perfect score.
        assert_eq!(report[0].efficiency_score, 100.0);
    }
}
