//! The verification request record and its query types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ActorId, IncidentId, PriorityLevel, RequestId, RequestStatus, RequestType};

/// A verification request adjudicating one reported incident.
///
/// Rows are never physically deleted; terminal requests are retained for
/// audit. All status mutation flows through the transition planner and the
/// journal, so the invariants below hold for every stored row:
///
/// - `assigned_verifier` is set whenever status is `in_review`, `approved`
///   or `rejected`
/// - `verification_date` is stamped exactly once, when the request first
///   leaves review into a terminal or resubmission state, and never cleared
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationRequest {
    pub request_id: RequestId,
    pub incident_id: IncidentId,
    pub request_type: RequestType,
    pub priority_level: PriorityLevel,
    pub status: RequestStatus,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_verifier: Option<ActorId>,
    pub requested_by: ActorId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

/// Input for opening a request. Field validation happens in the service
/// before this ever reaches storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRequest {
    pub incident_id: IncidentId,
    pub request_type: RequestType,
    pub priority_level: PriorityLevel,
    pub title: String,
    pub description: String,
    pub requested_by: ActorId,
}

/// Field updates carried by a single transition.
///
/// `None` means "leave as is". `verification_date` is applied with
/// first-write-wins semantics (`COALESCE` in SQL) so the stamp survives a
/// resubmission cycle.
#[derive(Debug, Clone, Default)]
pub struct StatusChanges {
    pub assigned_verifier: Option<ActorId>,
    pub verification_date: Option<DateTime<Utc>>,
    pub verification_notes: Option<String>,
    pub rejection_reason: Option<String>,
    pub priority_level: Option<PriorityLevel>,
}

/// Structured filter for request listings. Every field is optional and maps
/// to a parameterized predicate; there is no free-form filter string.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<RequestStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<PriorityLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_type: Option<RequestType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<ActorId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incident: Option<IncidentId>,
}

impl RequestFilter {
    pub fn by_status(status: RequestStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Whether a request matches this filter (used by the in-memory store;
    /// the Postgres store expresses the same predicates in SQL).
    pub fn matches(&self, req: &VerificationRequest) -> bool {
        self.status.map_or(true, |s| req.status == s)
            && self.priority.map_or(true, |p| req.priority_level == p)
            && self.request_type.map_or(true, |t| req.request_type == t)
            && self
                .assigned_to
                .map_or(true, |v| req.assigned_verifier == Some(v))
            && self.incident.map_or(true, |i| req.incident_id == i)
    }
}

/// Offset pagination. `limit` is clamped to [`Pagination::MAX_LIMIT`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Pagination {
    pub limit: u32,
    pub offset: u64,
}

impl Pagination {
    pub const DEFAULT_LIMIT: u32 = 50;
    pub const MAX_LIMIT: u32 = 500;

    pub fn new(limit: u32, offset: u64) -> Self {
        Self {
            limit: limit.min(Self::MAX_LIMIT),
            offset,
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: Self::DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

/// One page of a listing plus the unpaginated total.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestPage {
    pub requests: Vec<VerificationRequest>,
    pub total: u64,
    pub limit: u32,
    pub offset: u64,
}

/// Ordering for pending work queues: highest priority first, oldest first
/// within a priority. A pure query concern, never stored.
pub fn pending_order(a: &VerificationRequest, b: &VerificationRequest) -> std::cmp::Ordering {
    b.priority_level
        .cmp(&a.priority_level)
        .then(a.created_at.cmp(&b.created_at))
}
