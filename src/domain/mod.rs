//! Domain types for the verification workflow core.
//!
//! Everything in this module is pure data and pure logic: identifiers,
//! closed enums, the request and timeline records, the transition planner
//! (state machine) and derived workload views. IO lives in [`crate::infra`].

mod request;
mod timeline;
mod transitions;
mod types;
mod workload;

pub use request::{
    pending_order, NewRequest, Pagination, RequestFilter, RequestPage, StatusChanges,
    VerificationRequest,
};
pub use timeline::{replay_status, NewTimelineEntry, TimelineAction, TimelineEntry};
pub use transitions::{plan, RequestAction, TransitionPlan};
pub use types::{
    ActorId, ActorRole, IncidentId, IncidentStatus, PriorityLevel, RequestId, RequestStatus,
    RequestType, TimelineId,
};
pub use workload::{efficiency_score, ReviewerReport, ReviewerWorkload, WorkloadCounts};
