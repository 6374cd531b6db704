//! RoadWatch Verification Core
//!
//! Lifecycle engine for road-damage verification requests: the request
//! state machine, its append-only audit timeline, and reviewer workload
//! balancing. The portal's HTTP layer consumes this crate as a library;
//! presentation, uploads, notifications and session handling live elsewhere.
//!
//! ## Modules
//!
//! - [`domain`] - Ids, closed enums, request/timeline records, the pure
//!   transition planner and derived workload views
//! - [`infra`] - Error taxonomy, storage contracts, PostgreSQL and
//!   in-memory backends
//! - [`service`] - The verification service façade and the workload
//!   assigner
//! - [`migrations`] - Embedded SQLx migrations for the owned tables
//! - [`telemetry`] - Tracing setup for host processes

pub mod domain;
pub mod infra;
pub mod migrations;
pub mod service;
pub mod telemetry;

// Re-export commonly used types
pub use domain::{
    ActorId, ActorRole, IncidentId, IncidentStatus, NewRequest, Pagination, PriorityLevel,
    RequestFilter, RequestId, RequestStatus, RequestType, TimelineAction, TimelineEntry,
    VerificationRequest,
};

pub use infra::{
    InMemoryBackend, PgConfig, PgVerificationStore, RequestStore, Result, TimelineLedger,
    TransitionJournal, VerificationError,
};

pub use service::{VerificationService, WorkloadAssigner};
