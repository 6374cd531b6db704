//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use roadwatch_verification::domain::{
    ActorId, ActorRole, IncidentId, IncidentStatus, NewRequest, PriorityLevel, RequestType,
};
use roadwatch_verification::infra::InMemoryBackend;
use roadwatch_verification::service::VerificationService;
use uuid::Uuid;

/// Citizen who files the reports.
pub fn reporter_id() -> ActorId {
    ActorId::from_uuid(Uuid::parse_str("11111111-1111-1111-1111-111111111111").unwrap())
}

/// Supervisor used for assignments and escalations.
pub fn supervisor_id() -> ActorId {
    ActorId::from_uuid(Uuid::parse_str("22222222-2222-2222-2222-222222222222").unwrap())
}

/// Stable verifier ids; the index keeps the assigner's final tiebreak
/// predictable.
pub fn verifier_id(n: u8) -> ActorId {
    ActorId::from_uuid(Uuid::from_u128(0xA0000 + n as u128))
}

/// Service plus the backend it runs on, so tests can seed fixtures and
/// inspect incident state directly.
pub struct Harness {
    pub backend: Arc<InMemoryBackend>,
    pub service: VerificationService,
}

/// Build a service over a fresh in-memory backend with the reporter and
/// supervisor registered.
pub async fn harness() -> Harness {
    let backend = Arc::new(InMemoryBackend::new());
    backend
        .register_actor(reporter_id(), ActorRole::Citizen)
        .await;
    backend
        .register_actor(supervisor_id(), ActorRole::Supervisor)
        .await;

    let service = VerificationService::new(
        backend.clone(),
        backend.clone(),
        backend.clone(),
        backend.clone(),
        backend.clone(),
    );

    Harness { backend, service }
}

impl Harness {
    /// Register `n` verifiers and return their ids.
    pub async fn seed_verifiers(&self, n: u8) -> Vec<ActorId> {
        let mut ids = Vec::with_capacity(n as usize);
        for i in 0..n {
            let id = verifier_id(i);
            self.backend.register_actor(id, ActorRole::Verifier).await;
            ids.push(id);
        }
        ids
    }

    /// Register a reported incident and return its id.
    pub async fn seed_incident(&self) -> IncidentId {
        let id = IncidentId::new();
        self.backend
            .register_incident(id, IncidentStatus::Reported)
            .await;
        id
    }
}

/// Builder for request inputs with sensible defaults.
pub struct RequestSpec {
    incident_id: IncidentId,
    request_type: RequestType,
    priority_level: PriorityLevel,
    title: String,
    description: String,
    requested_by: ActorId,
}

impl RequestSpec {
    pub fn new(incident_id: IncidentId) -> Self {
        Self {
            incident_id,
            request_type: RequestType::NewReport,
            priority_level: PriorityLevel::Medium,
            title: "pothole on Maple Ave".to_string(),
            description: "deep pothole in the southbound lane".to_string(),
            requested_by: reporter_id(),
        }
    }

    pub fn priority(mut self, priority: PriorityLevel) -> Self {
        self.priority_level = priority;
        self
    }

    pub fn request_type(mut self, request_type: RequestType) -> Self {
        self.request_type = request_type;
        self
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    pub fn requested_by(mut self, actor: ActorId) -> Self {
        self.requested_by = actor;
        self
    }

    pub fn build(self) -> NewRequest {
        NewRequest {
            incident_id: self.incident_id,
            request_type: self.request_type,
            priority_level: self.priority_level,
            title: self.title,
            description: self.description,
            requested_by: self.requested_by,
        }
    }
}
