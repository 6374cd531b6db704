//! PostgreSQL backend for the request store, timeline ledger and
//! transition journal.
//!
//! One [`PgVerificationStore`] implements all three contracts over a shared
//! pool, so the journal can compose the same statements the single-table
//! traits use inside one transaction.

mod incidents;
mod journal;
mod request_store;
mod timeline;

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use std::time::Duration;
use uuid::Uuid;

use crate::domain::{
    ActorId, IncidentId, PriorityLevel, RequestId, RequestStatus, RequestType, TimelineAction,
    TimelineEntry, TimelineId, VerificationRequest,
};

use super::{Result, VerificationError};

/// Connection settings for the portal database.
#[derive(Debug, Clone)]
pub struct PgConfig {
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Maximum pool size.
    pub max_connections: u32,
    /// Bound on waiting for a connection; a saturated pool surfaces as a
    /// storage error instead of a hang.
    pub acquire_timeout: Duration,
}

impl PgConfig {
    /// Load settings from environment variables.
    pub fn from_env() -> Self {
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/roadwatch".to_string());

        let max_connections: u32 = std::env::var("MAX_DB_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);

        let acquire_timeout = std::env::var("DB_ACQUIRE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(5));

        Self {
            database_url,
            max_connections,
            acquire_timeout,
        }
    }

    /// Build a pool from these settings.
    pub async fn connect(&self) -> Result<PgPool> {
        let pool = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(self.acquire_timeout)
            .connect(&self.database_url)
            .await?;
        Ok(pool)
    }
}

/// PostgreSQL-backed verification storage.
pub struct PgVerificationStore {
    pool: PgPool,
}

impl PgVerificationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect using [`PgConfig`] and run pending migrations.
    pub async fn from_config(config: &PgConfig) -> Result<Self> {
        let pool = config.connect().await?;
        crate::migrations::run(&pool)
            .await
            .map_err(|e| VerificationError::Internal(format!("migration failed: {e}")))?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Raw row from `verification_requests`.
#[derive(Debug, FromRow)]
pub(crate) struct RequestRow {
    pub request_id: Uuid,
    pub incident_id: Uuid,
    pub request_type: String,
    pub priority_level: String,
    pub status: String,
    pub title: String,
    pub description: String,
    pub assigned_verifier: Option<Uuid>,
    pub requested_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub verification_date: Option<DateTime<Utc>>,
    pub verification_notes: Option<String>,
    pub rejection_reason: Option<String>,
}

impl TryFrom<RequestRow> for VerificationRequest {
    type Error = VerificationError;

    fn try_from(row: RequestRow) -> Result<Self> {
        let request_type = RequestType::parse(&row.request_type)
            .ok_or_else(|| VerificationError::corrupt_column("request_type", &row.request_type))?;
        let priority_level = PriorityLevel::parse(&row.priority_level).ok_or_else(|| {
            VerificationError::corrupt_column("priority_level", &row.priority_level)
        })?;
        let status = RequestStatus::parse(&row.status)
            .ok_or_else(|| VerificationError::corrupt_column("status", &row.status))?;

        Ok(VerificationRequest {
            request_id: RequestId::from_uuid(row.request_id),
            incident_id: IncidentId::from_uuid(row.incident_id),
            request_type,
            priority_level,
            status,
            title: row.title,
            description: row.description,
            assigned_verifier: row.assigned_verifier.map(ActorId::from_uuid),
            requested_by: ActorId::from_uuid(row.requested_by),
            created_at: row.created_at,
            updated_at: row.updated_at,
            verification_date: row.verification_date,
            verification_notes: row.verification_notes,
            rejection_reason: row.rejection_reason,
        })
    }
}

/// Raw row from `verification_timeline`.
#[derive(Debug, FromRow)]
pub(crate) struct TimelineRow {
    pub timeline_id: Uuid,
    pub request_id: Uuid,
    pub action_type: String,
    pub action_by: Uuid,
    pub action_notes: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl TryFrom<TimelineRow> for TimelineEntry {
    type Error = VerificationError;

    fn try_from(row: TimelineRow) -> Result<Self> {
        let action_type = TimelineAction::parse(&row.action_type)
            .ok_or_else(|| VerificationError::corrupt_column("action_type", &row.action_type))?;

        Ok(TimelineEntry {
            timeline_id: TimelineId::from_uuid(row.timeline_id),
            request_id: RequestId::from_uuid(row.request_id),
            action_type,
            action_by: ActorId::from_uuid(row.action_by),
            action_notes: row.action_notes,
            timestamp: row.timestamp,
        })
    }
}
