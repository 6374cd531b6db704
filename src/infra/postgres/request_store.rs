//! `RequestStore` over PostgreSQL.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tracing::instrument;
use uuid::Uuid;

use crate::domain::{
    ActorId, NewRequest, Pagination, RequestFilter, RequestId, RequestPage, RequestStatus,
    ReviewerWorkload, StatusChanges, VerificationRequest, WorkloadCounts,
};
use crate::infra::{RequestStore, Result, VerificationError};

use super::{PgVerificationStore, RequestRow};

#[async_trait]
impl RequestStore for PgVerificationStore {
    #[instrument(skip(self, req), fields(incident_id = %req.incident_id))]
    async fn create(&self, req: NewRequest) -> Result<VerificationRequest> {
        let request_id = RequestId::new();
        let now = Utc::now();

        let row = sqlx::query_as::<_, RequestRow>(
            r#"
            INSERT INTO verification_requests (
                request_id, incident_id, request_type, priority_level, status,
                title, description, requested_by, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, 'pending', $5, $6, $7, $8, $8)
            RETURNING request_id, incident_id, request_type, priority_level, status,
                      title, description, assigned_verifier, requested_by,
                      created_at, updated_at, verification_date,
                      verification_notes, rejection_reason
            "#,
        )
        .bind(request_id.0)
        .bind(req.incident_id.0)
        .bind(req.request_type.as_str())
        .bind(req.priority_level.as_str())
        .bind(&req.title)
        .bind(&req.description)
        .bind(req.requested_by.0)
        .bind(now)
        .fetch_one(self.pool())
        .await?;

        row.try_into()
    }

    async fn get(&self, id: RequestId) -> Result<VerificationRequest> {
        let row = sqlx::query_as::<_, RequestRow>(
            r#"
            SELECT request_id, incident_id, request_type, priority_level, status,
                   title, description, assigned_verifier, requested_by,
                   created_at, updated_at, verification_date,
                   verification_notes, rejection_reason
            FROM verification_requests
            WHERE request_id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(self.pool())
        .await?;

        match row {
            Some(row) => row.try_into(),
            None => Err(VerificationError::RequestNotFound(id)),
        }
    }

    #[instrument(skip(self, changes), fields(request_id = %id, expected = %expected, new_status = %new_status))]
    async fn update_status(
        &self,
        id: RequestId,
        expected: RequestStatus,
        new_status: RequestStatus,
        changes: StatusChanges,
    ) -> Result<VerificationRequest> {
        let row = sqlx::query_as::<_, RequestRow>(
            r#"
            UPDATE verification_requests
            SET status = $3,
                assigned_verifier = COALESCE($4, assigned_verifier),
                verification_date = COALESCE(verification_date, $5),
                verification_notes = COALESCE($6, verification_notes),
                rejection_reason = COALESCE($7, rejection_reason),
                priority_level = COALESCE($8, priority_level),
                updated_at = NOW()
            WHERE request_id = $1 AND status = $2
            RETURNING request_id, incident_id, request_type, priority_level, status,
                      title, description, assigned_verifier, requested_by,
                      created_at, updated_at, verification_date,
                      verification_notes, rejection_reason
            "#,
        )
        .bind(id.0)
        .bind(expected.as_str())
        .bind(new_status.as_str())
        .bind(changes.assigned_verifier.map(|v| v.0))
        .bind(changes.verification_date)
        .bind(changes.verification_notes.as_deref())
        .bind(changes.rejection_reason.as_deref())
        .bind(changes.priority_level.map(|p| p.as_str()))
        .fetch_optional(self.pool())
        .await?;

        match row {
            Some(row) => row.try_into(),
            // Zero rows: either the status moved under us or the id is
            // unknown. Requests are never deleted, so distinguish the two.
            None => Err(self.cas_miss(id).await?),
        }
    }

    async fn list(&self, filter: &RequestFilter, page: Pagination) -> Result<RequestPage> {
        let status = filter.status.map(|s| s.as_str());
        let priority = filter.priority.map(|p| p.as_str());
        let request_type = filter.request_type.map(|t| t.as_str());
        let assigned_to = filter.assigned_to.map(|a| a.0);
        let incident = filter.incident.map(|i| i.0);

        let rows = sqlx::query_as::<_, RequestRow>(
            r#"
            SELECT request_id, incident_id, request_type, priority_level, status,
                   title, description, assigned_verifier, requested_by,
                   created_at, updated_at, verification_date,
                   verification_notes, rejection_reason
            FROM verification_requests
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::text IS NULL OR priority_level = $2)
              AND ($3::text IS NULL OR request_type = $3)
              AND ($4::uuid IS NULL OR assigned_verifier = $4)
              AND ($5::uuid IS NULL OR incident_id = $5)
            ORDER BY CASE priority_level
                         WHEN 'critical' THEN 3
                         WHEN 'high' THEN 2
                         WHEN 'medium' THEN 1
                         ELSE 0
                     END DESC,
                     created_at ASC
            LIMIT $6 OFFSET $7
            "#,
        )
        .bind(status)
        .bind(priority)
        .bind(request_type)
        .bind(assigned_to)
        .bind(incident)
        .bind(page.limit as i64)
        .bind(page.offset as i64)
        .fetch_all(self.pool())
        .await?;

        let total: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM verification_requests
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::text IS NULL OR priority_level = $2)
              AND ($3::text IS NULL OR request_type = $3)
              AND ($4::uuid IS NULL OR assigned_verifier = $4)
              AND ($5::uuid IS NULL OR incident_id = $5)
            "#,
        )
        .bind(status)
        .bind(priority)
        .bind(request_type)
        .bind(assigned_to)
        .bind(incident)
        .fetch_one(self.pool())
        .await?;

        let requests = rows
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<Vec<_>>>()?;

        Ok(RequestPage {
            requests,
            total: total.0 as u64,
            limit: page.limit,
            offset: page.offset,
        })
    }

    async fn count_by_verifier(&self, verifier: ActorId) -> Result<WorkloadCounts> {
        let row: (i64, i64, i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*),
                   COUNT(*) FILTER (WHERE status = 'pending'),
                   COUNT(*) FILTER (WHERE status = 'in_review'),
                   COUNT(*) FILTER (WHERE status = 'approved'),
                   COUNT(*) FILTER (WHERE status = 'rejected')
            FROM verification_requests
            WHERE assigned_verifier = $1
            "#,
        )
        .bind(verifier.0)
        .fetch_one(self.pool())
        .await?;

        Ok(WorkloadCounts {
            total: row.0 as u64,
            pending: row.1 as u64,
            in_review: row.2 as u64,
            approved: row.3 as u64,
            rejected: row.4 as u64,
        })
    }

    async fn reviewer_workloads(&self, window: Duration) -> Result<Vec<ReviewerWorkload>> {
        let cutoff = Utc::now() - window;

        let rows: Vec<(Uuid, i64, i64, i64, i64, i64, Option<f64>)> = sqlx::query_as(
            r#"
            SELECT assigned_verifier,
                   COUNT(*),
                   COUNT(*) FILTER (WHERE status = 'pending'),
                   COUNT(*) FILTER (WHERE status = 'in_review'),
                   COUNT(*) FILTER (WHERE status = 'approved'),
                   COUNT(*) FILTER (WHERE status = 'rejected'),
                   AVG(EXTRACT(EPOCH FROM (verification_date - created_at))::float8)
                       FILTER (WHERE status IN ('approved', 'rejected')
                               AND verification_date >= $1)
            FROM verification_requests
            WHERE assigned_verifier IS NOT NULL
            GROUP BY assigned_verifier
            ORDER BY assigned_verifier
            "#,
        )
        .bind(cutoff)
        .fetch_all(self.pool())
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(verifier, total, pending, in_review, approved, rejected, avg)| ReviewerWorkload {
                    verifier_id: ActorId::from_uuid(verifier),
                    counts: WorkloadCounts {
                        total: total as u64,
                        pending: pending as u64,
                        in_review: in_review as u64,
                        approved: approved as u64,
                        rejected: rejected as u64,
                    },
                    avg_turnaround_secs: avg,
                },
            )
            .collect())
    }
}

impl PgVerificationStore {
    /// Resolve a zero-row compare-and-set into the precise error.
    pub(crate) async fn cas_miss(&self, id: RequestId) -> Result<VerificationError> {
        let exists: (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM verification_requests WHERE request_id = $1)")
                .bind(id.0)
                .fetch_one(self.pool())
                .await?;
        if exists.0 {
            Ok(VerificationError::Conflict(id))
        } else {
            Ok(VerificationError::RequestNotFound(id))
        }
    }
}
