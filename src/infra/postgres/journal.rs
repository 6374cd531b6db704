//! `TransitionJournal` over PostgreSQL.
//!
//! Each journal call is one transaction: the request write, the timeline
//! entry, and (for approve/reject) the linked incident's status all land
//! together or not at all. A failure anywhere rolls the transaction back
//! and leaves the request in its prior state.

use async_trait::async_trait;
use chrono::Utc;
use tracing::instrument;

use crate::domain::{
    NewRequest, RequestId, RequestStatus, TimelineAction, TimelineId, TransitionPlan,
    VerificationRequest,
};
use crate::infra::{Result, TransitionJournal, VerificationError};

use super::{PgVerificationStore, RequestRow};

#[async_trait]
impl TransitionJournal for PgVerificationStore {
    #[instrument(skip(self, req), fields(incident_id = %req.incident_id))]
    async fn open(&self, req: NewRequest) -> Result<VerificationRequest> {
        let request_id = RequestId::new();
        let now = Utc::now();

        let mut tx = self.pool().begin().await?;

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
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO verification_timeline (
                timeline_id, request_id, action_type, action_by, action_notes, timestamp
            ) VALUES ($1, $2, $3, $4, NULL, $5)
            "#,
        )
        .bind(TimelineId::new().0)
        .bind(request_id.0)
        .bind(TimelineAction::Created.as_str())
        .bind(req.requested_by.0)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let request: VerificationRequest = row.try_into()?;
        tracing::info!(
            request_id = %request.request_id,
            incident_id = %request.incident_id,
            priority = %request.priority_level,
            "verification request opened"
        );
        Ok(request)
    }

    #[instrument(skip(self, plan), fields(request_id = %id, expected = %expected, action = %plan.entry.action_type))]
    async fn commit(
        &self,
        id: RequestId,
        expected: RequestStatus,
        plan: TransitionPlan,
    ) -> Result<VerificationRequest> {
        let mut tx = self.pool().begin().await?;

        // Compare-and-set: zero rows means a concurrent transition won.
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
        .bind(plan.new_status.as_str())
        .bind(plan.changes.assigned_verifier.map(|v| v.0))
        .bind(plan.changes.verification_date)
        .bind(plan.changes.verification_notes.as_deref())
        .bind(plan.changes.rejection_reason.as_deref())
        .bind(plan.changes.priority_level.map(|p| p.as_str()))
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            drop(tx);
            return Err(self.cas_miss(id).await?);
        };
        let request: VerificationRequest = row.try_into()?;

        sqlx::query(
            r#"
            INSERT INTO verification_timeline (
                timeline_id, request_id, action_type, action_by, action_notes, timestamp
            ) VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(TimelineId::new().0)
        .bind(plan.entry.request_id.0)
        .bind(plan.entry.action_type.as_str())
        .bind(plan.entry.action_by.0)
        .bind(plan.entry.action_notes.as_deref())
        .bind(plan.entry.timestamp)
        .execute(&mut *tx)
        .await?;

        if let Some(incident_status) = plan.incident_update {
            let result = sqlx::query(
                r#"
                UPDATE incidents
                SET status = $2, updated_at = NOW()
                WHERE incident_id = $1
                "#,
            )
            .bind(request.incident_id.0)
            .bind(incident_status.as_str())
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                // Rolls back the whole transition; the request keeps its
                // prior status and no timeline entry survives.
                drop(tx);
                return Err(VerificationError::IncidentNotFound(request.incident_id));
            }
        }

        tx.commit().await?;

        tracing::info!(
            request_id = %request.request_id,
            status = %request.status,
            action = %plan.entry.action_type,
            action_by = %plan.entry.action_by,
            "transition committed"
        );
        Ok(request)
    }
}
