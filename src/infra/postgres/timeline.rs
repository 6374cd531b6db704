//! `TimelineLedger` over PostgreSQL.
//!
//! Only INSERT and SELECT statements exist against `verification_timeline`;
//! append-only is a property of the code as much as of the schema.

use async_trait::async_trait;

use crate::domain::{NewTimelineEntry, RequestId, TimelineEntry, TimelineId};
use crate::infra::{Result, TimelineLedger};

use super::{PgVerificationStore, TimelineRow};

#[async_trait]
impl TimelineLedger for PgVerificationStore {
    async fn append(&self, entry: NewTimelineEntry) -> Result<TimelineId> {
        let timeline_id = TimelineId::new();

        sqlx::query(
            r#"
            INSERT INTO verification_timeline (
                timeline_id, request_id, action_type, action_by, action_notes, timestamp
            ) VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(timeline_id.0)
        .bind(entry.request_id.0)
        .bind(entry.action_type.as_str())
        .bind(entry.action_by.0)
        .bind(entry.action_notes.as_deref())
        .bind(entry.timestamp)
        .execute(self.pool())
        .await?;

        Ok(timeline_id)
    }

    async fn list_for(&self, request_id: RequestId) -> Result<Vec<TimelineEntry>> {
        let rows = sqlx::query_as::<_, TimelineRow>(
            r#"
            SELECT timeline_id, request_id, action_type, action_by, action_notes, timestamp
            FROM verification_timeline
            WHERE request_id = $1
            ORDER BY timestamp ASC, entry_seq ASC
            "#,
        )
        .bind(request_id.0)
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}
