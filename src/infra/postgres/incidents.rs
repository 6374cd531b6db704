//! Read-only view of the intake module's `incidents` table.
//!
//! This core never inserts or deletes incident rows; the only write it
//! performs is the status flip inside the journal transaction.

use async_trait::async_trait;

use crate::domain::IncidentId;
use crate::infra::{IncidentGateway, Result};

use super::PgVerificationStore;

#[async_trait]
impl IncidentGateway for PgVerificationStore {
    async fn incident_exists(&self, id: IncidentId) -> Result<bool> {
        let row: (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM incidents WHERE incident_id = $1)")
                .bind(id.0)
                .fetch_one(self.pool())
                .await?;
        Ok(row.0)
    }
}
