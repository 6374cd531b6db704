//! Database migrations.
//!
//! Embedded SQLx migrations for the two tables this core owns; the
//! incidents table is the intake module's and is never migrated from here.

use sqlx::PgPool;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("migrations/postgres");

pub async fn run(pool: &PgPool) -> anyhow::Result<()> {
    MIGRATOR.run(pool).await?;
    Ok(())
}
