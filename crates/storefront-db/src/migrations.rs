//! # Database Migrations
//!
//! SQL migrations embedded at compile time from `migrations/sqlite/` at the
//! workspace root.
//!
//! ## Adding New Migrations
//!
//! 1. Create the next `NNN_description.sql` file in `migrations/sqlite/`
//! 2. Write idempotent SQL (`IF NOT EXISTS`, `INSERT OR IGNORE`)
//! 3. **NEVER** modify an applied migration; always add a new one

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Runs all pending migrations in filename order, each in its own transaction.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    info!("Checking for pending migrations");

    MIGRATOR.run(pool).await?;

    info!("All migrations applied successfully");
    Ok(())
}

/// Returns `(total_migrations, applied_migrations)` for diagnostics.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let total = MIGRATOR.migrations.len();

    // The bookkeeping table is missing until the first run
    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await
        .unwrap_or(0);

    Ok((total, applied as usize))
}
