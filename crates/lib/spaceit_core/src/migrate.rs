//! Database migration support.
//!
//! Embeds the schema under `spaceit_core/migrations/` (users, spaces,
//! permissions and the two audit tables).

use sqlx::PgPool;

/// Run all embedded database migrations against the given pool.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
