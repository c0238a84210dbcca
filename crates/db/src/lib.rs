//! SQLite connection pool factory and the runner for module-provided migrations.

use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use catalog_kernel::settings::DatabaseSettings;
use catalog_kernel::{DbPool, Migration};
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

/// How long a connection waits for another writer's lock before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const MIGRATIONS_TABLE_DDL: &str = "CREATE TABLE IF NOT EXISTS _catalog_migrations (
    module     TEXT NOT NULL,
    id         TEXT NOT NULL,
    applied_at TEXT NOT NULL,
    PRIMARY KEY (module, id)
)";

/// Open the pool described by `settings`, creating the database file if needed.
pub async fn connect(settings: &DatabaseSettings) -> anyhow::Result<DbPool> {
    let options = SqliteConnectOptions::from_str(&settings.url)
        .with_context(|| format!("invalid database url '{}'", settings.url))?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(BUSY_TIMEOUT);

    let pool = SqlitePoolOptions::new()
        .max_connections(settings.max_connections)
        .connect_with(options)
        .await
        .with_context(|| format!("failed to connect to '{}'", settings.url))?;

    tracing::info!(
        url = %settings.url,
        max_connections = settings.max_connections,
        "database connected"
    );
    Ok(pool)
}

/// Private in-memory database backed by a single long-lived connection.
///
/// Every pooled connection to `:memory:` would otherwise see its own empty
/// database, so the pool is capped at one connection that never expires.
pub async fn connect_in_memory() -> anyhow::Result<DbPool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .with_context(|| "invalid in-memory database url")?
        .foreign_keys(true);

    SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .with_context(|| "failed to open in-memory database")
}

/// Apply every migration not yet recorded, in the given order.
///
/// Each migration runs in its own transaction together with its bookkeeping
/// row, so a failing script leaves no partial schema behind.
/// Returns the number of migrations applied by this call.
pub async fn apply_migrations(
    pool: &DbPool,
    migrations: &[(String, Migration)],
) -> anyhow::Result<usize> {
    sqlx::query(MIGRATIONS_TABLE_DDL)
        .execute(pool)
        .await
        .with_context(|| "failed to create migrations table")?;

    let mut applied = 0;
    for (module, migration) in migrations {
        let already: Option<(String,)> =
            sqlx::query_as("SELECT id FROM _catalog_migrations WHERE module = ? AND id = ?")
                .bind(module)
                .bind(migration.id)
                .fetch_optional(pool)
                .await
                .with_context(|| "failed to read migrations table")?;

        if already.is_some() {
            tracing::debug!(module = %module, migration = migration.id, "migration already applied");
            continue;
        }

        let mut tx = pool.begin().await?;
        sqlx::raw_sql(migration.up)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("migration {}/{} failed", module, migration.id))?;
        sqlx::query("INSERT INTO _catalog_migrations (module, id, applied_at) VALUES (?, ?, ?)")
            .bind(module)
            .bind(migration.id)
            .bind(Utc::now().to_rfc3339())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(module = %module, migration = migration.id, "migration applied");
        applied += 1;
    }

    Ok(applied)
}
