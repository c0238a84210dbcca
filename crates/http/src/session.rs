//! Per-request database session.

use std::ops::{Deref, DerefMut};

use anyhow::Context;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use catalog_kernel::DbPool;
use sqlx::{Sqlite, SqliteConnection, Transaction};

use crate::error::AppError;

/// One database transaction scoped to a single request.
///
/// Extracted before the handler runs and passed to it explicitly. Work is
/// only persisted by [`DbSession::commit`]; dropping the session on any other
/// path rolls the transaction back and hands the connection back to the pool.
pub struct DbSession {
    tx: Transaction<'static, Sqlite>,
}

impl DbSession {
    /// Begin a new session on `pool`.
    pub async fn begin(pool: &DbPool) -> Result<Self, sqlx::Error> {
        let tx = pool.begin().await?;
        Ok(Self { tx })
    }

    /// Connection to run queries on, inside the session's transaction.
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.tx
    }

    /// Persist everything done through this session.
    pub async fn commit(self) -> Result<(), AppError> {
        self.tx
            .commit()
            .await
            .context("failed to commit database session")?;
        Ok(())
    }
}

impl<S> FromRequestParts<S> for DbSession
where
    DbPool: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(_parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let pool = DbPool::from_ref(state);
        let session = DbSession::begin(&pool)
            .await
            .context("failed to open database session")?;
        Ok(session)
    }
}

/// [`DbSession`] that takes the database write lock when it begins.
///
/// Write handlers read before they write. Holding the lock from `BEGIN`
/// means a second writer waits on the busy timeout instead of failing to
/// upgrade a shared lock.
pub struct WriteSession(DbSession);

impl WriteSession {
    pub async fn begin(pool: &DbPool) -> Result<Self, sqlx::Error> {
        let tx = pool.begin_with("BEGIN IMMEDIATE").await?;
        Ok(Self(DbSession { tx }))
    }

    pub async fn commit(self) -> Result<(), AppError> {
        self.0.commit().await
    }
}

impl Deref for WriteSession {
    type Target = DbSession;

    fn deref(&self) -> &DbSession {
        &self.0
    }
}

impl DerefMut for WriteSession {
    fn deref_mut(&mut self) -> &mut DbSession {
        &mut self.0
    }
}

impl<S> FromRequestParts<S> for WriteSession
where
    DbPool: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(_parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let pool = DbPool::from_ref(state);
        let session = WriteSession::begin(&pool)
            .await
            .context("failed to open database write session")?;
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    use catalog_kernel::settings::DatabaseSettings;

    async fn pool_with_table() -> DbPool {
        let pool = catalog_db::connect_in_memory().await.unwrap();
        sqlx::query("CREATE TABLE items (name TEXT NOT NULL)")
            .execute(&pool)
            .await
            .unwrap();
        pool
    }

    async fn count(pool: &DbPool) -> i64 {
        let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM items")
            .fetch_one(pool)
            .await
            .unwrap();
        n
    }

    #[tokio::test]
    async fn committed_work_is_persisted() {
        let pool = pool_with_table().await;

        let mut session = DbSession::begin(&pool).await.unwrap();
        sqlx::query("INSERT INTO items (name) VALUES ('kept')")
            .execute(session.conn())
            .await
            .unwrap();
        session.commit().await.unwrap();

        assert_eq!(count(&pool).await, 1);
    }

    #[tokio::test]
    async fn dropped_session_rolls_back_and_releases_connection() {
        let pool = pool_with_table().await;

        {
            let mut session = DbSession::begin(&pool).await.unwrap();
            sqlx::query("INSERT INTO items (name) VALUES ('discarded')")
                .execute(session.conn())
                .await
                .unwrap();
        }

        // The pool holds a single connection, so this only succeeds if the
        // dropped session gave it back.
        assert_eq!(count(&pool).await, 0);
    }

    /// Pool over a database file, so sessions get separate connections.
    async fn file_pool() -> (DbPool, PathBuf) {
        let path = std::env::temp_dir().join(format!("catalog-session-{}.db", uuid::Uuid::new_v4()));
        let settings = DatabaseSettings {
            url: format!("sqlite://{}", path.display()),
            max_connections: 5,
        };
        let pool = catalog_db::connect(&settings).await.unwrap();
        sqlx::query("CREATE TABLE items (name TEXT NOT NULL)")
            .execute(&pool)
            .await
            .unwrap();
        (pool, path)
    }

    async fn count_in(conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
        let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM items")
            .fetch_one(conn)
            .await?;
        Ok(n)
    }

    #[tokio::test]
    async fn overlapping_writers_both_commit() {
        let (pool, path) = file_pool().await;

        let mut first = WriteSession::begin(&pool).await.unwrap();
        assert_eq!(count_in(first.conn()).await.unwrap(), 0);

        let second = tokio::spawn({
            let pool = pool.clone();
            async move {
                let mut session = WriteSession::begin(&pool).await?;
                count_in(session.conn()).await?;
                sqlx::query("INSERT INTO items (name) VALUES ('second')")
                    .execute(session.conn())
                    .await?;
                session.commit().await?;
                Ok::<(), AppError>(())
            }
        });

        // Let the second writer reach BEGIN while the first still holds the lock.
        tokio::time::sleep(Duration::from_millis(50)).await;
        sqlx::query("INSERT INTO items (name) VALUES ('first')")
            .execute(first.conn())
            .await
            .unwrap();
        first.commit().await.unwrap();

        second.await.unwrap().unwrap();
        assert_eq!(count(&pool).await, 2);

        pool.close().await;
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
        }
    }
}
