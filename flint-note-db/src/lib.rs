//! Embedded SQLite storage layer for flint-note (component D).
//!
//! Owns connection setup, pragmas, and schema migrations only. The
//! domain-specific queries (note upsert, search, link graph) live in
//! `flint-note-store`, which depends on this crate for `DbPool`.

mod error;
mod pool;
mod sqlite_runtime;

pub use error::{DbError, DbResult};
pub use pool::DbPool;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_in_memory_runs_migrations() {
        let pool = DbPool::open_in_memory().await.unwrap();
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM notes")
            .fetch_one(pool.rw())
            .await
            .unwrap();
        assert_eq!(row.0, 0);
    }

    #[tokio::test]
    async fn read_only_pool_rejects_writes() {
        let tmp = tempfile::tempdir().unwrap();
        let db_path = tmp.path().join("db.sqlite");
        let pool = DbPool::open(&db_path).await.unwrap();

        let result = sqlx::query("INSERT INTO meta(key, value) VALUES ('a', 'b')")
            .execute(pool.ro())
            .await;

        let err = result.unwrap_err().to_string().to_lowercase();
        assert!(err.contains("readonly"), "unexpected error: {err}");
    }
}
