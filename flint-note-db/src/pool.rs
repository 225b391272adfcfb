use std::path::Path;

use sqlx::SqlitePool;

use crate::error::DbResult;
use crate::sqlite_runtime::{create_rw_pool, create_ro_pool};

/// The engine's two SQLite connections: a serialised read/write pool used
/// by every mutating component, and a read-only pool used by search and
/// any other read-only query path.
#[derive(Debug, Clone)]
pub struct DbPool {
    rw: SqlitePool,
    ro: SqlitePool,
}

impl DbPool {
    /// Open both connections against `db_path`, running pending migrations
    /// on the read/write pool first so the read-only pool always sees a
    /// fully migrated schema.
    pub async fn open(db_path: &Path) -> DbResult<Self> {
        let rw = create_rw_pool(db_path, 8).await?;
        run_migrations(&rw).await?;
        let ro = create_ro_pool(db_path, 8).await?;
        Ok(Self { rw, ro })
    }

    #[cfg(any(test, feature = "test-helpers"))]
    pub async fn open_in_memory() -> DbResult<Self> {
        let rw = crate::sqlite_runtime::create_in_memory_pool(1).await?;
        run_migrations(&rw).await?;
        Ok(Self { rw: rw.clone(), ro: rw })
    }

    pub fn rw(&self) -> &SqlitePool {
        &self.rw
    }

    pub fn ro(&self) -> &SqlitePool {
        &self.ro
    }
}

async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
