use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use std::path::Path;
use tracing::warn;

pub type DbPool = Pool<SqliteConnectionManager>;

/// File-backed pool in WAL mode with foreign keys enforced.
///
/// A missing parent directory is created. If that fails the error is logged
/// and opening the database reports the real cause.
pub fn create_pool(database_path: &Path) -> Result<DbPool, r2d2::Error> {
    if let Some(parent) = database_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = std::fs::create_dir_all(parent) {
            warn!(dir = %parent.display(), error = %e, "Could not create database directory");
        }
    }

    let manager = SqliteConnectionManager::file(database_path).with_init(|conn| {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = 5000;",
        )
    });

    Pool::builder().max_size(10).build(manager)
}

/// Every in-memory connection is its own database, so the pool holds exactly one.
pub fn create_in_memory_pool() -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::memory()
        .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));

    Pool::builder().max_size(1).build(manager)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_pool_creates_missing_directory() {
        let root = std::env::temp_dir().join(format!("provisions-pool-{}", std::process::id()));
        let path = root.join("nested").join("provisions.db");

        let pool = create_pool(&path).unwrap();
        let conn = pool.get().unwrap();
        let foreign_keys: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(foreign_keys, 1);
        assert!(path.parent().unwrap().is_dir());

        drop(conn);
        drop(pool);
        std::fs::remove_dir_all(&root).ok();
    }
}
