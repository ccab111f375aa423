use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use tierwatch::adapter::outbound::sqlite::database::connection::open;
use tierwatch::adapter::outbound::sqlite::SqliteTokenRepository;

/// Temporary SQLite database file, removed on drop.
pub struct TempDb {
    _dir: TempDir,
    path: PathBuf,
}

impl TempDb {
    pub fn create() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("tierwatch.db");
        Self { _dir: dir, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn url(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }

    /// A repository over its own connection pool.
    pub fn repository(&self) -> Arc<SqliteTokenRepository> {
        let pool = open(&self.url()).expect("open sqlite database");
        Arc::new(SqliteTokenRepository::new(pool))
    }
}
