use reading_tracker::config::DatabaseConfig;
use reading_tracker::schema::tracker_schema;
use tempfile::TempDir;

/// A file-backed database with the tracker schema, removed on drop.
pub struct TestDb {
    pub config: DatabaseConfig,
    _dir: TempDir,
}

pub fn create_temp_db() -> TestDb {
    let dir = tempfile::tempdir().unwrap();
    let config = DatabaseConfig::new(dir.path().join("db.sqlite"));
    let conn = config.open().unwrap();
    tracker_schema().create_all(&conn).unwrap();
    TestDb { config, _dir: dir }
}
