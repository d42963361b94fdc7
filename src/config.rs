//! Configuration for the tracker: where the database lives and how it is opened.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackerError};

/// File name searched for in the working directory.
pub const CONFIG_FILE_NAME: &str = "reading-tracker.toml";
/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "READING_TRACKER_CONFIG";

/// Top level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

/// SQLite connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file
    pub path: PathBuf,
    /// Log every executed statement (default: false)
    pub echo: bool,
    /// Enforce foreign key constraints (default: true)
    pub foreign_keys: bool,
    /// How long to wait on a locked database file (default: 5000)
    pub busy_timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("db.sqlite"),
            echo: false,
            foreign_keys: true,
            busy_timeout_ms: 5000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl TrackerConfig {
    /// Load configuration from `./reading-tracker.toml`, or from the file named
    /// by `READING_TRACKER_CONFIG`.
    pub fn load() -> Result<Self> {
        let mut candidates = vec![PathBuf::from(CONFIG_FILE_NAME)];
        if let Some(path) = std::env::var_os(CONFIG_ENV_VAR) {
            candidates.push(PathBuf::from(path));
        }

        for path in candidates {
            if path.exists() {
                return Self::load_from(&path);
            }
        }
        Err(TrackerError::ConfigNotFound)
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|source| TrackerError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }
}

impl DatabaseConfig {
    /// Settings for a database at `path`, everything else default.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn with_foreign_keys(mut self, enabled: bool) -> Self {
        self.foreign_keys = enabled;
        self
    }

    /// Open a connection with the configured pragmas applied.
    pub fn open(&self) -> Result<Connection> {
        let mut conn = Connection::open(&self.path)?;
        conn.busy_timeout(Duration::from_millis(self.busy_timeout_ms))?;
        conn.pragma_update(None, "foreign_keys", self.foreign_keys)?;
        if self.echo {
            conn.trace(Some(echo_statement));
        }
        tracing::debug!(
            path = %self.path.display(),
            foreign_keys = self.foreign_keys,
            "opened database"
        );
        Ok(conn)
    }
}

fn echo_statement(sql: &str) {
    tracing::info!(target: "reading_tracker::sql", "{}", sql.trim());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TrackerConfig::default();
        assert_eq!(config.database.path, PathBuf::from("db.sqlite"));
        assert!(!config.database.echo);
        assert!(config.database.foreign_keys);
        assert_eq!(config.database.busy_timeout_ms, 5000);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = TrackerConfig::parse(
            r#"
            [database]
            path = "/tmp/books.sqlite"
            echo = true
            "#,
        )
        .unwrap();
        assert_eq!(config.database.path, PathBuf::from("/tmp/books.sqlite"));
        assert!(config.database.echo);
        assert!(config.database.foreign_keys);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_invalid_config() {
        let err = TrackerConfig::parse("[database]\necho = \"loud\"").unwrap_err();
        assert!(matches!(err, TrackerError::ConfigParse(_)));
    }

    #[test]
    fn test_load_from_missing_file() {
        let err = TrackerConfig::load_from(Path::new("/nonexistent/reading-tracker.toml"))
            .unwrap_err();
        assert!(matches!(err, TrackerError::ConfigIo { .. }));
    }

    #[test]
    fn test_open_applies_foreign_keys() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig::new(dir.path().join("fk.sqlite"));
        let conn = config.open().unwrap();
        let enabled: bool = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert!(enabled);

        let conn = config.with_foreign_keys(false).open().unwrap();
        let enabled: bool = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert!(!enabled);
    }

    #[test]
    fn test_load_uses_env_var_then_reports_not_found() {
        // Both cases share one test so nothing else touches the variable meanwhile.
        assert!(!Path::new(CONFIG_FILE_NAME).exists());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracker.toml");
        fs::write(&path, "[logging]\nlevel = \"debug\"\n").unwrap();

        std::env::set_var(CONFIG_ENV_VAR, &path);
        let found = TrackerConfig::load();
        std::env::set_var(CONFIG_ENV_VAR, dir.path().join("missing.toml"));
        let missing = TrackerConfig::load();
        std::env::remove_var(CONFIG_ENV_VAR);

        let config = found.unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.database, DatabaseConfig::default());
        assert!(matches!(missing, Err(TrackerError::ConfigNotFound)));
    }
}
