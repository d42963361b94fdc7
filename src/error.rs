use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the tracker library.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to read config file {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("no configuration file found")]
    ConfigNotFound,

    #[error("invalid SQL identifier `{0}`")]
    InvalidIdentifier(String),

    #[error("{0} operation has nothing to do")]
    EmptyOperation(&'static str),

    #[error("{table} record has no primary key yet")]
    Unsaved { table: &'static str },

    #[error("no {table} row with id {id}")]
    NotFound { table: &'static str, id: i64 },
}

pub type Result<T> = std::result::Result<T, TrackerError>;

/// Checks that `name` is safe to splice into SQL as a table, column or index name.
pub(crate) fn check_identifier(name: &str) -> Result<&str> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .map_or(false, |c| c.is_ascii_alphabetic() || c == '_');
    if valid_start && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(name)
    } else {
        Err(TrackerError::InvalidIdentifier(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers() {
        assert!(check_identifier("books").is_ok());
        assert!(check_identifier("_book_id2").is_ok());
        assert!(check_identifier("").is_err());
        assert!(check_identifier("2books").is_err());
        assert!(check_identifier("books; DROP TABLE users").is_err());
    }
}
