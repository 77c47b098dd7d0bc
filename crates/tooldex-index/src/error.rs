use std::fmt;

/// Result type for tooldex-index operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the index layer
#[derive(Debug)]
pub enum Error {
    /// Database operation failed
    Database(rusqlite::Error),

    /// IO operation failed
    Io(std::io::Error),

    /// Stored JSON payload could not be (de)serialized
    Json(serde_json::Error),

    /// Upgrading an older schema failed; the store was rolled back
    Migration { from: i32, source: rusqlite::Error },

    /// The file was written by a newer version of tooldex
    SchemaTooNew { found: i32, supported: i32 },

    /// Query-specific error (invalid input, corrupt row, etc.)
    Query(String),
}

impl Error {
    /// True for lock contention a caller may retry or drop
    pub fn is_busy(&self) -> bool {
        let code = match self {
            Error::Database(err) | Error::Migration { source: err, .. } => err.sqlite_error_code(),
            _ => None,
        };
        matches!(
            code,
            Some(rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked)
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Database(err) => {
                let msg = err.to_string();
                // Detect schema mismatch errors and provide actionable hint
                if msg.contains("no such column") || msg.contains("no such table") {
                    write!(
                        f,
                        "Database schema mismatch: {}. Reopen the index with tooldex to run migrations.",
                        msg
                    )
                } else {
                    write!(f, "Database error: {}", err)
                }
            }
            Error::Io(err) => write!(f, "IO error: {}", err),
            Error::Json(err) => write!(f, "JSON error: {}", err),
            Error::Migration { from, source } => {
                write!(f, "Migration from schema v{} failed: {}", from, source)
            }
            Error::SchemaTooNew { found, supported } => write!(
                f,
                "Index schema v{} is newer than the supported v{}; upgrade tooldex",
                found, supported
            ),
            Error::Query(msg) => write!(f, "Query error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Database(err) => Some(err),
            Error::Io(err) => Some(err),
            Error::Json(err) => Some(err),
            Error::Migration { source, .. } => Some(source),
            Error::SchemaTooNew { .. } | Error::Query(_) => None,
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}

impl From<tooldex_types::Error> for Error {
    fn from(err: tooldex_types::Error) -> Self {
        Error::Query(err.to_string())
    }
}
