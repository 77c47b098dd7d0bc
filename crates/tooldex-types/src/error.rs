use std::fmt;

/// Result type for tooldex-types operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the types layer
#[derive(Debug)]
pub enum Error {
    /// A string did not name a known enum variant (kind, platform, origin, ...)
    UnknownVariant { field: &'static str, value: String },

    /// A `type:name` component reference could not be parsed
    InvalidReference(String),

    /// Timestamp could not be parsed as RFC 3339
    Timestamp(chrono::ParseError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnknownVariant { field, value } => {
                write!(f, "Unknown {}: '{}'", field, value)
            }
            Error::InvalidReference(reference) => {
                write!(f, "Invalid component reference: '{}'", reference)
            }
            Error::Timestamp(err) => write!(f, "Invalid timestamp: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Timestamp(err) => Some(err),
            Error::UnknownVariant { .. } | Error::InvalidReference(_) => None,
        }
    }
}

impl From<chrono::ParseError> for Error {
    fn from(err: chrono::ParseError) -> Self {
        Error::Timestamp(err)
    }
}
