use std::fmt;

/// Result type for tooldex-runtime operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the runtime layer
#[derive(Debug)]
pub enum Error {
    /// Database/index layer error
    Index(tooldex_index::Error),

    /// IO operation failed
    Io(std::io::Error),

    /// Enabling or disabling a component on disk failed
    Toggle(tooldex_scanners::Error),

    /// No indexed component has this identity
    NotFound(String),

    /// Configuration error
    Config(String),

    /// Async runtime or task failure outside any single parser
    Runtime(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Index(err) => write!(f, "Index error: {}", err),
            Error::Io(err) => write!(f, "IO error: {}", err),
            Error::Toggle(err) => write!(f, "{}", err),
            Error::NotFound(key) => write!(f, "Component not found: {}", key),
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::Runtime(msg) => write!(f, "Runtime error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Index(err) => Some(err),
            Error::Io(err) => Some(err),
            Error::Toggle(err) => Some(err),
            Error::NotFound(_) | Error::Config(_) | Error::Runtime(_) => None,
        }
    }
}

impl From<tooldex_index::Error> for Error {
    fn from(err: tooldex_index::Error) -> Self {
        Error::Index(err)
    }
}

impl From<tooldex_scanners::Error> for Error {
    fn from(err: tooldex_scanners::Error) -> Self {
        Error::Toggle(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Error::Config(err.to_string())
    }
}
