use std::fmt;

/// Result type for tooldex-scanners operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while parsing a platform root
#[derive(Debug)]
pub enum Error {
    /// IO operation failed
    Io(std::io::Error),

    /// JSON parsing failed
    Json(serde_json::Error),

    /// YAML frontmatter parsing failed
    Yaml(serde_yaml::Error),

    /// TOML parsing failed
    Toml(toml::de::Error),

    /// Walkdir error
    WalkDir(walkdir::Error),

    /// Structurally invalid source (wrong shape, missing required fields, etc.)
    Parse(String),

    /// The component cannot be enabled or disabled from here
    NotToggleable(String),

    /// Enabling or disabling failed; nothing was changed
    Toggle(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "IO error: {}", err),
            Error::Json(err) => write!(f, "JSON error: {}", err),
            Error::Yaml(err) => write!(f, "YAML error: {}", err),
            Error::Toml(err) => write!(f, "TOML error: {}", err),
            Error::WalkDir(err) => write!(f, "Directory traversal error: {}", err),
            Error::Parse(msg) => write!(f, "Parse error: {}", msg),
            Error::NotToggleable(msg) => write!(f, "Toggle not supported: {}", msg),
            Error::Toggle(msg) => write!(f, "Toggle failed: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Json(err) => Some(err),
            Error::Yaml(err) => Some(err),
            Error::Toml(err) => Some(err),
            Error::WalkDir(err) => Some(err),
            Error::Parse(_) | Error::NotToggleable(_) | Error::Toggle(_) => None,
        }
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

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Yaml(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Toml(err)
    }
}

impl From<walkdir::Error> for Error {
    fn from(err: walkdir::Error) -> Self {
        Error::WalkDir(err)
    }
}
