use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::component::{ComponentKind, ComponentRecord, Platform};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanErrorKind {
    /// A single item inside a parser's source could not be read
    Parse,
    /// The parser itself returned an error
    Failed,
    Panic,
    /// The parser outlived the advisory timeout
    Timeout,
    /// Two records with the same identity in one merge
    Collision,
    /// A platform root was not configured or does not exist
    Unavailable,
}

impl ScanErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanErrorKind::Parse => "parse",
            ScanErrorKind::Failed => "failed",
            ScanErrorKind::Panic => "panic",
            ScanErrorKind::Timeout => "timeout",
            ScanErrorKind::Collision => "collision",
            ScanErrorKind::Unavailable => "unavailable",
        }
    }
}

/// A failure reported as data in a [`ScanResult`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanError {
    /// Parser name, platform, or component key the error belongs to
    pub source: String,
    pub kind: ScanErrorKind,
    pub message: String,
}

impl ScanError {
    pub fn new(source: impl Into<String>, kind: ScanErrorKind, message: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind.as_str(), self.source, self.message)
    }
}

/// Everything one scan pass produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub components: Vec<ComponentRecord>,
    /// `(platform, kind)` pairs whose parser ran to completion
    pub coverage: BTreeSet<(Platform, ComponentKind)>,
    pub errors: Vec<ScanError>,
    pub scanned_at: DateTime<Utc>,
}

impl ScanResult {
    pub fn new(scanned_at: DateTime<Utc>) -> Self {
        Self {
            components: Vec::new(),
            coverage: BTreeSet::new(),
            errors: Vec::new(),
            scanned_at,
        }
    }

    pub fn covers(&self, platform: Platform, kind: ComponentKind) -> bool {
        self.coverage.contains(&(platform, kind))
    }

    pub fn errors_of(&self, kind: ScanErrorKind) -> impl Iterator<Item = &ScanError> {
        self.errors.iter().filter(move |e| e.kind == kind)
    }

    pub fn summary(&self) -> String {
        format!(
            "{} components indexed, {} errors",
            self.components.len(),
            self.errors.len()
        )
    }
}
