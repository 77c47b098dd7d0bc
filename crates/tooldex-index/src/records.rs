use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tooldex_types::{
    ComponentKey, ComponentKind, ComponentRecord, ComponentStatus, Origin, Platform,
};

/// A component as stored in the index.
///
/// Wraps the scanned [`ComponentRecord`] with the bookkeeping columns the
/// index maintains across scans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentRow {
    /// Row id; stable across rescans of the same identity.
    pub id: i64,
    pub record: ComponentRecord,
    /// First time any scan stored this identity (RFC 3339).
    pub first_seen: String,
    /// Last scan that changed or revived this row (RFC 3339).
    pub last_seen: String,
    /// Set when a completed parser stopped reporting this component.
    pub missing_since: Option<String>,
}

impl ComponentRow {
    pub fn key(&self) -> ComponentKey {
        self.record.key()
    }

    pub fn is_missing(&self) -> bool {
        self.missing_since.is_some()
    }
}

/// Filters for listing and searching components. All set fields must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentFilter {
    pub platform: Option<Platform>,
    pub kind: Option<ComponentKind>,
    pub origin: Option<Origin>,
    pub status: Option<ComponentStatus>,
    pub include_missing: bool,
    pub limit: Option<usize>,
}

impl ComponentFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }

    pub fn kind(mut self, kind: ComponentKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn origin(mut self, origin: Origin) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn status(mut self, status: ComponentStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn include_missing(mut self) -> Self {
        self.include_missing = true;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// WHERE clauses and their bound values, columns qualified with `alias`
    pub(crate) fn clauses(&self, alias: &str) -> (Vec<String>, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut clauses = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        let mut push = |column: &str, value: &'static str| {
            clauses.push(format!("{}.{} = ?", alias, column));
            params.push(Box::new(value));
        };
        if let Some(platform) = self.platform {
            push("platform", platform.as_str());
        }
        if let Some(kind) = self.kind {
            push("type", kind.as_str());
        }
        if let Some(origin) = self.origin {
            push("origin", origin.as_str());
        }
        if let Some(status) = self.status {
            push("status", status.as_str());
        }
        if !self.include_missing {
            clauses.push(format!("{}.missing_since IS NULL", alias));
        }

        (clauses, params)
    }
}

/// What one upsert pass did to the store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertReport {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub marked_missing: usize,
}

impl UpsertReport {
    pub fn total(&self) -> usize {
        self.inserted + self.updated + self.unchanged
    }
}

/// One stored invocation joined with its component identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationRow {
    pub key: ComponentKey,
    pub session_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub duration_ms: Option<u64>,
    pub success: bool,
}
