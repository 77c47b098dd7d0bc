use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use super::details::ComponentDetails;
use crate::redact;
use crate::{Error, Result};

/// Component kind (closed set)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Skill,
    Plugin,
    Command,
    Hook,
    Mcp,
    Binary,
}

impl ComponentKind {
    pub const ALL: [ComponentKind; 6] = [
        ComponentKind::Skill,
        ComponentKind::Plugin,
        ComponentKind::Command,
        ComponentKind::Hook,
        ComponentKind::Mcp,
        ComponentKind::Binary,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::Skill => "skill",
            ComponentKind::Plugin => "plugin",
            ComponentKind::Command => "command",
            ComponentKind::Hook => "hook",
            ComponentKind::Mcp => "mcp",
            ComponentKind::Binary => "binary",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ComponentKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| Error::UnknownVariant {
                field: "component type",
                value: s.to_string(),
            })
    }
}

/// Tool ecosystem whose root directory is indexed
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Claude,
    Codex,
}

impl Platform {
    pub const ALL: [Platform; 2] = [Platform::Claude, Platform::Codex];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Claude => "claude",
            Platform::Codex => "codex",
        }
    }

    /// Conventional root directory name under the user's home
    pub fn default_dir_name(&self) -> &'static str {
        match self {
            Platform::Claude => ".claude",
            Platform::Codex => ".codex",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "claude" | "claude_code" => Ok(Platform::Claude),
            "codex" => Ok(Platform::Codex),
            _ => Err(Error::UnknownVariant {
                field: "platform",
                value: s.to_string(),
            }),
        }
    }
}

/// Where a component came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Origin {
    /// Written by the user
    InHouse,
    /// Shipped by the platform vendor
    Official,
    /// Third-party, from a community marketplace
    Community,
    /// Third-party, from anywhere else
    External,
    /// Provided by an installed plugin
    Plugin,
    /// Scoped to a single project
    Local,
    #[default]
    Unknown,
}

impl Origin {
    const ALL: [Origin; 7] = [
        Origin::InHouse,
        Origin::Official,
        Origin::Community,
        Origin::External,
        Origin::Plugin,
        Origin::Local,
        Origin::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::InHouse => "in-house",
            Origin::Official => "official",
            Origin::Community => "community",
            Origin::External => "external",
            Origin::Plugin => "plugin",
            Origin::Local => "local",
            Origin::Unknown => "unknown",
        }
    }

    pub fn is_first_party(&self) -> bool {
        matches!(self, Origin::InHouse | Origin::Local)
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Origin {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Origin::ALL
            .into_iter()
            .find(|o| o.as_str() == s)
            .ok_or_else(|| Error::UnknownVariant {
                field: "origin",
                value: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ComponentStatus {
    #[default]
    Active,
    /// Known but intentionally switched off (e.g. lives under `.disabled/`)
    Disabled,
    /// Discovered but could not be read or is broken
    Error,
}

impl ComponentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentStatus::Active => "active",
            ComponentStatus::Disabled => "disabled",
            ComponentStatus::Error => "error",
        }
    }
}

impl fmt::Display for ComponentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "active" => Ok(ComponentStatus::Active),
            "disabled" => Ok(ComponentStatus::Disabled),
            "error" => Ok(ComponentStatus::Error),
            _ => Err(Error::UnknownVariant {
                field: "status",
                value: s.to_string(),
            }),
        }
    }
}

/// Composite identity of a component: `(platform, name, type)`.
///
/// Field order gives the deterministic tie-break order used by rankings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ComponentKey {
    pub platform: Platform,
    pub name: String,
    pub kind: ComponentKind,
}

impl ComponentKey {
    pub fn new(platform: Platform, name: impl Into<String>, kind: ComponentKind) -> Self {
        Self {
            platform,
            name: name.into(),
            kind,
        }
    }
}

impl fmt::Display for ComponentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.platform, self.kind, self.name)
    }
}

/// One discovered component, the unit of indexing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentRecord {
    pub platform: Platform,
    pub name: String,
    pub kind: ComponentKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub origin: Origin,
    #[serde(default)]
    pub status: ComponentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,

    /// Kind-specific payload
    pub details: ComponentDetails,

    /// Names (never values) of environment variables the component declares
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env_vars: Vec<String>,

    /// Open-ended display data; never interpreted by the index
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,

    /// Set when the component was found but could not be parsed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ComponentRecord {
    /// New active record with the details payload's kind
    pub fn new(platform: Platform, name: impl Into<String>, details: ComponentDetails) -> Self {
        let kind = details.kind();
        let mut record = Self {
            platform,
            name: name.into(),
            kind,
            description: None,
            version: None,
            origin: Origin::Unknown,
            status: ComponentStatus::Active,
            install_path: None,
            size_bytes: None,
            line_count: None,
            file_count: None,
            last_modified: None,
            details,
            env_vars: Vec::new(),
            extra: BTreeMap::new(),
            error_message: None,
        };
        record.env_vars = record.details.env_var_names();
        record
    }

    /// Record for an item that was found but failed to parse
    pub fn errored(
        platform: Platform,
        name: impl Into<String>,
        details: ComponentDetails,
        message: impl Into<String>,
    ) -> Self {
        let mut record = Self::new(platform, name, details);
        record.status = ComponentStatus::Error;
        record.error_message = Some(message.into());
        record
    }

    pub fn key(&self) -> ComponentKey {
        ComponentKey::new(self.platform, self.name.clone(), self.kind)
    }

    /// A record is structurally valid when every identity component is present
    pub fn has_valid_identity(&self) -> bool {
        !self.name.trim().is_empty() && self.details.kind() == self.kind
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        let description = description.into();
        if !description.trim().is_empty() {
            self.description = Some(description.trim().to_string());
        }
        self
    }

    pub fn with_version(mut self, version: Option<String>) -> Self {
        self.version = version.filter(|v| !v.trim().is_empty());
        self
    }

    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_status(mut self, status: ComponentStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_install_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.install_path = Some(path.into());
        self
    }

    pub fn with_last_modified(mut self, ts: Option<DateTime<Utc>>) -> Self {
        self.last_modified = ts;
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Apply the persistence redaction policy.
    ///
    /// Env names are recomputed from the details and any `env`/`environment`
    /// objects inside `extra` lose their values.
    pub fn redacted(mut self) -> Self {
        let mut names = self.details.env_var_names();
        for (key, value) in self.extra.iter_mut() {
            if redact::is_env_key(key) {
                names.extend(redact::scrub_env_object(value));
            } else {
                names.extend(redact::scrub_value(value));
            }
        }
        names.extend(self.env_vars.drain(..));
        names.sort();
        names.dedup();
        self.env_vars = names;
        self
    }
}
