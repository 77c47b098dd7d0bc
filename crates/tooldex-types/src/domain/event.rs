use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::component::{ComponentKey, ComponentKind, Platform};
use crate::{Error, Result};

/// One use of a component, as reported by the tracking hook.
///
/// `platform` is optional at this boundary: older hooks only know the
/// component's name and type, and the index resolves the rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ComponentKind,
    #[serde(default)]
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

fn default_success() -> bool {
    true
}

impl InvocationEvent {
    pub fn new(name: impl Into<String>, kind: ComponentKind, timestamp: DateTime<Utc>) -> Self {
        Self {
            platform: None,
            name: name.into(),
            kind,
            session_id: String::new(),
            timestamp,
            duration_ms: None,
            success: true,
            error_message: None,
        }
    }

    /// Build an event from a `type:name` reference; a bare name is a skill.
    pub fn from_reference(reference: &str, timestamp: DateTime<Utc>) -> Result<Self> {
        let reference: ComponentRef = reference.parse()?;
        Ok(Self::new(reference.name, reference.kind, timestamp))
    }

    pub fn on_platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn failed(mut self, message: impl Into<String>) -> Self {
        self.success = false;
        self.error_message = Some(message.into());
        self
    }
}

/// `type:name` reference as written by hooks and users
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentRef {
    pub kind: ComponentKind,
    pub name: String,
}

impl FromStr for ComponentRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (kind, name) = match s.split_once(':') {
            Some((kind, name)) => (kind.trim().parse()?, name.trim()),
            None => (ComponentKind::Skill, s),
        };
        if name.is_empty() {
            return Err(Error::InvalidReference(s.to_string()));
        }
        Ok(ComponentRef {
            kind,
            name: name.to_string(),
        })
    }
}

impl fmt::Display for ComponentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallEventKind {
    Install,
    Update,
    Remove,
}

impl InstallEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstallEventKind::Install => "install",
            InstallEventKind::Update => "update",
            InstallEventKind::Remove => "remove",
        }
    }
}

impl fmt::Display for InstallEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstallEventKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "install" => Ok(InstallEventKind::Install),
            "update" => Ok(InstallEventKind::Update),
            "remove" => Ok(InstallEventKind::Remove),
            _ => Err(Error::UnknownVariant {
                field: "installation event",
                value: s.to_string(),
            }),
        }
    }
}

/// Install/update/remove of a component at a point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallEvent {
    pub key: ComponentKey,
    pub kind: InstallEventKind,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}
