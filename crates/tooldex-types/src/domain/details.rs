use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::component::ComponentKind;
use crate::redact::EnvVars;

/// Kind-specific payload of a component, one variant per kind.
///
/// The serialized form carries its own `kind` tag so the stored
/// `metadata_json` column is self-describing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ComponentDetails {
    Skill(SkillDetails),
    Plugin(PluginDetails),
    Command(CommandDetails),
    Hook(HookDetails),
    Mcp(McpDetails),
    Binary(BinaryDetails),
}

impl ComponentDetails {
    pub fn kind(&self) -> ComponentKind {
        match self {
            ComponentDetails::Skill(_) => ComponentKind::Skill,
            ComponentDetails::Plugin(_) => ComponentKind::Plugin,
            ComponentDetails::Command(_) => ComponentKind::Command,
            ComponentDetails::Hook(_) => ComponentKind::Hook,
            ComponentDetails::Mcp(_) => ComponentKind::Mcp,
            ComponentDetails::Binary(_) => ComponentKind::Binary,
        }
    }

    pub fn env_var_names(&self) -> Vec<String> {
        match self {
            ComponentDetails::Mcp(mcp) => mcp.env.names(),
            _ => Vec::new(),
        }
    }

    /// Empty payload for a kind, used when a record is known only by identity
    pub fn empty(kind: ComponentKind) -> Self {
        match kind {
            ComponentKind::Skill => ComponentDetails::Skill(SkillDetails::default()),
            ComponentKind::Plugin => ComponentDetails::Plugin(PluginDetails::default()),
            ComponentKind::Command => ComponentDetails::Command(CommandDetails::default()),
            ComponentKind::Hook => ComponentDetails::Hook(HookDetails::default()),
            ComponentKind::Mcp => ComponentDetails::Mcp(McpDetails::default()),
            ComponentKind::Binary => ComponentDetails::Binary(BinaryDetails::default()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillDetails {
    #[serde(default)]
    pub has_docs: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance_notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marketplace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installed_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_commit_sha: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub provides_commands: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub provides_mcps: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandDetails {
    /// Name of the plugin that ships this command, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_plugin: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HookDetails {
    /// Hook event the file is bound to (file stem, e.g. `post-tool-use`)
    #[serde(default)]
    pub trigger: String,
    #[serde(default)]
    pub language: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct McpDetails {
    #[serde(default)]
    pub command: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    /// Redacted on construction and on deserialization
    #[serde(default, skip_serializing_if = "EnvVars::is_empty")]
    pub env: EnvVars,
    #[serde(default = "default_transport")]
    pub transport: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_remote: Option<String>,
}

fn default_transport() -> String {
    "stdio".to_string()
}

impl McpDetails {
    pub fn new<I>(
        command: impl Into<String>,
        args: Vec<String>,
        env: I,
        transport: impl Into<String>,
    ) -> Self
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        Self {
            command: command.into(),
            args,
            env: EnvVars::from_raw(env),
            transport: transport.into(),
            git_remote: None,
        }
    }

    pub fn with_git_remote(mut self, remote: Option<String>) -> Self {
        self.git_remote = remote;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BinaryDetails {
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub is_executable: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_details_are_tagged_by_kind() {
        let details = ComponentDetails::Hook(HookDetails {
            trigger: "post-tool-use".into(),
            language: "python".into(),
        });
        let value = serde_json::to_value(&details).unwrap();
        assert_eq!(value["kind"], "hook");
        assert_eq!(value["trigger"], "post-tool-use");

        let back: ComponentDetails = serde_json::from_value(value).unwrap();
        assert_eq!(back.kind(), ComponentKind::Hook);
    }

    #[test]
    fn test_empty_matches_kind() {
        for kind in ComponentKind::ALL {
            assert_eq!(ComponentDetails::empty(kind).kind(), kind);
        }
    }

    #[test]
    fn test_mcp_env_never_serializes_literal() {
        let details = ComponentDetails::Mcp(McpDetails::new(
            "node",
            vec!["server.js".into()],
            [
                ("API_KEY".to_string(), json!("sk-live-abc123")),
                ("HOME_DIR".to_string(), json!("${HOME}")),
            ],
            "stdio",
        ));
        let out = serde_json::to_string(&details).unwrap();
        assert!(!out.contains("sk-live-abc123"));
        assert!(out.contains("${HOME}"));
        assert_eq!(details.env_var_names(), vec!["API_KEY", "HOME_DIR"]);
    }

    #[test]
    fn test_stored_payload_is_redacted_on_read() {
        let raw = json!({
            "kind": "mcp",
            "command": "npx",
            "env": {"SECRET": "plaintext"}
        });
        let details: ComponentDetails = serde_json::from_value(raw).unwrap();
        let out = serde_json::to_string(&details).unwrap();
        assert!(!out.contains("plaintext"));
    }
}
