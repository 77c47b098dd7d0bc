//! Shared interpretation of an MCP server definition.
//!
//! Claude's JSON files and Codex's `config.toml` describe servers with the
//! same fields (`command`, `args`, `env`, `url`, `transport`/`type`), so both
//! parsers convert their entries to JSON and build records here.

use serde_json::Value;
use std::path::Path;
use tooldex_types::{ComponentDetails, ComponentRecord, McpDetails, Origin, Platform};

use crate::traits::modified_utc;
use crate::{Error, Result, fs as scan_fs};

/// Which configuration file a server definition came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    /// `~/.claude.json` top-level `mcpServers`
    User,
    /// `~/.claude.json` `projects[<root>].mcpServers`
    Local,
    /// A plugin's `.mcp.json` or `plugin.json`
    Plugin,
    /// `<root>/mcp.json`
    Legacy,
    /// Shipped with the platform itself
    Builtin,
    /// `[mcp_servers.*]` in a Codex `config.toml`
    Codex,
}

impl ConfigSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigSource::User => "user",
            ConfigSource::Local => "local",
            ConfigSource::Plugin => "plugin",
            ConfigSource::Legacy => "legacy",
            ConfigSource::Builtin => "builtin",
            ConfigSource::Codex => "codex",
        }
    }
}

pub fn server_record(
    platform: Platform,
    name: &str,
    config: &Value,
    config_path: &Path,
    source: ConfigSource,
) -> Result<ComponentRecord> {
    let Some(obj) = config.as_object() else {
        return Err(Error::Parse(format!(
            "MCP server '{}' is not a table/object",
            name
        )));
    };

    let url = obj.get("url").and_then(Value::as_str).filter(|u| !u.is_empty());
    let command = url
        .or_else(|| obj.get("command").and_then(Value::as_str))
        .unwrap_or_default()
        .to_string();
    let transport = if url.is_some() {
        "http".to_string()
    } else {
        obj.get("transport")
            .or_else(|| obj.get("type"))
            .and_then(Value::as_str)
            .unwrap_or("stdio")
            .to_string()
    };

    let args: Vec<String> = match obj.get("args") {
        Some(Value::Array(items)) => items.iter().map(value_to_arg).collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => vec![value_to_arg(other)],
    };
    let env: Vec<(String, Value)> = match obj.get("env") {
        Some(Value::Object(map)) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        _ => Vec::new(),
    };

    let origin = detect_origin(name, &command, source);
    let install_path = if !command.is_empty() && !command.starts_with("http") {
        scan_fs::expand_home(&command)
    } else {
        config_path.to_path_buf()
    };
    let git_remote = if command.starts_with('/') || command.starts_with('~') {
        scan_fs::git_remote(&install_path)
    } else {
        None
    };

    let details = McpDetails::new(command, args, env, transport).with_git_remote(git_remote);
    Ok(
        ComponentRecord::new(platform, name, ComponentDetails::Mcp(details))
            .with_origin(origin)
            .with_install_path(install_path)
            .with_last_modified(modified_utc(config_path))
            .with_extra("config_source", Value::String(source.as_str().to_string())),
    )
}

fn value_to_arg(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub fn detect_origin(name: &str, command: &str, source: ConfigSource) -> Origin {
    match source {
        ConfigSource::Plugin => return Origin::Plugin,
        ConfigSource::Local => return Origin::Local,
        ConfigSource::Builtin => return Origin::Official,
        ConfigSource::Codex => return Origin::InHouse,
        ConfigSource::User | ConfigSource::Legacy => {}
    }

    let name = name.to_lowercase();
    if name.contains("anthropic") || name.contains("claude") {
        Origin::Official
    } else if command.to_lowercase().contains("modelcontextprotocol") {
        Origin::Community
    } else if command.starts_with('/') || command.starts_with('~') {
        Origin::InHouse
    } else {
        Origin::External
    }
}

/// Replace `${CLAUDE_PLUGIN_ROOT}` in every string of a plugin's config
pub fn resolve_plugin_root(value: &mut Value, plugin_root: &Path) {
    const VAR: &str = "${CLAUDE_PLUGIN_ROOT}";
    match value {
        Value::String(s) if s.contains(VAR) => {
            *s = s.replace(VAR, &plugin_root.to_string_lossy());
        }
        Value::Array(items) => items
            .iter_mut()
            .for_each(|v| resolve_plugin_root(v, plugin_root)),
        Value::Object(map) => map
            .values_mut()
            .for_each(|v| resolve_plugin_root(v, plugin_root)),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stdio_server() {
        let config = json!({
            "command": "npx",
            "args": ["-y", "@modelcontextprotocol/server-github", 3],
            "env": {"GITHUB_TOKEN": "ghp_live"}
        });
        let record = server_record(
            Platform::Claude,
            "github",
            &config,
            Path::new("/tmp/mcp.json"),
            ConfigSource::User,
        )
        .unwrap();

        let ComponentDetails::Mcp(mcp) = &record.details else {
            panic!("expected mcp details");
        };
        assert_eq!(mcp.command, "npx");
        assert_eq!(mcp.args, vec!["-y", "@modelcontextprotocol/server-github", "3"]);
        assert_eq!(mcp.transport, "stdio");
        assert_eq!(record.env_vars, vec!["GITHUB_TOKEN"]);
        assert_eq!(record.origin, Origin::External);
        assert!(!serde_json::to_string(&record).unwrap().contains("ghp_live"));
    }

    #[test]
    fn test_http_server_uses_url() {
        let config = json!({"type": "sse", "url": "https://mcp.example.com"});
        let record = server_record(
            Platform::Claude,
            "remote",
            &config,
            Path::new("/tmp/.claude.json"),
            ConfigSource::User,
        )
        .unwrap();
        let ComponentDetails::Mcp(mcp) = &record.details else {
            panic!("expected mcp details");
        };
        assert_eq!(mcp.transport, "http");
        assert_eq!(mcp.command, "https://mcp.example.com");
        assert_eq!(
            record.install_path.as_deref(),
            Some(Path::new("/tmp/.claude.json"))
        );
    }

    #[test]
    fn test_local_command_records_git_remote() {
        let tmp = tempfile::tempdir().unwrap();
        let repo = tmp.path().join("repo");
        std::fs::create_dir_all(repo.join(".git")).unwrap();
        std::fs::create_dir_all(repo.join("bin")).unwrap();
        std::fs::write(
            repo.join(".git/config"),
            "[remote \"origin\"]\n    url = https://example.com/repo.git\n",
        )
        .unwrap();
        let command = repo.join("bin/server");
        std::fs::write(&command, "#!/usr/bin/env bash\necho hi\n").unwrap();

        let config = json!({"command": command.to_string_lossy(), "args": [], "env": {}});
        let record = server_record(
            Platform::Claude,
            "git-mcp",
            &config,
            &tmp.path().join(".claude.json"),
            ConfigSource::User,
        )
        .unwrap();

        let ComponentDetails::Mcp(mcp) = &record.details else {
            panic!("expected mcp details");
        };
        assert_eq!(mcp.git_remote.as_deref(), Some("https://example.com/repo.git"));
        assert_eq!(record.origin, Origin::InHouse);
    }

    #[test]
    fn test_non_object_is_error() {
        let err = server_record(
            Platform::Codex,
            "bad",
            &json!("npx"),
            Path::new("/tmp/config.toml"),
            ConfigSource::Codex,
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_origin_heuristics() {
        assert_eq!(detect_origin("x", "", ConfigSource::Plugin), Origin::Plugin);
        assert_eq!(detect_origin("x", "", ConfigSource::Local), Origin::Local);
        assert_eq!(
            detect_origin("claude-tools", "npx", ConfigSource::User),
            Origin::Official
        );
        assert_eq!(
            detect_origin("fs", "/opt/mcp/fs", ConfigSource::Legacy),
            Origin::InHouse
        );
        assert_eq!(detect_origin("fs", "uvx", ConfigSource::User), Origin::External);
    }

    #[test]
    fn test_resolve_plugin_root() {
        let mut config = json!({
            "command": "${CLAUDE_PLUGIN_ROOT}/server",
            "args": ["--root", "${CLAUDE_PLUGIN_ROOT}"],
            "env": {"DATA": "${CLAUDE_PLUGIN_ROOT}/data"}
        });
        resolve_plugin_root(&mut config, Path::new("/p"));
        assert_eq!(config["command"], "/p/server");
        assert_eq!(config["args"][1], "/p");
        assert_eq!(config["env"]["DATA"], "/p/data");
    }
}
