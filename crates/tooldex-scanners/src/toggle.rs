//! Enabling and disabling components on disk.
//!
//! Files and directories move between their active location and a sibling
//! `.disabled/` directory. MCP servers move between the enabled and disabled
//! sections of the config that defines them. The parsers read both locations,
//! so the next scan reports the new status.

use regex::Regex;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tooldex_types::{ComponentKind, ComponentRecord, ComponentStatus, Origin, Platform};

use crate::claude::{MCP_DISABLED_KEY, MCP_ENABLED_KEY};
use crate::codex::{MCP_DISABLED_TABLE, MCP_ENABLED_TABLE};
use crate::{Error, Result};

const DISABLED_DIR: &str = ".disabled";

static CODEX_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[\s*(mcp_servers(?:_disabled)?)\.(.+?)\s*\]\s*(?:#.*)?$").expect("valid regex")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleOutcome {
    pub status: ComponentStatus,
    /// Files rewritten or the new location of a moved item
    pub changed: Vec<PathBuf>,
    pub message: String,
}

/// Flip an active component to disabled or a disabled one to active.
///
/// `root` is the platform root the component was scanned from.
pub fn toggle(record: &ComponentRecord, root: &Path) -> Result<ToggleOutcome> {
    let enable = match record.status {
        ComponentStatus::Active => false,
        ComponentStatus::Disabled => true,
        other => {
            return Err(Error::NotToggleable(format!(
                "{} is {}; only active or disabled components can be toggled",
                record.key(),
                other.as_str()
            )));
        }
    };
    if record.origin == Origin::Plugin {
        return Err(Error::NotToggleable(format!(
            "{} comes from a plugin; toggle the plugin instead",
            record.key()
        )));
    }

    let changed = match record.kind {
        ComponentKind::Skill
        | ComponentKind::Command
        | ComponentKind::Hook
        | ComponentKind::Binary => {
            let path = record
                .install_path
                .as_deref()
                .ok_or_else(|| Error::Toggle(format!("{} has no install path", record.key())))?;
            vec![move_item(path, enable)?]
        }
        ComponentKind::Mcp => match record.platform {
            Platform::Codex => {
                let config = root.join("config.toml");
                toggle_codex_server(&config, &record.name, enable)?;
                vec![config]
            }
            Platform::Claude => {
                if record.extra.get("config_source").and_then(Value::as_str) == Some("builtin") {
                    return Err(Error::NotToggleable(format!(
                        "{} is built in",
                        record.key()
                    )));
                }
                toggle_claude_server(root, &record.name, enable)?
            }
        },
        ComponentKind::Plugin => {
            return Err(Error::NotToggleable(format!(
                "{}: plugins are managed by the platform",
                record.key()
            )));
        }
    };

    let status = if enable {
        ComponentStatus::Active
    } else {
        ComponentStatus::Disabled
    };
    let message = format!(
        "{} {}",
        if enable { "Enabled" } else { "Disabled" },
        record.key()
    );
    tracing::info!(component = %record.key(), status = status.as_str(), "toggled component");

    Ok(ToggleOutcome {
        status,
        changed,
        message,
    })
}

/// Move `path` into or out of its sibling `.disabled/` directory
fn move_item(path: &Path, enable: bool) -> Result<PathBuf> {
    if !path.exists() {
        return Err(Error::Toggle(format!("{} does not exist", path.display())));
    }
    let (Some(parent), Some(name)) = (path.parent(), path.file_name()) else {
        return Err(Error::Toggle(format!("{} has no parent", path.display())));
    };

    let in_disabled = parent.file_name().is_some_and(|n| n == DISABLED_DIR);
    if enable && !in_disabled {
        return Err(Error::Toggle(format!("{} is already enabled", path.display())));
    }
    if !enable && in_disabled {
        return Err(Error::Toggle(format!("{} is already disabled", path.display())));
    }

    let target = match (enable, parent.parent()) {
        (true, Some(active)) => active.join(name),
        (true, None) => {
            return Err(Error::Toggle(format!("{} has no active location", path.display())));
        }
        (false, _) => parent.join(DISABLED_DIR).join(name),
    };
    if target.exists() {
        return Err(Error::Toggle(format!("{} already exists", target.display())));
    }

    if let Some(target_parent) = target.parent() {
        fs::create_dir_all(target_parent)?;
    }
    fs::rename(path, &target)?;
    Ok(target)
}

/// Rename the `[mcp_servers.<name>]` header (and its subtables) to the other
/// section, leaving the rest of the file byte for byte.
fn toggle_codex_server(config: &Path, name: &str, enable: bool) -> Result<()> {
    if !config.is_file() {
        return Err(Error::Toggle(format!("{} does not exist", config.display())));
    }
    let content = fs::read_to_string(config)?;

    let (from, to) = if enable {
        (MCP_DISABLED_TABLE, MCP_ENABLED_TABLE)
    } else {
        (MCP_ENABLED_TABLE, MCP_DISABLED_TABLE)
    };

    let mut headers = Vec::new();
    let mut exact = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let Some(caps) = CODEX_HEADER.captures(line.trim_end()) else {
            continue;
        };
        let key = caps[2].trim();
        let table = &caps[1];
        if let Some(server) = server_of(key, name) {
            headers.push((idx, table.to_string()));
            if server {
                exact.push(table.to_string());
            }
        }
    }

    match exact.as_slice() {
        [table] if table == from => {}
        [_] => {
            let state = if enable { "enabled" } else { "disabled" };
            return Err(Error::Toggle(format!("codex mcp '{}' is already {}", name, state)));
        }
        found => {
            return Err(Error::Toggle(format!(
                "expected one table for codex mcp '{}', found {}",
                name,
                found.len()
            )));
        }
    }

    let mut rewritten = String::with_capacity(content.len());
    for (idx, line) in content.split_inclusive('\n').enumerate() {
        if headers.iter().any(|(h, table)| *h == idx && table == from) {
            rewritten.push_str(&line.replacen(from, to, 1));
        } else {
            rewritten.push_str(line);
        }
    }
    fs::write(config, rewritten)?;
    Ok(())
}

/// `Some(true)` for the server's own table, `Some(false)` for one of its
/// subtables, `None` for anything else
fn server_of(raw_key: &str, name: &str) -> Option<bool> {
    let quoted = format!("\"{}\"", name);
    [name, quoted.as_str()].into_iter().find_map(|candidate| {
        if raw_key == candidate {
            Some(true)
        } else {
            raw_key
                .strip_prefix(candidate)
                .filter(|rest| rest.starts_with('.'))
                .map(|_| false)
        }
    })
}

/// Move the server between `mcpServers` and `mcpServersDisabled` in every
/// Claude config that defines it
fn toggle_claude_server(root: &Path, name: &str, enable: bool) -> Result<Vec<PathBuf>> {
    let mut candidates = Vec::new();
    if let Some(home) = root.parent() {
        candidates.push(home.join(".claude.json"));
    }
    candidates.push(root.join("mcp.json"));

    let mut changed = Vec::new();
    for path in candidates {
        if !path.is_file() {
            continue;
        }
        let mut data: Value = serde_json::from_str(&fs::read_to_string(&path)?)?;

        let mut moved = move_server(&mut data, name, enable);
        if let Some(projects) = data.get_mut("projects").and_then(Value::as_object_mut) {
            for project in projects.values_mut() {
                moved |= move_server(project, name, enable);
            }
        }

        if moved {
            fs::write(&path, serde_json::to_string_pretty(&data)? + "\n")?;
            changed.push(path);
        }
    }

    if changed.is_empty() {
        return Err(Error::Toggle(format!(
            "mcp '{}' not found in any Claude config",
            name
        )));
    }
    Ok(changed)
}

fn move_server(container: &mut Value, name: &str, enable: bool) -> bool {
    let Some(obj) = container.as_object_mut() else {
        return false;
    };
    let (from, to) = if enable {
        (MCP_DISABLED_KEY, MCP_ENABLED_KEY)
    } else {
        (MCP_ENABLED_KEY, MCP_DISABLED_KEY)
    };

    let Some(config) = obj
        .get_mut(from)
        .and_then(Value::as_object_mut)
        .and_then(|servers| servers.shift_remove(name))
    else {
        return false;
    };

    let target = obj
        .entry(to)
        .or_insert_with(|| Value::Object(Map::new()));
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Some(servers) = target.as_object_mut() {
        servers.insert(name.to_string(), config);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tooldex_types::{ComponentDetails, CommandDetails, McpDetails, SkillDetails};

    fn skill_at(path: &Path, status: ComponentStatus) -> ComponentRecord {
        ComponentRecord::new(
            Platform::Claude,
            "gmail",
            ComponentDetails::Skill(SkillDetails::default()),
        )
        .with_status(status)
        .with_install_path(path)
    }

    fn mcp(platform: Platform, name: &str, status: ComponentStatus) -> ComponentRecord {
        ComponentRecord::new(platform, name, ComponentDetails::Mcp(McpDetails::default()))
            .with_status(status)
    }

    #[test]
    fn test_skill_moves_to_disabled_and_back() {
        let tmp = tempfile::tempdir().unwrap();
        let skills = tmp.path().join("skills");
        fs::create_dir_all(skills.join("gmail")).unwrap();
        fs::write(skills.join("gmail/SKILL.md"), "# gmail\n").unwrap();

        let outcome = toggle(&skill_at(&skills.join("gmail"), ComponentStatus::Active), tmp.path())
            .unwrap();
        assert_eq!(outcome.status, ComponentStatus::Disabled);
        assert_eq!(outcome.changed, vec![skills.join(".disabled/gmail")]);
        assert!(skills.join(".disabled/gmail/SKILL.md").is_file());
        assert!(!skills.join("gmail").exists());

        let disabled = skill_at(&skills.join(".disabled/gmail"), ComponentStatus::Disabled);
        let outcome = toggle(&disabled, tmp.path()).unwrap();
        assert_eq!(outcome.status, ComponentStatus::Active);
        assert!(skills.join("gmail/SKILL.md").is_file());
    }

    #[test]
    fn test_move_refuses_to_overwrite() {
        let tmp = tempfile::tempdir().unwrap();
        let commands = tmp.path().join("commands");
        fs::create_dir_all(commands.join(".disabled")).unwrap();
        fs::write(commands.join("hello.md"), "new\n").unwrap();
        fs::write(commands.join(".disabled/hello.md"), "old\n").unwrap();

        let record = ComponentRecord::new(
            Platform::Claude,
            "hello",
            ComponentDetails::Command(CommandDetails::default()),
        )
        .with_install_path(commands.join("hello.md"));

        assert!(matches!(toggle(&record, tmp.path()), Err(Error::Toggle(_))));
        assert_eq!(fs::read_to_string(commands.join("hello.md")).unwrap(), "new\n");
    }

    #[test]
    fn test_unsupported_components() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("skills/gmail");

        let errored = skill_at(&path, ComponentStatus::Error);
        assert!(matches!(toggle(&errored, tmp.path()), Err(Error::NotToggleable(_))));

        let from_plugin = mcp(Platform::Claude, "plugin:notes:notes", ComponentStatus::Active)
            .with_origin(Origin::Plugin);
        assert!(matches!(toggle(&from_plugin, tmp.path()), Err(Error::NotToggleable(_))));

        let builtin = mcp(Platform::Claude, "claude-in-chrome", ComponentStatus::Active)
            .with_extra("config_source", json!("builtin"));
        assert!(matches!(toggle(&builtin, tmp.path()), Err(Error::NotToggleable(_))));

        let missing = skill_at(&path, ComponentStatus::Active);
        assert!(matches!(toggle(&missing, tmp.path()), Err(Error::Toggle(_))));
    }

    #[test]
    fn test_codex_table_renamed_with_subtables() {
        let tmp = tempfile::tempdir().unwrap();
        let config = tmp.path().join("config.toml");
        fs::write(
            &config,
            "model = \"o4\"\n\n[mcp_servers.github]\ncommand = \"npx\"\n\n[mcp_servers.github.env]\nTOKEN = \"${GITHUB_TOKEN}\"\n\n[mcp_servers.github-enterprise]\ncommand = \"ghe\"\n",
        )
        .unwrap();

        toggle(&mcp(Platform::Codex, "github", ComponentStatus::Active), tmp.path()).unwrap();

        let content = fs::read_to_string(&config).unwrap();
        assert!(content.contains("[mcp_servers_disabled.github]\n"));
        assert!(content.contains("[mcp_servers_disabled.github.env]\n"));
        assert!(content.contains("[mcp_servers.github-enterprise]\n"));
        assert!(content.starts_with("model = \"o4\"\n"));

        let table: toml::Table = toml::from_str(&content).unwrap();
        assert!(table["mcp_servers_disabled"]["github"]["env"].get("TOKEN").is_some());

        let again = toggle(&mcp(Platform::Codex, "github", ComponentStatus::Active), tmp.path());
        assert!(matches!(again, Err(Error::Toggle(_))));

        toggle(&mcp(Platform::Codex, "github", ComponentStatus::Disabled), tmp.path()).unwrap();
        assert!(fs::read_to_string(&config).unwrap().contains("[mcp_servers.github]\n"));
    }

    #[test]
    fn test_claude_server_moves_in_user_and_project_configs() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join(".claude");
        fs::create_dir_all(&root).unwrap();
        let user_config = tmp.path().join(".claude.json");
        fs::write(
            &user_config,
            serde_json::to_string(&json!({
                "theme": "dark",
                "mcpServers": {"slack": {"command": "uvx"}, "github": {"command": "npx"}},
                "projects": {"/work": {"mcpServers": {"slack": {"command": "uvx"}}}}
            }))
            .unwrap(),
        )
        .unwrap();

        let outcome =
            toggle(&mcp(Platform::Claude, "slack", ComponentStatus::Active), &root).unwrap();
        assert_eq!(outcome.changed, vec![user_config.clone()]);

        let data: Value = serde_json::from_str(&fs::read_to_string(&user_config).unwrap()).unwrap();
        assert!(data["mcpServers"].get("slack").is_none());
        assert_eq!(data["mcpServersDisabled"]["slack"]["command"], "uvx");
        assert_eq!(data["projects"]["/work"]["mcpServersDisabled"]["slack"]["command"], "uvx");
        let keys: Vec<_> = data.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys[0], "theme");

        let unknown = toggle(&mcp(Platform::Claude, "nope", ComponentStatus::Active), &root);
        assert!(matches!(unknown, Err(Error::Toggle(_))));
    }
}
