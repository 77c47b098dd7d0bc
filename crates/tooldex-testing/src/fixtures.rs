//! Writers for the on-disk layouts the platform parsers read.
//!
//! Every function takes the platform root (e.g. `<tmp>/.claude`) and
//! creates whatever parent directories it needs.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value, json};
use std::fs;
use std::path::{Path, PathBuf};

pub fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

fn read_json_object(path: &Path) -> Result<Map<String, Value>> {
    if !path.exists() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(&fs::read_to_string(path)?)? {
        Value::Object(map) => Ok(map),
        other => anyhow::bail!("{} holds {} instead of an object", path.display(), other),
    }
}

fn write_json(path: &Path, value: &Value) -> Result<()> {
    write_file(path, &serde_json::to_string_pretty(value)?)
}

fn env_object(env: &[(&str, &str)]) -> Value {
    Value::Object(
        env.iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect(),
    )
}

/// `skills/<dir>/SKILL.md` with `name` and `description` frontmatter
pub fn write_skill(root: &Path, dir: &str, name: &str, description: &str) -> Result<PathBuf> {
    let skill_dir = root.join("skills").join(dir);
    write_file(
        &skill_dir.join("SKILL.md"),
        &format!(
            "---\nname: {}\ndescription: {}\n---\n\n# {}\n\n{}\n",
            name, description, name, description
        ),
    )?;
    Ok(skill_dir)
}

/// `commands/<name>.md` with a description frontmatter
pub fn write_command(root: &Path, name: &str, description: &str) -> Result<PathBuf> {
    let path = root.join("commands").join(format!("{}.md", name));
    write_file(
        &path,
        &format!("---\ndescription: {}\n---\n\nRun {}.\n", description, name),
    )?;
    Ok(path)
}

/// `hooks/<file>` holding a shell script
pub fn write_hook(root: &Path, file: &str) -> Result<PathBuf> {
    let path = root.join("hooks").join(file);
    write_file(&path, "#!/bin/sh\nexit 0\n")?;
    Ok(path)
}

/// Add a server to the legacy `mcp.json` under a Claude root, keeping any
/// servers already present.
pub fn add_claude_mcp(root: &Path, name: &str, command: &str, env: &[(&str, &str)]) -> Result<()> {
    let path = root.join("mcp.json");
    let mut config = read_json_object(&path)?;

    let servers = config
        .entry("mcpServers")
        .or_insert_with(|| Value::Object(Map::new()));
    let Value::Object(servers) = servers else {
        anyhow::bail!("mcpServers in {} is not an object", path.display());
    };
    servers.insert(
        name.to_string(),
        json!({"command": command, "env": env_object(env)}),
    );

    write_json(&path, &Value::Object(config))
}

/// Add an `[mcp_servers.<name>]` table to a Codex `config.toml`
pub fn add_codex_mcp(root: &Path, name: &str, command: &str, env: &[(&str, &str)]) -> Result<()> {
    let path = root.join("config.toml");
    let mut config: toml::Table = if path.exists() {
        toml::from_str(&fs::read_to_string(&path)?)?
    } else {
        toml::Table::new()
    };

    let mut server = toml::Table::new();
    server.insert("command".into(), toml::Value::String(command.to_string()));
    if !env.is_empty() {
        let env: toml::Table = env
            .iter()
            .map(|(k, v)| (k.to_string(), toml::Value::String(v.to_string())))
            .collect();
        server.insert("env".into(), toml::Value::Table(env));
    }

    let servers = config
        .entry("mcp_servers")
        .or_insert_with(|| toml::Value::Table(toml::Table::new()));
    let toml::Value::Table(servers) = servers else {
        anyhow::bail!("mcp_servers in {} is not a table", path.display());
    };
    servers.insert(name.to_string(), toml::Value::Table(server));

    write_file(&path, &toml::to_string(&config)?)
}

/// Register a plugin in `plugins/installed_plugins.json` (v2 layout) and
/// give it a cache directory with a `.claude-plugin/plugin.json` manifest.
pub fn add_plugin(
    root: &Path,
    marketplace: &str,
    name: &str,
    version: &str,
    description: &str,
) -> Result<PathBuf> {
    let install = root
        .join("plugins/cache")
        .join(marketplace)
        .join(name)
        .join(version);
    write_json(
        &install.join(".claude-plugin/plugin.json"),
        &json!({"name": name, "version": version, "description": description}),
    )?;

    let registry_path = root.join("plugins/installed_plugins.json");
    let mut registry = read_json_object(&registry_path)?;
    registry.insert("version".into(), json!(2));
    let plugins = registry
        .entry("plugins")
        .or_insert_with(|| Value::Object(Map::new()));
    let Value::Object(plugins) = plugins else {
        anyhow::bail!("plugins in {} is not an object", registry_path.display());
    };
    plugins.insert(
        format!("{}@{}", name, marketplace),
        json!([{
            "installPath": install.to_string_lossy(),
            "version": version,
        }]),
    );
    write_json(&registry_path, &Value::Object(registry))?;

    Ok(install)
}

/// Pin a file's mtime so `last_modified` is deterministic
pub fn set_modified(path: &Path, ts: DateTime<Utc>) -> Result<()> {
    let mtime = filetime::FileTime::from_unix_time(ts.timestamp(), ts.timestamp_subsec_nanos());
    filetime::set_file_mtime(path, mtime)
        .with_context(|| format!("Failed to set mtime of {}", path.display()))
}
