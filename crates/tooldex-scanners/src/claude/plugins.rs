use chrono::{DateTime, Utc};
use serde_json::{Map, Value, json};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::Path;
use tooldex_types::{
    ComponentDetails, ComponentKind, ComponentRecord, ComponentStatus, Origin, PluginDetails,
    redact,
};

use super::plugin_cache;
use crate::traits::{ComponentParser, ParseOutput, ScanContext};
use crate::{Error, Result, fs as scan_fs};

const OFFICIAL_MARKETPLACES: &[&str] = &["claude-plugins-official", "claude-code-plugins"];
const COMMUNITY_MARKETPLACES: &[&str] = &[
    "superpowers-marketplace",
    "awesome-claude-skills",
    "cc-marketplace",
];

/// `<root>/plugins/installed_plugins.json`, enriched from the plugin cache
pub struct PluginParser;

impl ComponentParser for PluginParser {
    fn name(&self) -> &'static str {
        "plugins"
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::Plugin
    }

    fn parse(&self, ctx: &ScanContext) -> Result<ParseOutput> {
        let plugins_dir = ctx.join("plugins");
        let installed = plugins_dir.join("installed_plugins.json");
        let mut output = ParseOutput::default();
        if !installed.is_file() {
            return Ok(output);
        }

        let data: Value = serde_json::from_str(&fs::read_to_string(&installed)?)?;
        let entries = installed_entries(&data)?;
        let cache = CacheIndex::build(&plugins_dir.join("cache"), &mut output.errors);

        for (key, value) in entries {
            let (name, marketplace) = match key.rsplit_once('@') {
                Some((name, marketplace)) => (name, marketplace),
                None => (key.as_str(), "unknown"),
            };

            // Several scopes may list the same plugin; the last one wins
            let entry = match value {
                Value::Array(items) => items.last(),
                Value::Object(_) => Some(value),
                _ => None,
            };
            match entry.and_then(Value::as_object) {
                Some(entry) => {
                    output.push(plugin_record(ctx, name, marketplace, entry, cache.get(name)))
                }
                None => {
                    let record = ComponentRecord::errored(
                        ctx.platform,
                        name,
                        ComponentDetails::Plugin(PluginDetails::default()),
                        "unrecognized plugin entry",
                    );
                    output.push_failed(record, format!("plugin '{}': unrecognized entry", key));
                }
            }
        }

        Ok(output)
    }
}

/// v1 is a flat `{key: entry}` map; v2 wraps it as `{version: 2, plugins}`
fn installed_entries(data: &Value) -> Result<&Map<String, Value>> {
    let version = data.get("version").and_then(Value::as_u64).unwrap_or(1);
    let plugins = if version >= 2 {
        data.get("plugins")
    } else {
        Some(data)
    };
    plugins
        .and_then(Value::as_object)
        .ok_or_else(|| Error::Parse("installed_plugins.json has no plugin map".to_string()))
}

fn plugin_record(
    ctx: &ScanContext,
    name: &str,
    marketplace: &str,
    entry: &Map<String, Value>,
    cache: Option<&CacheMeta>,
) -> ComponentRecord {
    let text = |key: &str| {
        entry
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let install_path = text("installPath").map(|p| scan_fs::expand_home(&p));
    let installed_at = text("installedAt");
    let last_modified = text("lastUpdated")
        .or_else(|| installed_at.clone())
        .and_then(|ts| parse_rfc3339(&ts));

    let mut details = PluginDetails {
        marketplace: Some(marketplace.to_string()),
        installed_at,
        git_commit_sha: text("gitCommitSha"),
        ..PluginDetails::default()
    };
    if let Some(cache) = cache {
        details.provides_commands = cache.provides_commands.iter().cloned().collect();
        details.provides_mcps = cache.provides_mcps.iter().cloned().collect();
    }

    let mut record = ComponentRecord::new(ctx.platform, name, ComponentDetails::Plugin(details))
        .with_version(text("version"))
        .with_origin(origin_for_marketplace(marketplace))
        .with_last_modified(last_modified);

    if let Some(cache) = cache {
        record = record.with_description(cache.description.clone().unwrap_or_default());
        for (key, value) in &cache.about {
            record = record.with_extra(key.clone(), json!(value));
        }
        if !cache.commands_detail.is_empty() {
            record = record.with_extra("commands_detail", json!(cache.commands_detail));
        }
        if !cache.mcps_detail.is_empty() {
            record = record.with_extra("mcps_detail", json!(cache.mcps_detail));
        }
    }

    match install_path {
        Some(path) if path.exists() => record.with_install_path(path),
        Some(path) => {
            record.status = ComponentStatus::Error;
            record.error_message = Some(format!("install path missing: {}", path.display()));
            record.with_install_path(path)
        }
        None => {
            record.status = ComponentStatus::Error;
            record.error_message = Some("no install path recorded".to_string());
            record
        }
    }
}

fn parse_rfc3339(ts: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(ts)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

pub fn origin_for_marketplace(marketplace: &str) -> Origin {
    if OFFICIAL_MARKETPLACES.contains(&marketplace) {
        Origin::Official
    } else if COMMUNITY_MARKETPLACES.contains(&marketplace) {
        Origin::Community
    } else if marketplace.starts_with("local-") || marketplace == "custom" {
        Origin::InHouse
    } else {
        Origin::External
    }
}

#[derive(Debug, Default)]
struct CacheMeta {
    description: Option<String>,
    /// author, homepage, repository, license
    about: BTreeMap<String, String>,
    provides_commands: BTreeSet<String>,
    provides_mcps: BTreeSet<String>,
    commands_detail: BTreeMap<String, String>,
    mcps_detail: BTreeMap<String, Value>,
}

/// Per-plugin metadata gathered from `plugin.json` and `.mcp.json` files
struct CacheIndex(HashMap<String, CacheMeta>);

impl CacheIndex {
    fn build(cache_dir: &Path, errors: &mut Vec<String>) -> Self {
        let mut index: HashMap<String, CacheMeta> = HashMap::new();

        for manifest in plugin_cache::plugin_json_files(cache_dir) {
            let Some(data) = read_json(&manifest, errors) else {
                continue;
            };
            let Some(plugin) = plugin_cache::plugin_name_for_manifest(&manifest, &data) else {
                continue;
            };
            let meta = index.entry(plugin.clone()).or_default();

            if let Some(desc) = non_empty(data.get("description")) {
                meta.description = Some(desc);
            }
            for key in ["author", "homepage", "license"] {
                if let Some(value) = non_empty(data.get(key)) {
                    meta.about.insert(key.to_string(), value);
                }
            }
            let repository = data.get("repository");
            if let Some(url) = non_empty(repository).or_else(|| non_empty(repository.and_then(|r| r.get("url")))) {
                meta.about.insert("repository".to_string(), url);
            }

            for (command, description) in command_details(data.get("commands")) {
                meta.provides_commands.insert(command.clone());
                meta.commands_detail.insert(command, description);
            }
            if let Some(servers) = data.get("mcpServers").and_then(Value::as_object) {
                add_mcps(meta, &plugin, servers);
            }
        }

        for mcp_json in plugin_cache::mcp_json_files(cache_dir) {
            let Some(data) = read_json(&mcp_json, errors) else {
                continue;
            };
            let Some(plugin) = mcp_json.parent().and_then(plugin_cache::plugin_name_for_dir)
            else {
                continue;
            };
            if let Some(servers) = plugin_cache::servers_of(&data) {
                add_mcps(index.entry(plugin.clone()).or_default(), &plugin, servers);
            }
        }

        CacheIndex(index)
    }

    fn get(&self, plugin: &str) -> Option<&CacheMeta> {
        self.0.get(plugin)
    }
}

fn read_json(path: &Path, errors: &mut Vec<String>) -> Option<Value> {
    let parsed = fs::read_to_string(path)
        .map_err(Error::from)
        .and_then(|c| serde_json::from_str(&c).map_err(Error::from));
    match parsed {
        Ok(value) => Some(value),
        Err(err) => {
            errors.push(format!("{}: {}", path.display(), err));
            None
        }
    }
}

fn non_empty(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// `commands` may be a map of name to config or a list of names/objects
fn command_details(commands: Option<&Value>) -> Vec<(String, String)> {
    let describe = |cfg: &Value| {
        non_empty(cfg.get("description"))
            .or_else(|| non_empty(cfg.get("help")))
            .unwrap_or_default()
    };
    match commands {
        Some(Value::Object(map)) => map.iter().map(|(k, v)| (k.clone(), describe(v))).collect(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(name) => Some((name.clone(), String::new())),
                Value::Object(_) => non_empty(item.get("name")).map(|n| (n, describe(item))),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn add_mcps(meta: &mut CacheMeta, plugin: &str, servers: &Map<String, Value>) {
    for (server, cfg) in servers {
        meta.provides_mcps
            .insert(plugin_cache::qualified_mcp_name(plugin, server));

        let Some(cfg) = cfg.as_object() else {
            continue;
        };
        let command = non_empty(cfg.get("command"))
            .or_else(|| non_empty(cfg.get("url")))
            .unwrap_or_default();
        let transport = non_empty(cfg.get("transport"))
            .or_else(|| non_empty(cfg.get("type")))
            .unwrap_or_else(|| {
                if cfg.contains_key("url") { "http" } else { "stdio" }.to_string()
            });
        let args_count = match cfg.get("args") {
            Some(Value::Array(a)) => a.len(),
            Some(Value::Null) | None => 0,
            Some(_) => 1,
        };
        let env = redact::EnvVars::from_raw(
            cfg.get("env")
                .and_then(Value::as_object)
                .into_iter()
                .flatten()
                .map(|(k, v)| (k.clone(), v.clone())),
        );

        meta.mcps_detail.insert(
            server.clone(),
            json!({
                "command": command,
                "transport": transport,
                "args_count": args_count,
                "env_keys": env.names(),
                "env_placeholders": env.placeholder_names(),
            }),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::ScanConfig;
    use tooldex_types::Platform;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_v2_layout_with_cache_metadata() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        let install = root.join("plugins/cache/claude-plugins-official/review/1.0.0");
        fs::create_dir_all(&install).unwrap();

        write(
            &root.join("plugins/installed_plugins.json"),
            &serde_json::to_string(&json!({
                "version": 2,
                "plugins": {
                    "review@claude-plugins-official": [{
                        "installPath": install.to_string_lossy(),
                        "version": "1.0.0",
                        "installedAt": "2025-01-01T00:00:00Z",
                        "lastUpdated": "2025-02-01T00:00:00Z",
                        "gitCommitSha": "abc123"
                    }],
                    "ghost@somewhere": [{"installPath": "/nonexistent/ghost"}]
                }
            }))
            .unwrap(),
        );
        write(
            &install.join(".claude-plugin/plugin.json"),
            r#"{"name": "review", "description": "Code review helpers",
                "commands": {"review-pr": {"description": "Review a PR"}},
                "mcpServers": {"gh": {"command": "gh-mcp", "env": {"GH_TOKEN": "secret"}}}}"#,
        );

        let ctx = ScanContext::new(Platform::Claude, root, ScanConfig::default());
        let output = PluginParser.parse(&ctx).unwrap();
        assert!(output.errors.is_empty(), "{:?}", output.errors);
        assert_eq!(output.records.len(), 2);

        let review = output.records.iter().find(|r| r.name == "review").unwrap();
        assert_eq!(review.origin, Origin::Official);
        assert_eq!(review.status, ComponentStatus::Active);
        assert_eq!(review.version.as_deref(), Some("1.0.0"));
        assert_eq!(review.description.as_deref(), Some("Code review helpers"));
        let ComponentDetails::Plugin(details) = &review.details else {
            panic!("expected plugin details");
        };
        assert_eq!(details.provides_commands, vec!["review-pr"]);
        assert_eq!(details.provides_mcps, vec!["plugin:review:gh"]);
        assert!(!serde_json::to_string(review).unwrap().contains("secret"));

        let ghost = output.records.iter().find(|r| r.name == "ghost").unwrap();
        assert_eq!(ghost.status, ComponentStatus::Error);
        assert_eq!(ghost.origin, Origin::External);
    }

    #[test]
    fn test_v1_flat_layout() {
        let tmp = tempfile::tempdir().unwrap();
        write(
            &tmp.path().join("plugins/installed_plugins.json"),
            r#"{"tool@local-dev": {"installPath": "/nope", "version": "0.1"}}"#,
        );
        let ctx = ScanContext::new(Platform::Claude, tmp.path(), ScanConfig::default());
        let output = PluginParser.parse(&ctx).unwrap();
        assert_eq!(output.records.len(), 1);
        assert_eq!(output.records[0].name, "tool");
        assert_eq!(output.records[0].origin, Origin::InHouse);
    }

    #[test]
    fn test_corrupt_file_fails_parser() {
        let tmp = tempfile::tempdir().unwrap();
        write(&tmp.path().join("plugins/installed_plugins.json"), "[1, 2");
        let ctx = ScanContext::new(Platform::Claude, tmp.path(), ScanConfig::default());
        assert!(PluginParser.parse(&ctx).is_err());
    }
}
