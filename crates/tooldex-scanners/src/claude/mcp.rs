use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tooldex_types::{ComponentDetails, ComponentKind, ComponentRecord, ComponentStatus, McpDetails};

use super::plugin_cache;
use crate::mcp_config::{self, ConfigSource};
use crate::traits::{ComponentParser, ParseOutput, ScanContext, modified_utc};
use crate::{Error, Result};

const USER_CONFIG: &str = ".claude.json";
pub(crate) const MCP_ENABLED_KEY: &str = "mcpServers";
pub(crate) const MCP_DISABLED_KEY: &str = "mcpServersDisabled";
const CHROME_HOST: &str = "chrome/chrome-native-host";

/// MCP servers from every Claude configuration location.
///
/// Sources in precedence order: user-level `mcpServers`, project entry for
/// the root, plugin cache, legacy `<root>/mcp.json`, `mcpServersDisabled`
/// sections, built-ins. The first definition of a name wins.
pub struct ClaudeMcpParser;

impl ComponentParser for ClaudeMcpParser {
    fn name(&self) -> &'static str {
        "mcp"
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::Mcp
    }

    fn parse(&self, ctx: &ScanContext) -> Result<ParseOutput> {
        let mut scan = McpScan {
            ctx,
            seen: HashSet::new(),
            output: ParseOutput::default(),
        };

        let user_config = ctx.root.parent().map(|p| p.join(USER_CONFIG));
        let user_data = user_config.as_deref().and_then(|path| scan.read_json(path));
        let project_key = ctx.root.to_string_lossy();
        let project = user_data
            .as_ref()
            .and_then(|data| data.get("projects"))
            .and_then(|p| p.get(project_key.as_ref()));

        if let (Some(path), Some(data)) = (user_config.as_deref(), user_data.as_ref()) {
            if let Some(servers) = servers_in(data, MCP_ENABLED_KEY) {
                scan.add_servers(servers, path, ConfigSource::User, None);
            }
            if let Some(servers) = project.and_then(|p| servers_in(p, MCP_ENABLED_KEY)) {
                scan.add_servers(servers, path, ConfigSource::Local, None);
            }
        }

        let cache_dir = ctx.join("plugins/cache");
        for mcp_json in plugin_cache::mcp_json_files(&cache_dir) {
            let Some(data) = scan.read_json(&mcp_json) else {
                continue;
            };
            let Some(plugin_dir) = mcp_json.parent() else {
                continue;
            };
            let Some(plugin) = plugin_cache::plugin_name_for_dir(plugin_dir) else {
                continue;
            };
            if let Some(servers) = plugin_cache::servers_of(&data) {
                scan.add_servers(
                    servers,
                    &mcp_json,
                    ConfigSource::Plugin,
                    Some((plugin.as_str(), plugin_dir)),
                );
            }
        }
        for manifest in plugin_cache::plugin_json_files(&cache_dir) {
            let Some(data) = scan.read_json(&manifest) else {
                continue;
            };
            let Some(plugin_root) = manifest.parent().and_then(Path::parent) else {
                continue;
            };
            let Some(plugin) = plugin_cache::plugin_name_for_manifest(&manifest, &data) else {
                continue;
            };
            if let Some(servers) = data.get("mcpServers").and_then(Value::as_object) {
                scan.add_servers(
                    servers,
                    &manifest,
                    ConfigSource::Plugin,
                    Some((plugin.as_str(), plugin_root)),
                );
            }
        }

        let legacy = ctx.join("mcp.json");
        let legacy_data = scan.read_json(&legacy);
        if let Some(servers) = legacy_data.as_ref().and_then(|d| servers_in(d, MCP_ENABLED_KEY)) {
            scan.add_servers(servers, &legacy, ConfigSource::Legacy, None);
        }

        // Disabled entries only count when no enabled definition exists
        if ctx.config.scan_disabled {
            let disabled = [
                (user_data.as_ref(), user_config.as_deref(), ConfigSource::User),
                (project, user_config.as_deref(), ConfigSource::Local),
                (legacy_data.as_ref(), Some(legacy.as_path()), ConfigSource::Legacy),
            ];
            for (data, path, source) in disabled {
                let servers = data.and_then(|d| servers_in(d, MCP_DISABLED_KEY));
                if let (Some(servers), Some(path)) = (servers, path) {
                    scan.add_disabled_servers(servers, path, source);
                }
            }
        }

        scan.add_builtins();
        Ok(scan.output)
    }
}

fn servers_in<'v>(data: &'v Value, key: &str) -> Option<&'v Map<String, Value>> {
    data.get(key).and_then(Value::as_object)
}

struct McpScan<'a> {
    ctx: &'a ScanContext,
    seen: HashSet<String>,
    output: ParseOutput,
}

impl McpScan<'_> {
    /// Read a JSON config; absent files are skipped, unreadable ones reported
    fn read_json(&mut self, path: &Path) -> Option<Value> {
        if !path.is_file() || self.ctx.is_excluded(path) {
            return None;
        }
        let parsed = fs::read_to_string(path)
            .map_err(Error::from)
            .and_then(|content| serde_json::from_str::<Value>(&content).map_err(Error::from));
        match parsed {
            Ok(value) => Some(value),
            Err(err) => {
                self.output
                    .errors
                    .push(format!("{}: {}", path.display(), err));
                None
            }
        }
    }

    fn add_servers(
        &mut self,
        servers: &Map<String, Value>,
        config_path: &Path,
        source: ConfigSource,
        plugin: Option<(&str, &Path)>,
    ) {
        for (server, config) in servers {
            let name = match plugin {
                Some((plugin_name, _)) => plugin_cache::qualified_mcp_name(plugin_name, server),
                None => server.clone(),
            };
            if !self.seen.insert(name.clone()) {
                continue;
            }

            let mut config = config.clone();
            if let Some((_, root)) = plugin {
                mcp_config::resolve_plugin_root(&mut config, root);
            }

            match mcp_config::server_record(self.ctx.platform, &name, &config, config_path, source)
            {
                Ok(record) => self.output.push(record),
                Err(err) => {
                    let message = format!("mcp '{}': {}", name, err);
                    let record = ComponentRecord::errored(
                        self.ctx.platform,
                        name,
                        ComponentDetails::Mcp(McpDetails::default()),
                        err.to_string(),
                    )
                    .with_install_path(config_path);
                    self.output.push_failed(record, message);
                }
            }
        }
    }

    fn add_disabled_servers(
        &mut self,
        servers: &Map<String, Value>,
        config_path: &Path,
        source: ConfigSource,
    ) {
        let before = self.output.records.len();
        self.add_servers(servers, config_path, source, None);
        for record in &mut self.output.records[before..] {
            if record.status == ComponentStatus::Active {
                record.status = ComponentStatus::Disabled;
            }
        }
    }

    fn add_builtins(&mut self) {
        let chrome_host = self.ctx.join(CHROME_HOST);
        let name = "claude-in-chrome";
        if chrome_host.exists() && self.seen.insert(name.to_string()) {
            let details =
                McpDetails::new("chrome-extension", Vec::new(), Vec::new(), "native-messaging");
            let record =
                ComponentRecord::new(self.ctx.platform, name, ComponentDetails::Mcp(details))
                    .with_origin(mcp_config::detect_origin(name, "", ConfigSource::Builtin))
                    .with_install_path(&chrome_host)
                    .with_last_modified(modified_utc(&chrome_host))
                    .with_extra(
                        "config_source",
                        Value::String(ConfigSource::Builtin.as_str().to_string()),
                    );
            self.output.push(record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::ScanConfig;
    use serde_json::json;
    use tooldex_types::{ComponentStatus, Origin, Platform};

    fn write_json(path: &Path, value: &Value) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, serde_json::to_string_pretty(value).unwrap()).unwrap();
    }

    #[test]
    fn test_all_sources_first_definition_wins() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join(".claude");
        fs::create_dir_all(&root).unwrap();

        write_json(
            &tmp.path().join(USER_CONFIG),
            &json!({
                "mcpServers": {"github": {"command": "npx", "env": {"TOKEN": "ghp_1"}}},
                "projects": {
                    root.to_string_lossy(): {"mcpServers": {"local-db": {"command": "/opt/db"}}}
                }
            }),
        );
        write_json(
            &root.join("plugins/cache/mkt/notes/1.0.0/.mcp.json"),
            &json!({"notes": {"command": "${CLAUDE_PLUGIN_ROOT}/bin/notes"}}),
        );
        write_json(
            &root.join("mcp.json"),
            &json!({"mcpServers": {
                "github": {"command": "duplicate"},
                "legacy": {"command": "uvx"}
            }}),
        );

        let ctx = ScanContext::new(Platform::Claude, &root, ScanConfig::default());
        let output = ClaudeMcpParser.parse(&ctx).unwrap();
        assert!(output.errors.is_empty(), "{:?}", output.errors);

        let names: Vec<_> = output.records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["github", "local-db", "plugin:notes:notes", "legacy"]);

        let github = &output.records[0];
        let ComponentDetails::Mcp(mcp) = &github.details else {
            panic!("expected mcp details");
        };
        assert_eq!(mcp.command, "npx");
        assert_eq!(output.records[1].origin, Origin::Local);

        let plugin = &output.records[2];
        assert_eq!(plugin.origin, Origin::Plugin);
        let ComponentDetails::Mcp(mcp) = &plugin.details else {
            panic!("expected mcp details");
        };
        assert!(mcp.command.ends_with("mkt/notes/1.0.0/bin/notes"));
    }

    #[test]
    fn test_broken_config_is_reported_not_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join(".claude");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("mcp.json"), "{ not json").unwrap();
        write_json(
            &tmp.path().join(USER_CONFIG),
            &json!({"mcpServers": {"ok": {"command": "x"}, "bad": "string"}}),
        );

        let ctx = ScanContext::new(Platform::Claude, &root, ScanConfig::default());
        let output = ClaudeMcpParser.parse(&ctx).unwrap();

        assert_eq!(output.errors.len(), 2);
        let bad = output.records.iter().find(|r| r.name == "bad").unwrap();
        assert_eq!(bad.status, ComponentStatus::Error);
        assert!(output.records.iter().any(|r| r.name == "ok"));
    }

    #[test]
    fn test_disabled_section_scanned_after_enabled() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join(".claude");
        fs::create_dir_all(&root).unwrap();
        write_json(
            &tmp.path().join(USER_CONFIG),
            &json!({
                "mcpServers": {"github": {"command": "npx"}},
                "mcpServersDisabled": {
                    "github": {"command": "stale"},
                    "slack": {"command": "uvx"}
                }
            }),
        );

        let ctx = ScanContext::new(Platform::Claude, &root, ScanConfig::default());
        let output = ClaudeMcpParser.parse(&ctx).unwrap();
        let status_of = |n: &str| output.records.iter().find(|r| r.name == n).unwrap().status;
        assert_eq!(output.records.len(), 2);
        assert_eq!(status_of("github"), ComponentStatus::Active);
        assert_eq!(status_of("slack"), ComponentStatus::Disabled);

        let config = ScanConfig {
            scan_disabled: false,
            ..ScanConfig::default()
        };
        let ctx = ScanContext::new(Platform::Claude, &root, config);
        assert_eq!(ClaudeMcpParser.parse(&ctx).unwrap().records.len(), 1);
    }

    #[test]
    fn test_builtin_chrome_host() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join(".claude");
        fs::create_dir_all(root.join("chrome")).unwrap();
        fs::write(root.join(CHROME_HOST), "").unwrap();

        let ctx = ScanContext::new(Platform::Claude, &root, ScanConfig::default());
        let output = ClaudeMcpParser.parse(&ctx).unwrap();
        assert_eq!(output.records.len(), 1);
        assert_eq!(output.records[0].name, "claude-in-chrome");
        assert_eq!(output.records[0].origin, Origin::Official);
    }
}
