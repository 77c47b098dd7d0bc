use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use tooldex_types::{ComponentDetails, ComponentKind, ComponentRecord, ComponentStatus, McpDetails};

use crate::mcp_config::{self, ConfigSource};
use crate::traits::{ComponentParser, ParseOutput, ScanContext};
use crate::Result;

pub(crate) const MCP_ENABLED_TABLE: &str = "mcp_servers";
pub(crate) const MCP_DISABLED_TABLE: &str = "mcp_servers_disabled";

/// `[mcp_servers.<name>]` and `[mcp_servers_disabled.<name>]` tables in
/// `<root>/config.toml`
pub struct CodexMcpParser;

impl ComponentParser for CodexMcpParser {
    fn name(&self) -> &'static str {
        "codex-mcp"
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::Mcp
    }

    fn parse(&self, ctx: &ScanContext) -> Result<ParseOutput> {
        let config_path = ctx.join("config.toml");
        let mut output = ParseOutput::default();
        if !config_path.is_file() {
            return Ok(output);
        }

        let table: toml::Table = toml::from_str(&fs::read_to_string(&config_path)?)?;

        let mut sections = vec![(MCP_ENABLED_TABLE, ComponentStatus::Active)];
        if ctx.config.scan_disabled {
            sections.push((MCP_DISABLED_TABLE, ComponentStatus::Disabled));
        }

        let mut seen = HashSet::new();
        for (section, status) in sections {
            let Some(toml::Value::Table(servers)) = table.get(section) else {
                continue;
            };

            for (name, server) in servers {
                if !seen.insert(name.as_str()) {
                    continue;
                }
                let config = serde_json::to_value(server).unwrap_or(Value::Null);
                match mcp_config::server_record(
                    ctx.platform,
                    name,
                    &config,
                    &config_path,
                    ConfigSource::Codex,
                ) {
                    Ok(record) => output.push(
                        record
                            .with_install_path(&config_path)
                            .with_status(status),
                    ),
                    Err(err) => {
                        let message = format!("codex mcp '{}': {}", name, err);
                        let record = ComponentRecord::errored(
                            ctx.platform,
                            name.as_str(),
                            ComponentDetails::Mcp(McpDetails::default()),
                            err.to_string(),
                        )
                        .with_install_path(&config_path);
                        output.push_failed(record, message);
                    }
                }
            }
        }

        Ok(output)
    }
}
