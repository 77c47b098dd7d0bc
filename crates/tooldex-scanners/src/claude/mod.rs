mod binaries;
mod commands;
mod hooks;
mod mcp;
mod plugin_cache;
mod plugins;

pub use binaries::BinaryParser;
pub use commands::CommandParser;
pub use hooks::HookParser;
pub use mcp::ClaudeMcpParser;
pub(crate) use mcp::{MCP_DISABLED_KEY, MCP_ENABLED_KEY};
pub use plugins::{PluginParser, origin_for_marketplace};
