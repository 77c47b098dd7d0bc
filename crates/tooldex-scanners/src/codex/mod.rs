mod mcp;

pub use mcp::CodexMcpParser;
pub(crate) use mcp::{MCP_DISABLED_TABLE, MCP_ENABLED_TABLE};
