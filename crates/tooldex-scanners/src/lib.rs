// Error types
pub mod error;

// Parser capability and scan context
pub mod traits;

// Parser implementations
pub mod claude;
pub mod codex;
pub mod skills;

// Shared parsing helpers
pub mod frontmatter;
pub mod fs;
pub mod mcp_config;

// Parser registry
pub mod registry;

// Enable/disable on disk
pub mod toggle;

pub use traits::{ComponentParser, ParseOutput, ScanConfig, ScanContext, modified_utc};

pub use claude::{BinaryParser, ClaudeMcpParser, CommandParser, HookParser, PluginParser};
pub use codex::CodexMcpParser;
pub use skills::SkillParser;

pub use registry::{
    PlatformMetadata, get_all_platforms, get_default_roots, get_platform_metadata, parsers_for,
};

pub use toggle::{ToggleOutcome, toggle};

pub use error::{Error, Result};
