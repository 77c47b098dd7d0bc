use std::path::PathBuf;
use std::sync::Arc;
use tooldex_types::Platform;

use crate::claude::{BinaryParser, ClaudeMcpParser, CommandParser, HookParser, PluginParser};
use crate::codex::CodexMcpParser;
use crate::fs::expand_home;
use crate::skills::SkillParser;
use crate::traits::ComponentParser;

#[derive(Debug, Clone)]
pub struct PlatformMetadata {
    pub platform: Platform,
    pub description: &'static str,
    pub default_root: &'static str,
}

const PLATFORMS: &[PlatformMetadata] = &[
    PlatformMetadata {
        platform: Platform::Claude,
        description: "Claude Code",
        default_root: "~/.claude",
    },
    PlatformMetadata {
        platform: Platform::Codex,
        description: "Codex CLI",
        default_root: "~/.codex",
    },
];

pub fn get_all_platforms() -> &'static [PlatformMetadata] {
    PLATFORMS
}

pub fn get_platform_metadata(platform: Platform) -> Option<&'static PlatformMetadata> {
    PLATFORMS.iter().find(|p| p.platform == platform)
}

/// Conventional root of every known platform, whether or not it exists
pub fn get_default_roots() -> Vec<(Platform, PathBuf)> {
    PLATFORMS
        .iter()
        .map(|p| (p.platform, expand_home(p.default_root)))
        .collect()
}

/// The fixed parser set for a platform
pub fn parsers_for(platform: Platform) -> Vec<Arc<dyn ComponentParser>> {
    match platform {
        Platform::Claude => vec![
            Arc::new(SkillParser),
            Arc::new(PluginParser),
            Arc::new(CommandParser),
            Arc::new(HookParser),
            Arc::new(ClaudeMcpParser),
            Arc::new(BinaryParser),
        ],
        Platform::Codex => vec![Arc::new(SkillParser), Arc::new(CodexMcpParser)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tooldex_types::ComponentKind;

    #[test]
    fn test_parser_sets() {
        let claude: Vec<_> = parsers_for(Platform::Claude)
            .iter()
            .map(|p| p.name())
            .collect();
        assert_eq!(
            claude,
            vec!["skills", "plugins", "commands", "hooks", "mcp", "binaries"]
        );

        let codex = parsers_for(Platform::Codex);
        let kinds: Vec<_> = codex.iter().map(|p| p.kind()).collect();
        assert_eq!(kinds, vec![ComponentKind::Skill, ComponentKind::Mcp]);
    }

    #[test]
    fn test_every_platform_has_metadata() {
        for platform in Platform::ALL {
            let meta = get_platform_metadata(platform).unwrap();
            assert!(meta.default_root.ends_with(platform.default_dir_name()));
        }
    }
}
