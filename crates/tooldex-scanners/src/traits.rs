use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tooldex_types::{ComponentKind, ComponentRecord, Platform};

use crate::Result;

/// Discovers components of one kind under a platform root.
///
/// Implementations are synchronous; the orchestrator runs each one on its
/// own blocking task. Per-item problems belong in [`ParseOutput::errors`];
/// returning `Err` discards the parser's whole contribution for that scan.
pub trait ComponentParser: Send + Sync {
    /// Stable parser name used to tag errors (e.g. "skills", "codex-mcp")
    fn name(&self) -> &'static str;

    /// Kind of every record this parser produces
    fn kind(&self) -> ComponentKind;

    fn parse(&self, ctx: &ScanContext) -> Result<ParseOutput>;
}

/// What a parser found: records plus per-item error messages
#[derive(Debug, Default, Clone)]
pub struct ParseOutput {
    pub records: Vec<ComponentRecord>,
    pub errors: Vec<String>,
}

impl ParseOutput {
    pub fn push(&mut self, record: ComponentRecord) {
        self.records.push(record);
    }

    /// Record an item that was found but could not be parsed
    pub fn push_failed(&mut self, record: ComponentRecord, message: String) {
        self.errors.push(message);
        self.records.push(record);
    }

    pub fn extend(&mut self, other: ParseOutput) {
        self.records.extend(other.records);
        self.errors.extend(other.errors);
    }
}

/// Scan flags shared by every parser
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Also scan `.disabled/` locations, yielding `disabled` records
    pub scan_disabled: bool,
    pub follow_symlinks: bool,
    /// Glob patterns matched against file names and root-relative paths
    pub exclude: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            scan_disabled: true,
            follow_symlinks: true,
            exclude: Vec::new(),
        }
    }
}

/// Everything a parser needs to know about the root it is scanning
#[derive(Debug, Clone)]
pub struct ScanContext {
    pub platform: Platform,
    pub root: PathBuf,
    pub config: ScanConfig,
    exclude: Vec<glob::Pattern>,
}

impl ScanContext {
    pub fn new(platform: Platform, root: impl Into<PathBuf>, config: ScanConfig) -> Self {
        let exclude = config
            .exclude
            .iter()
            .filter_map(|pattern| match glob::Pattern::new(pattern) {
                Ok(p) => Some(p),
                Err(err) => {
                    tracing::warn!(pattern = %pattern, error = %err, "ignoring invalid exclude pattern");
                    None
                }
            })
            .collect();

        Self {
            platform,
            root: root.into(),
            config,
            exclude,
        }
    }

    pub fn join(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// True when the path matches any configured exclude pattern
    pub fn is_excluded(&self, path: &Path) -> bool {
        if self.exclude.is_empty() {
            return false;
        }

        let file_name = path.file_name().and_then(|n| n.to_str());
        let relative = path.strip_prefix(&self.root).ok();

        self.exclude.iter().any(|pattern| {
            file_name.is_some_and(|n| pattern.matches(n))
                || relative.is_some_and(|r| pattern.matches_path(r))
        })
    }
}

/// Modification time of a file, if the platform reports one
pub fn modified_utc(path: &Path) -> Option<DateTime<Utc>> {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .map(DateTime::<Utc>::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exclude_matches_name_and_relative_path() {
        let config = ScanConfig {
            exclude: vec!["*.bak".into(), "skills/scratch*".into(), "[".into()],
            ..ScanConfig::default()
        };
        let ctx = ScanContext::new(Platform::Claude, "/home/u/.claude", config);

        assert!(ctx.is_excluded(Path::new("/home/u/.claude/hooks/old.bak")));
        assert!(ctx.is_excluded(Path::new("/home/u/.claude/skills/scratchpad")));
        assert!(!ctx.is_excluded(Path::new("/home/u/.claude/skills/gmail")));
    }

    #[test]
    fn test_default_config_scans_disabled() {
        let config = ScanConfig::default();
        assert!(config.scan_disabled);
        assert!(config.follow_symlinks);
        assert!(config.exclude.is_empty());
    }
}
