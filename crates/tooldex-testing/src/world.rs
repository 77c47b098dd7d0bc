//! TestWorld pattern for declarative integration test setup.
//!
//! Provides a fluent interface for:
//! - Creating an isolated home with `.claude` and `.codex` roots
//! - Placing skills, commands, hooks, MCP servers, and plugins
//! - Removing fixtures between scans

use anyhow::Result;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tooldex_types::Platform;

use crate::fixtures;

/// Declarative test environment builder.
///
/// Platform roots are created on first use, so a platform nobody writes to
/// has no root on disk.
///
/// # Example
/// ```no_run
/// use tooldex_testing::TestWorld;
/// use tooldex_types::Platform;
///
/// let world = TestWorld::new()
///     .with_skill(Platform::Claude, "gmail", "Read and send mail")
///     .with_skill(Platform::Codex, "gmail", "Mail for codex");
///
/// assert!(world.root(Platform::Codex).join("skills/gmail/SKILL.md").exists());
/// ```
pub struct TestWorld {
    temp_dir: TempDir,
    data_dir: PathBuf,
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWorld {
    /// Create a new isolated test environment.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let data_dir = temp_dir.path().join(".tooldex");
        std::fs::create_dir_all(&data_dir).expect("Failed to create data dir");

        Self { temp_dir, data_dir }
    }

    /// Directory holding `tooldex.db` and `config.toml`.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("tooldex.db")
    }

    /// Get the temp directory root (the fake home).
    pub fn home(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Root of `platform` under the fake home, whether or not it exists.
    pub fn root(&self, platform: Platform) -> PathBuf {
        self.home().join(platform.default_dir_name())
    }

    /// Roots of every platform, for building a scan configuration.
    pub fn roots(&self) -> Vec<(Platform, PathBuf)> {
        Platform::ALL.iter().map(|p| (*p, self.root(*p))).collect()
    }

    /// Create an empty root for `platform`.
    pub fn with_platform(self, platform: Platform) -> Self {
        std::fs::create_dir_all(self.root(platform)).expect("Failed to create platform root");
        self
    }

    /// Skill whose directory name equals its name.
    pub fn with_skill(self, platform: Platform, name: &str, description: &str) -> Self {
        self.with_skill_in(platform, name, name, description)
    }

    /// Skill stored in `dir` but declaring `name` in its frontmatter.
    pub fn with_skill_in(self, platform: Platform, dir: &str, name: &str, description: &str) -> Self {
        fixtures::write_skill(&self.root(platform), dir, name, description)
            .expect("Failed to write skill");
        self
    }

    pub fn with_disabled_skill(self, platform: Platform, name: &str, description: &str) -> Self {
        let dir = format!(".disabled/{}", name);
        self.with_skill_in(platform, &dir, name, description)
    }

    pub fn with_command(self, name: &str, description: &str) -> Self {
        fixtures::write_command(&self.root(Platform::Claude), name, description)
            .expect("Failed to write command");
        self
    }

    pub fn with_hook(self, file: &str) -> Self {
        fixtures::write_hook(&self.root(Platform::Claude), file).expect("Failed to write hook");
        self
    }

    /// MCP server in the platform's own config format.
    pub fn with_mcp(self, platform: Platform, name: &str, command: &str, env: &[(&str, &str)]) -> Self {
        let root = self.root(platform);
        match platform {
            Platform::Claude => fixtures::add_claude_mcp(&root, name, command, env),
            Platform::Codex => fixtures::add_codex_mcp(&root, name, command, env),
        }
        .expect("Failed to write MCP server");
        self
    }

    pub fn with_plugin(self, marketplace: &str, name: &str, version: &str, description: &str) -> Self {
        fixtures::add_plugin(
            &self.root(Platform::Claude),
            marketplace,
            name,
            version,
            description,
        )
        .expect("Failed to write plugin");
        self
    }

    /// Delete a skill directory, as an uninstall would.
    pub fn remove_skill(&self, platform: Platform, dir: &str) -> Result<()> {
        std::fs::remove_dir_all(self.root(platform).join("skills").join(dir))?;
        Ok(())
    }

    /// Rewrite a skill in place with a new description.
    pub fn update_skill(&self, platform: Platform, name: &str, description: &str) -> Result<()> {
        fixtures::write_skill(&self.root(platform), name, name, description)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roots_are_created_lazily() {
        let world = TestWorld::new().with_skill(Platform::Claude, "gmail", "Mail");

        assert!(world.root(Platform::Claude).join("skills/gmail/SKILL.md").is_file());
        assert!(!world.root(Platform::Codex).exists());
        assert!(world.data_dir().is_dir());
    }

    #[test]
    fn test_remove_skill() -> Result<()> {
        let world = TestWorld::new()
            .with_skill(Platform::Codex, "gmail", "Mail")
            .with_disabled_skill(Platform::Codex, "old", "Retired");
        world.remove_skill(Platform::Codex, "gmail")?;

        let skills = world.root(Platform::Codex).join("skills");
        assert!(!skills.join("gmail").exists());
        assert!(skills.join(".disabled/old/SKILL.md").is_file());
        Ok(())
    }
}
