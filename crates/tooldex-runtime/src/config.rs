use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tooldex_scanners::ScanConfig;
use tooldex_scanners::fs::expand_home;
use tooldex_types::Platform;

pub const DB_FILE: &str = "tooldex.db";
pub const CONFIG_FILE: &str = "config.toml";

const DEFAULT_PARSER_TIMEOUT_SECS: u64 = 30;

/// Resolve the data directory path based on priority:
/// 1. Explicit path (with tilde expansion)
/// 2. TOOLDEX_PATH environment variable (with tilde expansion)
/// 3. XDG data directory (recommended default)
/// 4. ~/.tooldex (fallback for systems without XDG)
pub fn resolve_data_dir(explicit_path: Option<&str>) -> Result<PathBuf> {
    if let Some(path) = explicit_path {
        return Ok(expand_home(path));
    }

    if let Ok(env_path) = std::env::var("TOOLDEX_PATH") {
        return Ok(expand_home(&env_path));
    }

    if let Some(data_dir) = dirs::data_dir() {
        return Ok(data_dir.join("tooldex"));
    }

    if let Some(home) = dirs::home_dir() {
        return Ok(home.join(".tooldex"));
    }

    Err(Error::Config(
        "Could not determine data directory: no HOME directory or XDG data directory found"
            .to_string(),
    ))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformConfig {
    pub enabled: bool,
    pub root: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Seconds before a parser is reported as timed out; 0 disables the check
    #[serde(default = "default_parser_timeout")]
    pub parser_timeout_secs: u64,

    #[serde(default)]
    pub scan: ScanConfig,

    /// Keyed by platform name (`claude`, `codex`)
    #[serde(default)]
    pub platforms: BTreeMap<String, PlatformConfig>,
}

fn default_parser_timeout() -> u64 {
    DEFAULT_PARSER_TIMEOUT_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            parser_timeout_secs: DEFAULT_PARSER_TIMEOUT_SECS,
            scan: ScanConfig::default(),
            platforms: BTreeMap::new(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::default_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn default_path() -> Result<PathBuf> {
        Ok(resolve_data_dir(None)?.join(CONFIG_FILE))
    }

    /// Config registering every known platform at its conventional root.
    ///
    /// Roots are not checked here; a platform installed later is picked up
    /// by the next scan, and an absent one is reported as unavailable.
    pub fn detect_platforms() -> Self {
        Self::with_roots(tooldex_scanners::get_default_roots())
    }

    pub fn with_roots(roots: impl IntoIterator<Item = (Platform, PathBuf)>) -> Self {
        let mut config = Config::default();
        for (platform, root) in roots {
            config.set_platform(platform, root);
        }
        config
    }

    pub fn set_platform(&mut self, platform: Platform, root: impl Into<PathBuf>) {
        self.platforms.insert(
            platform.to_string(),
            PlatformConfig {
                enabled: true,
                root: root.into(),
            },
        );
    }

    /// Enabled platforms with their roots, in platform order.
    ///
    /// Unknown platform names are skipped with a warning.
    pub fn enabled_platforms(&self) -> Vec<(Platform, PathBuf)> {
        let mut enabled: Vec<(Platform, PathBuf)> = self
            .platforms
            .iter()
            .filter(|(_, cfg)| cfg.enabled)
            .filter_map(|(name, cfg)| match name.parse::<Platform>() {
                Ok(platform) => Some((platform, cfg.root.clone())),
                Err(err) => {
                    tracing::warn!(platform = %name, error = %err, "ignoring unknown platform in config");
                    None
                }
            })
            .collect();
        enabled.sort_by_key(|(platform, _)| *platform);
        enabled
    }

    pub fn parser_timeout(&self) -> Option<Duration> {
        (self.parser_timeout_secs > 0).then(|| Duration::from_secs(self.parser_timeout_secs))
    }
}
