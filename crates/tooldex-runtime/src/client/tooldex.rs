use crate::client::{ComponentOps, IndexOps, UsageOps};
use crate::config::{CONFIG_FILE, Config, DB_FILE};
use crate::Result;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tooldex_index::{Database, TrackOutcome};
use tooldex_types::InvocationEvent;

/// Entry point for scanning, querying, and tracking against one data
/// directory (`tooldex.db` plus `config.toml`).
///
/// Scans write through one connection and queries read through another, so
/// a long stats or search call never waits on an index write.
pub struct ToolDex {
    writer: Arc<Mutex<Database>>,
    reader: Arc<Mutex<Database>>,
    db_path: PathBuf,
    config: Arc<Config>,
}

impl ToolDex {
    /// Open the index under `data_dir`. Without a config file, every known
    /// platform is registered at its conventional root and the result is saved.
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_defaults(data_dir, Config::detect_platforms())
    }

    /// Like [`ToolDex::open`], saving `defaults` when `config.toml` is absent
    pub fn open_with_defaults(data_dir: impl AsRef<Path>, defaults: Config) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        let config_path = data_dir.join(CONFIG_FILE);

        let config = if config_path.exists() {
            Config::load_from(&config_path)?
        } else {
            defaults.save_to(&config_path)?;
            defaults
        };

        Self::with_config(data_dir, config)
    }

    /// Open the index under `data_dir` with an explicit config; nothing is
    /// written to `config.toml`.
    pub fn with_config(data_dir: impl AsRef<Path>, config: Config) -> Result<Self> {
        let db_path = data_dir.as_ref().join(DB_FILE);
        let writer = Database::open(&db_path)?;
        let reader = Database::open(&db_path)?;

        Ok(Self {
            writer: Arc::new(Mutex::new(writer)),
            reader: Arc::new(Mutex::new(reader)),
            db_path,
            config: Arc::new(config),
        })
    }

    pub fn index(&self) -> IndexOps {
        IndexOps::new(self.writer.clone(), self.config.clone())
    }

    pub fn components(&self) -> ComponentOps {
        ComponentOps::new(self.reader.clone())
    }

    pub fn usage(&self) -> UsageOps {
        UsageOps::new(self.reader.clone())
    }

    /// Best-effort append through a separate short-lived connection, the
    /// same path a hook takes.
    pub fn track(&self, invocation: &InvocationEvent) -> TrackOutcome {
        tooldex_index::track_invocation(&self.db_path, invocation)
    }

    pub fn database_path(&self) -> &Path {
        &self.db_path
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::lock;
    use chrono::Utc;
    use tempfile::TempDir;
    use tooldex_index::ComponentFilter;
    use tooldex_types::{ComponentDetails, ComponentRecord, Platform, ScanResult, SkillDetails};

    #[test]
    fn test_writes_proceed_while_a_reader_is_busy() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let dex = ToolDex::with_config(temp_dir.path(), Config::default())?;

        let mut scan = ScanResult::new(Utc::now());
        scan.components.push(ComponentRecord::new(
            Platform::Claude,
            "gmail",
            ComponentDetails::Skill(SkillDetails::default()),
        ));

        let summary = {
            let _reading = lock(&dex.reader)?;
            dex.index().apply(&scan, |_| {})?
        };
        assert_eq!(summary.report.inserted, 1);

        assert_eq!(dex.components().count(&ComponentFilter::default())?, 1);
        Ok(())
    }
}
