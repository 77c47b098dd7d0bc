use crate::client::lock;
use crate::config::Config;
use crate::ops::{IndexProgress, IndexService, IndexSummary};
use crate::scan::{MultiPlatformScanner, PlatformSelector};
use crate::{Error, Result};
use std::sync::{Arc, Mutex};
use tooldex_index::Database;
use tooldex_scanners::ToggleOutcome;
use tooldex_types::{ComponentKey, ScanResult};

pub struct IndexOps {
    db: Arc<Mutex<Database>>,
    config: Arc<Config>,
}

impl IndexOps {
    pub fn new(db: Arc<Mutex<Database>>, config: Arc<Config>) -> Self {
        Self { db, config }
    }

    /// Scan the selected platforms and write the result in one transaction
    pub async fn scan<F>(&self, selector: PlatformSelector, on_progress: F) -> Result<IndexSummary>
    where
        F: FnMut(IndexProgress),
    {
        let scan = MultiPlatformScanner::from_config(&self.config)
            .scan(selector)
            .await;
        self.apply(&scan, on_progress)
    }

    /// Write an already merged scan
    pub fn apply<F>(&self, scan: &ScanResult, on_progress: F) -> Result<IndexSummary>
    where
        F: FnMut(IndexProgress),
    {
        let db = lock(&self.db)?;
        IndexService::new(&db).apply(scan, on_progress)
    }

    /// Enable a disabled component or disable an active one, then rescan
    /// its platform so the index reflects the new status.
    pub async fn toggle(&self, key: &ComponentKey) -> Result<ToggleOutcome> {
        let row = {
            let db = lock(&self.db)?;
            db.get_component(key)?
        }
        .ok_or_else(|| Error::NotFound(key.to_string()))?;

        let root = self
            .config
            .enabled_platforms()
            .into_iter()
            .find(|(platform, _)| *platform == key.platform)
            .map(|(_, root)| root)
            .ok_or_else(|| Error::Config(format!("platform {} is not configured", key.platform)))?;

        let outcome = tooldex_scanners::toggle(&row.record, &root)?;
        self.scan(PlatformSelector::Only(key.platform), |_| {}).await?;
        Ok(outcome)
    }

    /// Delete components marked missing along with their history
    pub fn prune_missing(&self) -> Result<usize> {
        let db = lock(&self.db)?;
        let pruned = db.prune_missing()?;
        tracing::info!(pruned, "pruned missing components");
        Ok(pruned)
    }
}
