use crate::client::lock;
use crate::services::{UsageService, UsageStats, UsageWindow};
use crate::Result;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use tooldex_index::Database;
use tooldex_types::InstallEvent;

pub struct UsageOps {
    db: Arc<Mutex<Database>>,
}

impl UsageOps {
    pub fn new(db: Arc<Mutex<Database>>) -> Self {
        Self { db }
    }

    pub fn stats(&self, window: UsageWindow) -> Result<UsageStats> {
        self.stats_at(window, Utc::now())
    }

    pub fn stats_at(&self, window: UsageWindow, now: DateTime<Utc>) -> Result<UsageStats> {
        let db = lock(&self.db)?;
        UsageService::new(&db).stats(window, now)
    }

    pub fn timeline(&self, window: UsageWindow) -> Result<Vec<InstallEvent>> {
        self.timeline_at(window, Utc::now())
    }

    pub fn timeline_at(&self, window: UsageWindow, now: DateTime<Utc>) -> Result<Vec<InstallEvent>> {
        let db = lock(&self.db)?;
        UsageService::new(&db).timeline(window, now)
    }
}
