use chrono::{DateTime, Utc};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tooldex_types::{ComponentKey, InstallEvent, InvocationEvent, ScanResult};

use crate::queries::{component, event, search};
use crate::records::{ComponentFilter, ComponentRow, InvocationRow, UpsertReport};
use crate::{Result, schema};

// Serialises scan writes from every handle in this process; other
// processes are covered by SQLite's busy timeout.
static WRITE_LOCK: Mutex<()> = Mutex::new(());

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to the tooling index.
///
/// Opening runs any pending migration. Each handle owns its connection;
/// readers on other handles see committed scans only.
pub struct Database {
    conn: Connection,
    path: Option<PathBuf>,
}

impl Database {
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let mut conn = Connection::open(db_path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.pragma_update(None, "foreign_keys", true)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        tracing::debug!(path = %db_path.display(), journal_mode = %mode, "opened tooling index");

        schema::init_schema(&mut conn)?;
        Ok(Self {
            conn,
            path: Some(db_path.to_path_buf()),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", true)?;
        schema::init_schema(&mut conn)?;
        Ok(Self { conn, path: None })
    }

    /// File backing this handle; `None` for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn schema_version(&self) -> Result<i32> {
        schema::read_version(&self.conn)
    }

    /// Persist one scan atomically.
    ///
    /// Records are redacted before they are written. Components absent from
    /// the scan are marked missing only for `(platform, kind)` pairs the scan
    /// covered.
    pub fn upsert_components(&self, scan: &ScanResult) -> Result<UpsertReport> {
        let _guard = WRITE_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        let report = component::upsert_scan(&tx, scan)?;
        tx.commit()?;

        tracing::debug!(
            inserted = report.inserted,
            updated = report.updated,
            unchanged = report.unchanged,
            marked_missing = report.marked_missing,
            "upserted scan"
        );
        Ok(report)
    }

    pub fn list_components(&self, filter: &ComponentFilter) -> Result<Vec<ComponentRow>> {
        component::list(&self.conn, filter)
    }

    pub fn count_components(&self, filter: &ComponentFilter) -> Result<usize> {
        component::count(&self.conn, filter)
    }

    /// Look up one identity, missing or not
    pub fn get_component(&self, key: &ComponentKey) -> Result<Option<ComponentRow>> {
        component::get(&self.conn, key)
    }

    pub fn search(&self, query: &str, filter: &ComponentFilter) -> Result<Vec<ComponentRow>> {
        search::search(&self.conn, query, filter)
    }

    /// Append an invocation; returns `false` when the identity is unknown
    pub fn record_invocation(&self, invocation: &InvocationEvent) -> Result<bool> {
        let stored = event::record_invocation(&self.conn, invocation)?;
        if !stored {
            tracing::debug!(name = %invocation.name, kind = %invocation.kind, "dropped invocation for unknown component");
        }
        Ok(stored)
    }

    pub fn record_install_event(&self, install: &InstallEvent) -> Result<bool> {
        event::record_install_event(&self.conn, install)
    }

    pub fn invocations_since(&self, since: Option<DateTime<Utc>>) -> Result<Vec<InvocationRow>> {
        event::invocations_since(&self.conn, since.as_ref())
    }

    pub fn install_events_since(&self, since: Option<DateTime<Utc>>) -> Result<Vec<InstallEvent>> {
        event::install_events_since(&self.conn, since.as_ref())
    }

    /// Delete every missing component and its history
    pub fn prune_missing(&self) -> Result<usize> {
        let _guard = WRITE_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        let removed = component::prune_missing(&tx)?;
        tx.commit()?;

        tracing::info!(removed, "pruned missing components");
        Ok(removed)
    }
}
