//! Best-effort invocation writer for hooks.
//!
//! Runs inside a tool's hook, so it must never fail the caller or stall
//! for long: every problem becomes [`TrackOutcome::Dropped`].

use rusqlite::{Connection, OpenFlags};
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tooldex_types::InvocationEvent;

use crate::queries::event;
use crate::schema::{self, SCHEMA_VERSION};

const TRACK_BUSY_TIMEOUT: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackOutcome {
    Stored,
    Dropped(DropReason),
}

impl TrackOutcome {
    pub fn is_stored(&self) -> bool {
        matches!(self, TrackOutcome::Stored)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// No index file at the given path
    NoIndex,
    /// Another connection held the write lock past the busy timeout
    Busy,
    /// The file is not at this build's schema version; hooks never migrate
    SchemaMismatch { found: i32 },
    UnknownComponent,
    Failed(String),
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::NoIndex => write!(f, "no index"),
            DropReason::Busy => write!(f, "index busy"),
            DropReason::SchemaMismatch { found } => write!(
                f,
                "schema v{} (expected v{})",
                found, SCHEMA_VERSION
            ),
            DropReason::UnknownComponent => write!(f, "unknown component"),
            DropReason::Failed(msg) => write!(f, "{}", msg),
        }
    }
}

/// Append one invocation to the index at `db_path`.
pub fn track_invocation(db_path: &Path, invocation: &InvocationEvent) -> TrackOutcome {
    let outcome = match try_track(db_path, invocation) {
        Ok(outcome) => outcome,
        Err(err) if err.is_busy() => TrackOutcome::Dropped(DropReason::Busy),
        Err(err) => TrackOutcome::Dropped(DropReason::Failed(err.to_string())),
    };

    if let TrackOutcome::Dropped(reason) = &outcome {
        tracing::debug!(name = %invocation.name, kind = %invocation.kind, reason = %reason, "invocation not tracked");
    }
    outcome
}

fn try_track(db_path: &Path, invocation: &InvocationEvent) -> crate::Result<TrackOutcome> {
    if !db_path.is_file() {
        return Ok(TrackOutcome::Dropped(DropReason::NoIndex));
    }

    // Open without create so a wrong path never leaves an empty file behind
    let conn = Connection::open_with_flags(
        db_path,
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    conn.busy_timeout(TRACK_BUSY_TIMEOUT)?;

    let found = schema::read_version(&conn)?;
    if found != SCHEMA_VERSION {
        return Ok(TrackOutcome::Dropped(DropReason::SchemaMismatch { found }));
    }

    if event::record_invocation(&conn, invocation)? {
        Ok(TrackOutcome::Stored)
    } else {
        Ok(TrackOutcome::Dropped(DropReason::UnknownComponent))
    }
}
