// SQLite tooling index
// One row per (platform, name, type); usage and install history alongside

mod db;
pub mod error;
mod queries;
mod records;
mod schema;
pub mod tracking;

// Public API
pub use db::Database;
pub use error::{Error, Result};
pub use records::{ComponentFilter, ComponentRow, InvocationRow, UpsertReport};
pub use schema::SCHEMA_VERSION;
pub use tracking::{DropReason, TrackOutcome, track_invocation};
