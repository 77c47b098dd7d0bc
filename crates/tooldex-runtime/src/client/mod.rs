mod components;
mod index;
mod tooldex;
mod usage;

pub use components::ComponentOps;
pub use index::IndexOps;
pub use tooldex::ToolDex;
pub use usage::UsageOps;

use crate::{Error, Result};
use std::sync::{Mutex, MutexGuard};
use tooldex_index::Database;

pub(crate) fn lock(db: &Mutex<Database>) -> Result<MutexGuard<'_, Database>> {
    db.lock()
        .map_err(|_| Error::Runtime("index handle poisoned by an earlier panic".to_string()))
}
