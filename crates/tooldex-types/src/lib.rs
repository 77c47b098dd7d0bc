pub mod domain;
pub mod error;
pub mod redact;
mod util;

pub use domain::*;
pub use error::{Error, Result};
pub use redact::{EnvVars, REDACTED_PLACEHOLDER};
pub use util::*;
