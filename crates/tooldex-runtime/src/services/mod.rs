pub mod usage;

pub use usage::{ComponentUsage, UsageService, UsageStats, UsageWindow};
