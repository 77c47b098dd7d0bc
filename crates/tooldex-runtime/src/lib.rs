pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod ops;
pub mod scan;
pub mod services;

pub use client::{ComponentOps, IndexOps, ToolDex, UsageOps};
pub use config::{Config, PlatformConfig, resolve_data_dir};
pub use error::{Error, Result};
pub use ops::{IndexProgress, IndexService, IndexSummary};
pub use scan::{MultiPlatformScanner, PlatformSelector, ScanOrchestrator};
pub use services::{ComponentUsage, UsageService, UsageStats, UsageWindow};
