mod merge;
mod orchestrator;

pub use merge::{MultiPlatformScanner, PlatformSelector};
pub use orchestrator::ScanOrchestrator;
