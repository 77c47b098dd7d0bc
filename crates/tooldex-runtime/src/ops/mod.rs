pub mod index;

pub use index::{IndexProgress, IndexService, IndexSummary};
