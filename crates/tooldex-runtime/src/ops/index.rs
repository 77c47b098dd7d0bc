use crate::Result;
use serde::{Deserialize, Serialize};
use tooldex_index::{Database, UpsertReport};
use tooldex_types::{ScanError, ScanErrorKind, ScanResult};

#[derive(Debug, Clone)]
pub enum IndexProgress {
    /// A platform root was missing or not configured
    PlatformUnavailable { source: String, message: String },
    /// A parser failed, panicked, timed out, or reported bad items
    ScanError(ScanError),
    Upserted(UpsertReport),
    Completed { summary: String },
}

/// Outcome of writing one scan into the index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSummary {
    pub components: usize,
    pub report: UpsertReport,
    pub errors: Vec<ScanError>,
}

impl IndexSummary {
    /// "N components indexed, M errors"
    pub fn summary_line(&self) -> String {
        format!(
            "{} components indexed, {} errors",
            self.components,
            self.errors.len()
        )
    }
}

/// Writes a merged scan into the index and reports what happened
pub struct IndexService<'a> {
    db: &'a Database,
}

impl<'a> IndexService<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub fn apply<F>(&self, scan: &ScanResult, mut on_progress: F) -> Result<IndexSummary>
    where
        F: FnMut(IndexProgress),
    {
        for error in &scan.errors {
            let progress = match error.kind {
                ScanErrorKind::Unavailable => IndexProgress::PlatformUnavailable {
                    source: error.source.clone(),
                    message: error.message.clone(),
                },
                _ => IndexProgress::ScanError(error.clone()),
            };
            on_progress(progress);
        }

        let report = self.db.upsert_components(scan)?;
        on_progress(IndexProgress::Upserted(report.clone()));

        let summary = IndexSummary {
            components: scan.components.len(),
            report,
            errors: scan.errors.clone(),
        };

        let line = summary.summary_line();
        tracing::info!(
            inserted = summary.report.inserted,
            updated = summary.report.updated,
            unchanged = summary.report.unchanged,
            marked_missing = summary.report.marked_missing,
            "{}",
            line
        );
        on_progress(IndexProgress::Completed { summary: line });

        Ok(summary)
    }
}
