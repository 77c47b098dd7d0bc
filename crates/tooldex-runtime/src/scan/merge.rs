use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tooldex_scanners::{ComponentParser, ScanConfig};
use tooldex_types::{ComponentKey, Platform, ScanError, ScanErrorKind, ScanResult};

use super::orchestrator::ScanOrchestrator;
use crate::config::Config;

/// Which platforms a scan covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlatformSelector {
    /// Every configured platform
    #[default]
    All,
    Only(Platform),
}

impl FromStr for PlatformSelector {
    type Err = tooldex_types::Error;

    fn from_str(s: &str) -> tooldex_types::Result<Self> {
        if s.eq_ignore_ascii_case("all") {
            return Ok(PlatformSelector::All);
        }
        s.parse().map(PlatformSelector::Only)
    }
}

/// Scans several platform roots concurrently and merges them into one
/// [`ScanResult`] keyed by `(platform, name, type)`.
pub struct MultiPlatformScanner {
    roots: BTreeMap<Platform, PathBuf>,
    parsers: BTreeMap<Platform, Vec<Arc<dyn ComponentParser>>>,
    scan_config: ScanConfig,
    timeout: Option<Duration>,
}

impl MultiPlatformScanner {
    pub fn new(scan_config: ScanConfig) -> Self {
        Self {
            roots: BTreeMap::new(),
            parsers: BTreeMap::new(),
            scan_config,
            timeout: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let mut scanner = Self::new(config.scan.clone()).with_timeout(config.parser_timeout());
        for (platform, root) in config.enabled_platforms() {
            scanner = scanner.with_root(platform, root);
        }
        scanner
    }

    pub fn with_root(mut self, platform: Platform, root: impl Into<PathBuf>) -> Self {
        self.roots.insert(platform, root.into());
        self
    }

    /// Replace the registry's parser set for one platform
    pub fn with_parsers(mut self, platform: Platform, parsers: Vec<Arc<dyn ComponentParser>>) -> Self {
        self.parsers.insert(platform, parsers);
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn configured_platforms(&self) -> impl Iterator<Item = (&Platform, &PathBuf)> {
        self.roots.iter()
    }

    pub async fn scan(&self, selector: PlatformSelector) -> ScanResult {
        self.scan_at(selector, Utc::now()).await
    }

    /// Scan with an explicit `scanned_at`, which becomes `last_seen` and the
    /// timestamp of any installation events the upsert emits.
    pub async fn scan_at(&self, selector: PlatformSelector, scanned_at: DateTime<Utc>) -> ScanResult {
        let mut merged = ScanResult::new(scanned_at);

        let selected: Vec<(Platform, &PathBuf)> = match selector {
            PlatformSelector::All => self.roots.iter().map(|(p, root)| (*p, root)).collect(),
            PlatformSelector::Only(platform) => match self.roots.get(&platform) {
                Some(root) => vec![(platform, root)],
                None => {
                    tracing::warn!(platform = %platform, "platform is not configured");
                    merged.errors.push(ScanError::new(
                        platform.as_str(),
                        ScanErrorKind::Unavailable,
                        "platform is not configured",
                    ));
                    return merged;
                }
            },
        };

        let scans = selected.into_iter().map(|(platform, root)| {
            let orchestrator = match self.parsers.get(&platform) {
                Some(parsers) => ScanOrchestrator::new(parsers.clone()),
                None => ScanOrchestrator::for_platform(platform),
            }
            .with_timeout(self.timeout);
            let scan_config = &self.scan_config;
            async move { orchestrator.scan(platform, root, scan_config).await }
        });

        for result in join_all(scans).await {
            merge_into(&mut merged, result);
        }

        tracing::info!(
            components = merged.components.len(),
            errors = merged.errors.len(),
            "scan finished"
        );
        merged
    }
}

/// Append `part` to `merged`. A record whose identity is already present
/// replaces the earlier one in place.
fn merge_into(merged: &mut ScanResult, part: ScanResult) {
    let mut positions: BTreeMap<ComponentKey, usize> = merged
        .components
        .iter()
        .enumerate()
        .map(|(idx, record)| (record.key(), idx))
        .collect();

    for record in part.components {
        let key = record.key();
        match positions.get(&key) {
            Some(&idx) => {
                let previous = &merged.components[idx];
                tracing::warn!(key = %key, "duplicate component in one scan; keeping the last one");
                merged.errors.push(ScanError::new(
                    key.to_string(),
                    ScanErrorKind::Collision,
                    format!(
                        "found at {} and {}",
                        display_path(previous.install_path.as_ref()),
                        display_path(record.install_path.as_ref())
                    ),
                ));
                merged.components[idx] = record;
            }
            None => {
                positions.insert(key, merged.components.len());
                merged.components.push(record);
            }
        }
    }

    merged.coverage.extend(part.coverage);
    merged.errors.extend(part.errors);
}

fn display_path(path: Option<&PathBuf>) -> String {
    path.map(|p| p.display().to_string())
        .unwrap_or_else(|| "<unknown>".to_string())
}
