use crate::Result;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tooldex_index::{Database, InvocationRow};
use tooldex_types::{ComponentKey, InstallEvent};

/// Lookback window for usage queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UsageWindow {
    #[default]
    AllTime,
    Last(Duration),
}

impl UsageWindow {
    /// `days(0)` means no bound
    pub fn days(days: u32) -> Self {
        if days == 0 {
            UsageWindow::AllTime
        } else {
            UsageWindow::Last(Duration::days(i64::from(days)))
        }
    }

    /// Inclusive lower bound relative to `now`
    pub fn start(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            UsageWindow::Last(lookback) if *lookback > Duration::zero() => Some(now - *lookback),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentUsage {
    pub key: ComponentKey,
    pub invocations: usize,
    pub successes: usize,
    /// Mean over invocations that reported a duration
    pub avg_duration_ms: Option<f64>,
    pub last_used: DateTime<Utc>,
}

impl ComponentUsage {
    pub fn success_rate(&self) -> f64 {
        if self.invocations == 0 {
            return 0.0;
        }
        self.successes as f64 / self.invocations as f64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageStats {
    pub window_start: Option<DateTime<Utc>>,
    pub total_invocations: usize,
    pub total_successes: usize,
    /// Most used first; ties ordered by `(platform, name, type)`
    pub ranking: Vec<ComponentUsage>,
}

impl UsageStats {
    pub fn top(&self, n: usize) -> &[ComponentUsage] {
        &self.ranking[..n.min(self.ranking.len())]
    }

    pub fn usage_of(&self, key: &ComponentKey) -> Option<&ComponentUsage> {
        self.ranking.iter().find(|u| &u.key == key)
    }

    fn from_rows(window_start: Option<DateTime<Utc>>, rows: Vec<InvocationRow>) -> Self {
        #[derive(Default)]
        struct Acc {
            invocations: usize,
            successes: usize,
            duration_total: u64,
            durations: usize,
            last_used: Option<DateTime<Utc>>,
        }

        let total_invocations = rows.len();
        let mut total_successes = 0;
        let mut per_key: BTreeMap<ComponentKey, Acc> = BTreeMap::new();

        for row in rows {
            let acc = per_key.entry(row.key).or_default();
            acc.invocations += 1;
            if row.success {
                acc.successes += 1;
                total_successes += 1;
            }
            if let Some(ms) = row.duration_ms {
                acc.duration_total = acc.duration_total.saturating_add(ms);
                acc.durations += 1;
            }
            if acc.last_used.is_none_or(|last| row.timestamp > last) {
                acc.last_used = Some(row.timestamp);
            }
        }

        let mut ranking: Vec<ComponentUsage> = per_key
            .into_iter()
            .filter_map(|(key, acc)| {
                Some(ComponentUsage {
                    key,
                    invocations: acc.invocations,
                    successes: acc.successes,
                    avg_duration_ms: (acc.durations > 0)
                        .then(|| acc.duration_total as f64 / acc.durations as f64),
                    last_used: acc.last_used?,
                })
            })
            .collect();
        // Stable sort over key-ordered input keeps ties in key order
        ranking.sort_by(|a, b| b.invocations.cmp(&a.invocations));

        Self {
            window_start,
            total_invocations,
            total_successes,
            ranking,
        }
    }
}

/// Read-side aggregation over invocation and installation history
pub struct UsageService<'a> {
    db: &'a Database,
}

impl<'a> UsageService<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub fn stats(&self, window: UsageWindow, now: DateTime<Utc>) -> Result<UsageStats> {
        let start = window.start(now);
        let rows = self.db.invocations_since(start)?;
        Ok(UsageStats::from_rows(start, rows))
    }

    /// Installation events in the window, oldest first
    pub fn timeline(&self, window: UsageWindow, now: DateTime<Utc>) -> Result<Vec<InstallEvent>> {
        Ok(self.db.install_events_since(window.start(now))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tooldex_types::{ComponentKind, Platform};

    fn row(name: &str, ts: DateTime<Utc>, success: bool, duration_ms: Option<u64>) -> InvocationRow {
        InvocationRow {
            key: ComponentKey::new(Platform::Claude, name, ComponentKind::Skill),
            session_id: None,
            timestamp: ts,
            duration_ms,
            success,
        }
    }

    #[test]
    fn test_window_bounds() {
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();

        assert_eq!(UsageWindow::days(0), UsageWindow::AllTime);
        assert_eq!(UsageWindow::AllTime.start(now), None);
        assert_eq!(UsageWindow::Last(Duration::zero()).start(now), None);
        assert_eq!(
            UsageWindow::days(7).start(now),
            Some(Utc.with_ymd_and_hms(2025, 3, 3, 12, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_ranking_breaks_ties_by_key() {
        let t = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let rows = vec![
            row("zeta", t, true, Some(10)),
            row("alpha", t, false, None),
            row("mid", t, true, Some(10)),
            row("mid", t + Duration::hours(1), true, Some(30)),
        ];

        let stats = UsageStats::from_rows(None, rows);

        let names: Vec<_> = stats.ranking.iter().map(|u| u.key.name.as_str()).collect();
        assert_eq!(names, vec!["mid", "alpha", "zeta"]);
        assert_eq!(stats.total_invocations, 4);
        assert_eq!(stats.total_successes, 3);

        let mid = &stats.ranking[0];
        assert_eq!(mid.avg_duration_ms, Some(20.0));
        assert_eq!(mid.last_used, t + Duration::hours(1));
        assert_eq!(stats.ranking[1].avg_duration_ms, None);
        assert_eq!(stats.ranking[1].success_rate(), 0.0);
        assert_eq!(stats.top(10).len(), 3);
        assert_eq!(stats.top(1)[0].key.name, "mid");
    }
}
