use crate::constants::{RECYCLABLE_THRESHOLD, STATS_KEY};
use crate::error::{AuditError, Result};
use crate::store::{read_record, write_record, KvStore};
use crate::Persisted;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Cumulative counters over every score ever recorded. Unlike the chain they
/// are never trimmed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Stats {
    pub total_scans: u64,
    pub recyclable_items: u64,
    pub total_score: i64,
}

impl Stats {
    /// Counters after folding in `score`, or `None` if any of them would
    /// overflow. `self` is left as it was.
    pub fn with_score(&self, score: i64) -> Option<Stats> {
        let recyclable = u64::from(score >= RECYCLABLE_THRESHOLD);
        Some(Stats {
            total_scans: self.total_scans.checked_add(1)?,
            recyclable_items: self.recyclable_items.checked_add(recyclable)?,
            total_score: self.total_score.checked_add(score)?,
        })
    }

    /// Fold in `score`, all counters or none.
    pub fn apply(&mut self, score: i64) -> Result<()> {
        *self = self
            .with_score(score)
            .ok_or(AuditError::ScoreOverflow(score))?;
        Ok(())
    }

    /// `round(total_score / total_scans)` with halves rounded up, 0 when
    /// nothing has been recorded.
    pub fn average(&self) -> i64 {
        if self.total_scans == 0 {
            return 0;
        }
        let n = self.total_scans as i128;
        let t = self.total_score as i128;
        (2 * t + n).div_euclid(2 * n) as i64
    }
}

pub struct StatsAggregator<S: KvStore> {
    kv: Arc<S>,
    stats: Stats,
}

impl<S: KvStore> StatsAggregator<S> {
    /// Restore counters from `kv`; missing or malformed state yields zeros.
    pub fn load(kv: Arc<S>) -> Self {
        let stats: Stats = read_record(kv.as_ref(), STATS_KEY).unwrap_or_default();
        info!(total_scans = stats.total_scans, "statistics loaded");
        Self { kv, stats }
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// Whether `record(score)` would succeed.
    pub fn accepts(&self, score: i64) -> bool {
        self.stats.with_score(score).is_some()
    }

    pub fn record(&mut self, score: i64) -> Result<Persisted<Stats>> {
        self.stats.apply(score)?;
        let warning = write_record(self.kv.as_ref(), STATS_KEY, &self.stats);
        Ok(Persisted {
            value: self.stats,
            warning,
        })
    }

    /// Zero every counter. Clearing the chain does not call this: statistics
    /// outlive log pruning.
    pub fn reset(&mut self) -> Persisted<Stats> {
        self.stats = Stats::default();
        info!("statistics reset");
        let warning = write_record(self.kv.as_ref(), STATS_KEY, &self.stats);
        Persisted {
            value: self.stats,
            warning,
        }
    }
}
