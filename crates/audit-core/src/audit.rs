//! The append-then-record pipeline driven by each classification result.

use crate::chain::ChainStore;
use crate::error::{AuditError, Result};
use crate::stats::{Stats, StatsAggregator};
use crate::store::KvStore;
use crate::verdict::Verdict;
use crate::{Block, Persisted, ScanResult};
use serde::Serialize;
use std::sync::Arc;

#[derive(Clone, Debug, Serialize)]
pub struct Submission {
    pub block: Block,
    pub stats: Stats,
    pub average: i64,
    pub verdict: Verdict,
    /// Persistence failures; empty when everything reached storage.
    pub warnings: Vec<String>,
}

/// Chain and statistics sharing one backing store.
pub struct AuditLog<S: KvStore> {
    chain: ChainStore<S>,
    stats: StatsAggregator<S>,
}

impl<S: KvStore> AuditLog<S> {
    pub fn open(kv: Arc<S>) -> Self {
        Self {
            chain: ChainStore::load(kv.clone()),
            stats: StatsAggregator::load(kv),
        }
    }

    pub fn chain(&self) -> &ChainStore<S> {
        &self.chain
    }

    pub fn chain_mut(&mut self) -> &mut ChainStore<S> {
        &mut self.chain
    }

    pub fn stats(&self) -> Stats {
        self.stats.stats()
    }

    /// Append a block, then fold its score into the statistics. A rejected
    /// result touches neither.
    pub fn submit(&mut self, scan: &ScanResult, timestamp: u64) -> Result<Submission> {
        let (_, _, score) = scan.require()?;
        if !self.stats.accepts(score) {
            return Err(AuditError::ScoreOverflow(score));
        }
        let appended = self.chain.append(scan, timestamp)?;
        let block = appended.value;
        let recorded = self.stats.record(block.recyclability_score)?;
        let warnings = [appended.warning, recorded.warning]
            .into_iter()
            .flatten()
            .collect();
        Ok(Submission {
            verdict: Verdict::assess(
                &block.plastic_type,
                block.recyclability_score,
                &block.contamination,
            ),
            stats: recorded.value,
            average: recorded.value.average(),
            block,
            warnings,
        })
    }

    /// Clear the chain only; statistics keep their full history.
    pub fn clear_chain(&mut self) -> Persisted<()> {
        self.chain.clear()
    }
}
