use crate::constants::{
    CHAIN_KEY, EVENT_BUFFER, EXPORT_FILE_PREFIX, GENESIS_HASH, RETENTION_CAP,
};
use crate::error::{AuditError, Result};
use crate::store::{read_record, write_record, KvStore};
use crate::{Block, Persisted, ScanResult};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TrySendError};
use std::sync::Arc;
use tracing::{info, warn};

/// Persisted form of the chain: blocks newest-first plus the link pointer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainSnapshot {
    pub blocks: VecDeque<Block>,
    pub previous_hash: String,
}

impl Default for ChainSnapshot {
    fn default() -> Self {
        Self {
            blocks: VecDeque::new(),
            previous_hash: GENESIS_HASH.to_string(),
        }
    }
}

/// Sent to subscribers after the chain changed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChainEvent {
    Appended(Block),
    Cleared,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Verification {
    Valid,
    /// First offending block, walking newest to oldest. Block number 0 means
    /// an empty chain whose pointer is not the genesis sentinel.
    Corrupted { block_number: u64 },
}

impl Verification {
    pub fn is_valid(&self) -> bool {
        matches!(self, Verification::Valid)
    }
}

/// Re-walk a newest-first block sequence and recompute every digest.
///
/// `head` is the chain's current pointer, when known; exported files carry
/// no pointer, so pass `None` for those. Only the retained window can be
/// checked: the oldest block's predecessor is gone after trimming, unless that
/// block is number 1, whose predecessor must be the genesis sentinel. An
/// empty sequence must come with the genesis pointer.
pub fn verify_sequence<'a, I>(blocks: I, head: Option<&str>) -> Verification
where
    I: IntoIterator<Item = &'a Block>,
{
    let mut iter = blocks.into_iter().peekable();
    match (head, iter.peek()) {
        (Some(head), Some(newest)) if newest.hash != head => {
            return Verification::Corrupted {
                block_number: newest.block_number,
            };
        }
        (Some(head), None) if head != GENESIS_HASH => {
            return Verification::Corrupted { block_number: 0 };
        }
        _ => {}
    }
    while let Some(block) = iter.next() {
        let linked = match iter.peek() {
            Some(older) => block.previous_hash == older.hash,
            None => block.block_number != 1 || block.previous_hash == GENESIS_HASH,
        };
        if !linked || !block.is_self_consistent() {
            return Verification::Corrupted {
                block_number: block.block_number,
            };
        }
    }
    Verification::Valid
}

pub fn export_file_name(now_ms: u64) -> String {
    format!("{EXPORT_FILE_PREFIX}{now_ms}.json")
}

/// Owns the bounded, newest-first block sequence and the rolling
/// `previousHash` pointer. Single writer: callers on a multi-threaded host
/// wrap it in a mutex.
pub struct ChainStore<S: KvStore> {
    kv: Arc<S>,
    state: ChainSnapshot,
    subscribers: Vec<SyncSender<ChainEvent>>,
}

impl<S: KvStore> ChainStore<S> {
    /// Restore from `kv`, falling back to an empty chain on missing or
    /// malformed state. Never fails.
    pub fn load(kv: Arc<S>) -> Self {
        let mut state: ChainSnapshot = read_record(kv.as_ref(), CHAIN_KEY).unwrap_or_default();
        if state.blocks.len() > RETENTION_CAP {
            warn!(
                len = state.blocks.len(),
                "persisted chain exceeds retention cap, trimming"
            );
            state.blocks.truncate(RETENTION_CAP);
        }
        if state.blocks.is_empty() && state.previous_hash != GENESIS_HASH {
            warn!(
                previous_hash = %state.previous_hash,
                "persisted empty chain has a non-genesis pointer, resetting"
            );
            state.previous_hash = GENESIS_HASH.to_string();
        }
        info!(blocks = state.blocks.len(), "audit chain loaded");
        Self {
            kv,
            state,
            subscribers: Vec::new(),
        }
    }

    pub fn kv(&self) -> &Arc<S> {
        &self.kv
    }

    /// Blocks, newest first.
    pub fn blocks(&self) -> &VecDeque<Block> {
        &self.state.blocks
    }

    pub fn head(&self) -> Option<&Block> {
        self.state.blocks.front()
    }

    pub fn previous_hash(&self) -> &str {
        &self.state.previous_hash
    }

    pub fn snapshot(&self) -> &ChainSnapshot {
        &self.state
    }

    pub fn len(&self) -> usize {
        self.state.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.blocks.is_empty()
    }

    /// Link a new block onto the chain.
    ///
    /// Validation happens before any state is touched, so a rejected result
    /// leaves the chain exactly as it was.
    pub fn append(&mut self, scan: &ScanResult, timestamp: u64) -> Result<Persisted<Block>> {
        let (plastic_type, contamination, score) = scan.require()?;
        let block = Block::new(
            self.state.blocks.len() as u64 + 1,
            timestamp,
            plastic_type,
            contamination,
            score,
            &self.state.previous_hash,
        );

        self.state.previous_hash = block.hash.clone();
        self.state.blocks.push_front(block.clone());
        self.state.blocks.truncate(RETENTION_CAP);
        info!(
            block_number = block.block_number,
            hash = %block.short_hash(),
            "appended audit block"
        );

        let warning = self.persist();
        self.notify(ChainEvent::Appended(block.clone()));
        Ok(Persisted {
            value: block,
            warning,
        })
    }

    /// Drop every block and reset the pointer to the genesis sentinel.
    /// Statistics are not touched.
    pub fn clear(&mut self) -> Persisted<()> {
        self.state = ChainSnapshot::default();
        info!("audit chain cleared");
        let warning = self.persist();
        self.notify(ChainEvent::Cleared);
        Persisted { value: (), warning }
    }

    /// Indented JSON of the in-memory blocks, newest first.
    pub fn export(&self) -> Result<Vec<u8>> {
        if self.state.blocks.is_empty() {
            return Err(AuditError::NothingToExport);
        }
        Ok(serde_json::to_vec_pretty(&self.state.blocks)?)
    }

    pub fn verify(&self) -> bool {
        self.verify_report().is_valid()
    }

    pub fn verify_report(&self) -> Verification {
        verify_sequence(&self.state.blocks, Some(self.state.previous_hash.as_str()))
    }

    /// Receive a `ChainEvent` after every append and clear. Each receiver
    /// buffers up to `EVENT_BUFFER` events; further events are dropped for
    /// that receiver until it drains. Dropped receivers are pruned on the
    /// next event.
    pub fn subscribe(&mut self) -> Receiver<ChainEvent> {
        let (tx, rx) = sync_channel(EVENT_BUFFER);
        self.subscribers.push(tx);
        rx
    }

    fn persist(&self) -> Option<String> {
        write_record(self.kv.as_ref(), CHAIN_KEY, &self.state)
    }

    fn notify(&mut self, event: ChainEvent) {
        self.subscribers
            .retain(|tx| match tx.try_send(event.clone()) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    warn!("chain event subscriber is full, dropping event");
                    true
                }
                Err(TrySendError::Disconnected(_)) => false,
            });
    }
}
