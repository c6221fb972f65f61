use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

pub mod audit;
pub mod chain;
pub mod constants;
pub mod error;
pub mod stats;
pub mod store;
pub mod verdict;

pub use audit::{AuditLog, Submission};
pub use chain::{verify_sequence, ChainEvent, ChainSnapshot, ChainStore, Verification};
pub use error::{AuditError, Result};
pub use stats::{Stats, StatsAggregator};
pub use store::{KvStore, MemoryStore};
pub use verdict::{Tier, Verdict};

use constants::{HASH_DISPLAY_LENGTH, UNKNOWN};

/// A classification result as handed over by the classifier service.
///
/// Every field is optional on the wire so that a missing field can be named
/// in the rejection instead of failing deserialization wholesale.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    pub plastic_type: Option<String>,
    pub contamination: Option<String>,
    pub recyclability_score: Option<i64>,
}

impl ScanResult {
    pub fn new(plastic_type: &str, contamination: &str, recyclability_score: i64) -> Self {
        Self {
            plastic_type: Some(plastic_type.to_string()),
            contamination: Some(contamination.to_string()),
            recyclability_score: Some(recyclability_score),
        }
    }

    /// Fill absent fields with `"Unknown"` / `0`. Meant for lenient front ends
    /// only; the chain itself never substitutes values.
    pub fn or_defaults(self) -> Self {
        let fill = |v: Option<String>| match v {
            Some(s) if !s.is_empty() => s,
            _ => UNKNOWN.to_string(),
        };
        Self {
            plastic_type: Some(fill(self.plastic_type)),
            contamination: Some(fill(self.contamination)),
            recyclability_score: Some(self.recyclability_score.unwrap_or(0)),
        }
    }

    /// Borrow the three required fields, rejecting the first one that is
    /// absent. Empty strings count as absent.
    pub fn require(&self) -> Result<(&str, &str, i64)> {
        let plastic_type = match self.plastic_type.as_deref() {
            Some(s) if !s.is_empty() => s,
            _ => return Err(AuditError::MissingField("plastic_type")),
        };
        let contamination = match self.contamination.as_deref() {
            Some(s) if !s.is_empty() => s,
            _ => return Err(AuditError::MissingField("contamination")),
        };
        let score = self
            .recyclability_score
            .ok_or(AuditError::MissingField("recyclability_score"))?;
        Ok((plastic_type, contamination, score))
    }
}

/// One entry of the audit chain. Field names serialize in camelCase, which is
/// both the persisted layout and the export format.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub block_number: u64,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    pub plastic_type: String,
    pub contamination: String,
    pub recyclability_score: i64,
    pub hash: String,
    pub previous_hash: String,
}

impl Block {
    pub fn new(
        block_number: u64,
        timestamp: u64,
        plastic_type: &str,
        contamination: &str,
        recyclability_score: i64,
        previous_hash: &str,
    ) -> Self {
        let hash = digest_hex(
            data_string(plastic_type, recyclability_score, timestamp, previous_hash).as_bytes(),
        );
        Self {
            block_number,
            timestamp,
            plastic_type: plastic_type.to_string(),
            contamination: contamination.to_string(),
            recyclability_score,
            hash,
            previous_hash: previous_hash.to_string(),
        }
    }

    pub fn data_string(&self) -> String {
        data_string(
            &self.plastic_type,
            self.recyclability_score,
            self.timestamp,
            &self.previous_hash,
        )
    }

    /// Recompute the digest from the stored fields.
    pub fn compute_hash(&self) -> String {
        digest_hex(self.data_string().as_bytes())
    }

    pub fn is_self_consistent(&self) -> bool {
        self.compute_hash() == self.hash
    }

    /// Truncated hash for display, e.g. `4118d141b08b0a92...`.
    pub fn short_hash(&self) -> String {
        let end = self.hash.len().min(HASH_DISPLAY_LENGTH);
        format!("{}...", &self.hash[..end])
    }
}

/// Canonical hashing input: the four fields concatenated with no delimiter.
/// Contamination is deliberately not part of it.
pub fn data_string(
    plastic_type: &str,
    recyclability_score: i64,
    timestamp: u64,
    previous_hash: &str,
) -> String {
    format!("{plastic_type}{recyclability_score}{timestamp}{previous_hash}")
}

/// SHA-256 as lowercase hex.
pub fn digest_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Result of a mutating operation whose persistence step may have failed.
/// The in-memory value is authoritative either way.
#[derive(Clone, Debug)]
pub struct Persisted<T> {
    pub value: T,
    pub warning: Option<String>,
}

impl<T> Persisted<T> {
    pub fn is_durable(&self) -> bool {
        self.warning.is_none()
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{GENESIS_HASH, HASH_HEX_SIZE};

    #[test]
    fn data_string_example() {
        let s = data_string("PET", 92, 1_600_000_000_000, GENESIS_HASH);
        assert_eq!(s, "PET9216000000000000000");
    }

    #[test]
    fn data_string_keeps_negative_scores_verbatim() {
        let s = data_string("PET", -5, 1_600_000_000_000, GENESIS_HASH);
        assert_eq!(s, "PET-516000000000000000");
    }

    #[test]
    fn digest_hex_empty_input() {
        assert_eq!(
            digest_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn block_hash_example() {
        let block = Block::new(1, 1_600_000_000_000, "PET", "Low", 92, GENESIS_HASH);
        assert_eq!(
            block.hash,
            "4118d141b08b0a924d20144ad4093dc715aa475ba7c669a23ba2395b0fc6f7a3"
        );
        assert_eq!(block.hash.len(), HASH_HEX_SIZE);
        assert_eq!(block.previous_hash, GENESIS_HASH);
    }

    #[test]
    fn linked_block_hash_example() {
        let first = Block::new(1, 1_600_000_000_000, "PET", "Low", 92, GENESIS_HASH);
        let second = Block::new(2, 1_600_000_000_100, "HDPE", "High", 45, &first.hash);
        assert_eq!(
            second.hash,
            "c0b62d0be5c95dd45424dd0efeaca0182010125f303659404f9f474599de6f70"
        );
    }

    #[test]
    fn contamination_does_not_affect_hash() {
        let a = Block::new(1, 42, "PP", "Low", 70, GENESIS_HASH);
        let b = Block::new(1, 42, "PP", "High", 70, GENESIS_HASH);
        assert_eq!(a.hash, b.hash);
    }

    #[test]
    fn tampered_block_is_detected() {
        let mut block = Block::new(1, 42, "PP", "Low", 70, GENESIS_HASH);
        assert!(block.is_self_consistent());
        block.recyclability_score = 99;
        assert!(!block.is_self_consistent());
    }

    #[test]
    fn short_hash_truncates() {
        let block = Block::new(1, 1_600_000_000_000, "PET", "Low", 92, GENESIS_HASH);
        assert_eq!(block.short_hash(), "4118d141b08b0a92...");
    }

    #[test]
    fn block_serializes_camel_case() {
        let block = Block::new(3, 7, "PS", "Medium", 30, GENESIS_HASH);
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["blockNumber"], 3);
        assert_eq!(json["plasticType"], "PS");
        assert_eq!(json["recyclabilityScore"], 30);
        assert_eq!(json["previousHash"], GENESIS_HASH);
        let back: Block = serde_json::from_value(json).unwrap();
        assert_eq!(back, block);
    }

    #[test]
    fn require_names_missing_field() {
        let mut scan = ScanResult::new("PET", "Low", 80);
        assert!(scan.require().is_ok());

        scan.contamination = None;
        match scan.require() {
            Err(AuditError::MissingField(field)) => assert_eq!(field, "contamination"),
            other => panic!("unexpected: {other:?}"),
        }

        scan.plastic_type = Some(String::new());
        assert!(matches!(
            scan.require(),
            Err(AuditError::MissingField("plastic_type"))
        ));
    }

    #[test]
    fn scan_result_from_wire_with_missing_score() {
        let scan: ScanResult =
            serde_json::from_str(r#"{"plastic_type":"PET","contamination":"Low"}"#).unwrap();
        assert!(matches!(
            scan.require(),
            Err(AuditError::MissingField("recyclability_score"))
        ));
    }

    #[test]
    fn or_defaults_fills_gaps() {
        let scan = ScanResult {
            plastic_type: None,
            contamination: Some(String::new()),
            recyclability_score: None,
        }
        .or_defaults();
        assert_eq!(scan.require().unwrap(), ("Unknown", "Unknown", 0));
    }
}
