//! Key-value persistence used by the chain and the statistics aggregator.
//!
//! The trait lives in `audit-core` so storage backends depend on the core and
//! not the other way around.

use anyhow::{anyhow, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::warn;

pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    fn put(&self, key: &str, value: &[u8]) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Process-local store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;
        entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;
        entries.remove(key);
        Ok(())
    }
}

/// Read and decode a JSON record. Absent, unreadable and malformed records all
/// come back as `None`; the latter two are logged.
pub(crate) fn read_record<S, T>(kv: &S, key: &str) -> Option<T>
where
    S: KvStore + ?Sized,
    T: DeserializeOwned,
{
    let bytes = match kv.get(key) {
        Ok(Some(bytes)) => bytes,
        Ok(None) => return None,
        Err(err) => {
            warn!(key, error = %err, "failed to read persisted record");
            return None;
        }
    };
    match serde_json::from_slice(&bytes) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(key, error = %err, "malformed persisted record, starting from empty state");
            None
        }
    }
}

/// Encode and write a JSON record. Returns the failure as a warning message
/// instead of an error.
pub(crate) fn write_record<S, T>(kv: &S, key: &str, value: &T) -> Option<String>
where
    S: KvStore + ?Sized,
    T: Serialize,
{
    let result = serde_json::to_vec(value)
        .map_err(anyhow::Error::from)
        .and_then(|bytes| kv.put(key, &bytes));
    match result {
        Ok(()) => None,
        Err(err) => {
            warn!(key, error = %err, "failed to persist record, keeping in-memory state");
            Some(format!("failed to persist `{key}`: {err}"))
        }
    }
}
