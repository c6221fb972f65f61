use anyhow::{Context, Result};
use audit_core::KvStore;
use sled::{Db, Tree};
use std::path::Path;
use tracing::{debug, info};

const TREE_RECORDS: &str = "records";

/// sled-backed `KvStore`. Every write is flushed before returning so a
/// record is either fully on disk or the previous one still is.
#[derive(Clone)]
pub struct SledStore {
  db: Db,
  records: Tree,
}

impl SledStore {
  pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
    let path = path.as_ref();
    let db = sled::open(path).with_context(|| format!("open sled db at {}", path.display()))?;
    let records = db.open_tree(TREE_RECORDS).context("open records tree")?;
    info!(path = %path.display(), "sled store opened");
    Ok(Self { db, records })
  }

  pub fn len(&self) -> usize {
    self.records.len()
  }

  pub fn is_empty(&self) -> bool {
    self.records.is_empty()
  }

  /// Remove every record.
  pub fn clear(&self) -> Result<()> {
    self.records.clear()?;
    self.db.flush()?;
    Ok(())
  }

  pub fn close(&self) -> Result<()> {
    self.db.flush()?;
    Ok(())
  }
}

impl KvStore for SledStore {
  fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
    Ok(self.records.get(key)?.map(|v| v.to_vec()))
  }

  fn put(&self, key: &str, value: &[u8]) -> Result<()> {
    self.records.insert(key, value)?;
    self.records.flush()?;
    debug!(key, bytes = value.len(), "record written");
    Ok(())
  }

  fn remove(&self, key: &str) -> Result<()> {
    self.records.remove(key)?;
    self.records.flush()?;
    Ok(())
  }
}
