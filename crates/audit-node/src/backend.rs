use anyhow::Result;
use audit_core::{KvStore, MemoryStore};
use audit_storage::SledStore;

/// Storage selected at startup: sled on disk, or memory with `--ephemeral`.
pub enum Backend {
    Sled(SledStore),
    Memory(MemoryStore),
}

impl KvStore for Backend {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match self {
            Backend::Sled(s) => s.get(key),
            Backend::Memory(m) => m.get(key),
        }
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        match self {
            Backend::Sled(s) => s.put(key, value),
            Backend::Memory(m) => m.put(key, value),
        }
    }

    fn remove(&self, key: &str) -> Result<()> {
        match self {
            Backend::Sled(s) => s.remove(key),
            Backend::Memory(m) => m.remove(key),
        }
    }
}
