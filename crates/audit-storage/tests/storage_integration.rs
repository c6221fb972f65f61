mod helpers;

use audit_core::constants::{CHAIN_KEY, GENESIS_HASH, RETENTION_CAP, STATS_KEY};
use audit_core::{AuditLog, ChainStore, KvStore, ScanResult, StatsAggregator, Verification};
use audit_storage::SledStore;
use helpers::{create_temp_dir, create_temp_store, teardown_store};
use rand::Rng;
use std::sync::Arc;

#[tokio::test]
async fn test_chain_persists_across_reopen() -> anyhow::Result<()> {
    let (temp_dir, db_path) = create_temp_dir();
    let expected;

    // Append a handful of blocks and drop the store
    {
        let store = Arc::new(SledStore::open(&db_path)?);
        let mut chain = ChainStore::load(store.clone());
        for (i, kind) in ["PET", "HDPE", "PP", "PS"].into_iter().enumerate() {
            chain.append(&ScanResult::new(kind, "Low", 60 + i as i64), 1_000 + i as u64)?;
        }
        expected = chain.snapshot().clone();
        store.close()?;
    }

    // Re-open and verify the chain comes back identical and intact
    {
        let store = Arc::new(SledStore::open(&db_path)?);
        let chain = ChainStore::load(store);
        assert_eq!(chain.snapshot(), &expected);
        assert_eq!(chain.len(), 4);
        assert_eq!(chain.head().unwrap().plastic_type, "PS");
        assert!(chain.verify());
    }

    temp_dir.close()?;
    Ok(())
}

#[tokio::test]
async fn test_statistics_persist_independently() -> anyhow::Result<()> {
    let (temp_dir, db_path) = create_temp_dir();

    {
        let store = Arc::new(SledStore::open(&db_path)?);
        let mut stats = StatsAggregator::load(store.clone());
        for score in [80, 45, 10] {
            stats.record(score)?;
        }
        store.close()?;
    }

    {
        let store = Arc::new(SledStore::open(&db_path)?);
        // No chain record was ever written
        assert!(store.get(CHAIN_KEY)?.is_none());
        let stats = StatsAggregator::load(store).stats();
        assert_eq!(stats.total_scans, 3);
        assert_eq!(stats.recyclable_items, 1);
        assert_eq!(stats.total_score, 135);
        assert_eq!(stats.average(), 45);
    }

    temp_dir.close()?;
    Ok(())
}

#[tokio::test]
async fn test_empty_database_loads_zero_state() -> anyhow::Result<()> {
    let (temp_dir, store) = create_temp_store();
    let store = Arc::new(store);
    let log = AuditLog::open(store.clone());
    assert!(log.chain().is_empty());
    assert_eq!(log.chain().previous_hash(), GENESIS_HASH);
    assert_eq!(log.stats().total_scans, 0);
    assert!(store.is_empty());
    drop(log);
    let store = Arc::try_unwrap(store).map_err(|_| anyhow::anyhow!("store still shared"))?;
    teardown_store(temp_dir, store);
    Ok(())
}

#[tokio::test]
async fn test_corrupt_records_fall_back_gracefully() -> anyhow::Result<()> {
    let (temp_dir, db_path) = create_temp_dir();

    // 1) Write a valid chain and statistics
    {
        let store = Arc::new(SledStore::open(&db_path)?);
        let mut log = AuditLog::open(store.clone());
        log.submit(&ScanResult::new("PET", "Low", 90), 1)?;
        store.close()?;
    }

    // 2) Overwrite both records with invalid bytes through raw sled
    {
        let sled_db = sled::open(&db_path)?;
        let records = sled_db.open_tree("records")?;
        let previous = records.insert(CHAIN_KEY, vec![0u8; 10])?;
        assert!(previous.is_some(), "Expected to overwrite the chain record");
        records.insert(STATS_KEY, &b"{\"totalScans\":"[..])?;
        sled_db.flush()?;
    }

    // 3) Loading must not fail; both components start from empty state
    let store = Arc::new(SledStore::open(&db_path)?);
    let log = AuditLog::open(store);
    assert!(log.chain().is_empty());
    assert_eq!(log.chain().previous_hash(), GENESIS_HASH);
    assert_eq!(log.stats().total_scans, 0);

    temp_dir.close()?;
    Ok(())
}

#[tokio::test]
async fn test_retention_cap_with_full_history_statistics() -> anyhow::Result<()> {
    let (temp_dir, db_path) = create_temp_dir();
    let mut rng = rand::thread_rng();

    {
        let store = Arc::new(SledStore::open(&db_path)?);
        let mut log = AuditLog::open(store.clone());
        for ts in 0..=RETENTION_CAP as u64 {
            let score = rng.gen_range(0..=100);
            log.submit(&ScanResult::new("LDPE", "Medium", score), ts)?;
        }
        store.close()?;
    }

    let store = Arc::new(SledStore::open(&db_path)?);
    let log = AuditLog::open(store);
    assert_eq!(log.chain().len(), RETENTION_CAP);
    assert_eq!(log.stats().total_scans, RETENTION_CAP as u64 + 1);
    let blocks: Vec<_> = log.chain().blocks().iter().collect();
    for pair in blocks.windows(2) {
        assert_eq!(pair[0].previous_hash, pair[1].hash);
    }
    assert_eq!(log.chain().verify_report(), Verification::Valid);

    temp_dir.close()?;
    Ok(())
}

#[tokio::test]
async fn test_clear_is_durable_and_spares_statistics() -> anyhow::Result<()> {
    let (temp_dir, db_path) = create_temp_dir();

    {
        let store = Arc::new(SledStore::open(&db_path)?);
        let mut log = AuditLog::open(store.clone());
        for (ts, score) in [80, 45, 10].into_iter().enumerate() {
            log.submit(&ScanResult::new("PET", "Low", score), ts as u64)?;
        }
        assert!(log.clear_chain().is_durable());
        store.close()?;
    }

    let store = Arc::new(SledStore::open(&db_path)?);
    let log = AuditLog::open(store);
    assert!(log.chain().is_empty());
    assert_eq!(log.chain().previous_hash(), GENESIS_HASH);
    assert_eq!(log.stats().total_scans, 3);
    assert_eq!(log.stats().total_score, 135);

    temp_dir.close()?;
    Ok(())
}

#[tokio::test]
async fn test_tampering_on_disk_is_detected() -> anyhow::Result<()> {
    let (temp_dir, db_path) = create_temp_dir();

    {
        let store = Arc::new(SledStore::open(&db_path)?);
        let mut chain = ChainStore::load(store.clone());
        for ts in 0..5u64 {
            chain.append(&ScanResult::new("PP", "Low", 70), ts)?;
        }
        store.close()?;
    }

    // Bump one score directly in the persisted JSON
    {
        let store = SledStore::open(&db_path)?;
        let raw = store.get(CHAIN_KEY)?.expect("chain record should exist");
        let mut json: serde_json::Value = serde_json::from_slice(&raw)?;
        json["blocks"][1]["recyclabilityScore"] = serde_json::json!(100);
        store.put(CHAIN_KEY, &serde_json::to_vec(&json)?)?;
        store.close()?;
    }

    let store = Arc::new(SledStore::open(&db_path)?);
    let chain = ChainStore::load(store);
    assert_eq!(chain.len(), 5);
    assert_eq!(
        chain.verify_report(),
        Verification::Corrupted { block_number: 4 }
    );

    temp_dir.close()?;
    Ok(())
}

#[tokio::test]
async fn test_concurrent_writers_behind_a_mutex() -> anyhow::Result<()> {
    use tokio::sync::Mutex;
    use tokio::task;

    let (temp_dir, store) = create_temp_store();
    let store = Arc::new(store);
    let log = Arc::new(Mutex::new(AuditLog::open(store.clone())));
    let mut handles = Vec::new();

    for i in 0..50u64 {
        let log = Arc::clone(&log);
        handles.push(task::spawn(async move {
            let mut log = log.lock().await;
            log.submit(&ScanResult::new("PET", "Low", 50), i).map(|_| ())
        }));
    }
    for handle in handles {
        handle.await??;
    }

    let log = log.lock().await;
    assert_eq!(log.chain().len(), 50);
    assert_eq!(log.stats().total_scans, 50);
    assert_eq!(log.stats().recyclable_items, 50);
    assert!(log.chain().verify());
    drop(log);

    temp_dir.close()?;
    Ok(())
}

#[tokio::test]
async fn test_kv_roundtrip_and_remove() -> anyhow::Result<()> {
    let (temp_dir, store) = create_temp_store();
    store.put("plastisure/other", b"value")?;
    assert_eq!(store.get("plastisure/other")?, Some(b"value".to_vec()));
    assert_eq!(store.len(), 1);
    store.remove("plastisure/other")?;
    assert!(store.get("plastisure/other")?.is_none());
    teardown_store(temp_dir, store);
    Ok(())
}
