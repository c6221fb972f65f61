pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;
pub const HASH_DISPLAY_LENGTH: usize = 16;
/// `previousHash` of the first block after startup or a clear. Not a real digest.
pub const GENESIS_HASH: &str = "0000";
pub const RETENTION_CAP: usize = 100;
pub const RECYCLABLE_THRESHOLD: i64 = 50;
pub const CHAIN_KEY: &str = "plastisure/chain";
pub const STATS_KEY: &str = "plastisure/statistics";
pub const EXPORT_FILE_PREFIX: &str = "plastisure-audit-log-";
pub const UNKNOWN: &str = "Unknown";
/// Per-subscriber queue depth for chain change notifications.
pub const EVENT_BUFFER: usize = 64;
