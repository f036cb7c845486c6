//! Background tasks launched during startup.

use crate::store::MemoryStore;

const PURGE_INTERVAL_SECS: u64 = 60;

/// Periodically drops expired entries from the in-process store.
///
/// Expired entries are already invisible to readers; this only bounds memory
/// for keys that are never read again (e.g. abandoned verification sessions).
pub fn spawn_memory_store_purge(store: MemoryStore) {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(std::time::Duration::from_secs(PURGE_INTERVAL_SECS)).await;
            let n = store.purge_expired().await;
            if n > 0 {
                log::debug!("Purged expired store entries: {n}");
            }
        }
    });
}
