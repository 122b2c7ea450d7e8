use crate::domain::{ProviderName, ProxyLease, Result};
use crate::ports::LeaseCachePort;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

struct StoredLease {
    lease: ProxyLease,
    seq: u64,
    evict_at: Instant,
}

struct Inner {
    entries: HashMap<String, StoredLease>,
    next_seq: u64,
}

/// In-process TTL cache for leases.
///
/// Expired entries are pruned on every write and filtered out of every
/// read, so a lease is never handed out past its TTL even if pruning
/// has not caught up yet.
pub struct MemoryLeaseCache {
    inner: RwLock<Inner>,
}

impl MemoryLeaseCache {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                entries: HashMap::new(),
                next_seq: 0,
            }),
        }
    }
}

impl Default for MemoryLeaseCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LeaseCachePort for MemoryLeaseCache {
    async fn load_valid(&self, vendor: ProviderName) -> Result<Vec<ProxyLease>> {
        let namespace = format!("{}_", vendor.as_str());
        let now = Instant::now();

        let inner = self.inner.read().await;
        let mut live: Vec<(u64, ProxyLease)> = inner
            .entries
            .iter()
            .filter(|(key, stored)| {
                key.starts_with(&namespace) && stored.evict_at > now && !stored.lease.is_expired()
            })
            .map(|(_, stored)| (stored.seq, stored.lease.clone()))
            .collect();

        live.sort_by_key(|(seq, _)| *seq);
        Ok(live.into_iter().map(|(_, lease)| lease).collect())
    }

    async fn store(&self, key: &str, lease: &ProxyLease, ttl: Duration) -> Result<()> {
        let now = Instant::now();

        let mut inner = self.inner.write().await;
        inner.entries.retain(|_, stored| stored.evict_at > now);

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.entries.insert(
            key.to_string(),
            StoredLease {
                lease: lease.clone(),
                seq,
                evict_at: now + ttl,
            },
        );
        Ok(())
    }
}
