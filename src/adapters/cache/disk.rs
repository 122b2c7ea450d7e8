use crate::domain::{PoolError, ProviderName, ProxyLease, Result};
use crate::ports::LeaseCachePort;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DiskEntry {
    key: String,
    lease: ProxyLease,
    evict_at: DateTime<Utc>,
}

/// Lease cache backed by a JSON file, so live leases survive restarts.
///
/// The whole file is rewritten on every store; writes are serialized by
/// holding the entry lock across the rewrite.
#[derive(Debug)]
pub struct JsonFileLeaseCache {
    path: PathBuf,
    entries: RwLock<Vec<DiskEntry>>,
}

impl JsonFileLeaseCache {
    /// Load the cache file, dropping entries that expired while the
    /// process was down. A missing file is an empty cache; an unreadable
    /// or corrupt one is reported as `CacheUnavailable`.
    pub fn open(path: PathBuf) -> Result<Self> {
        let entries = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str::<Vec<DiskEntry>>(&contents)
                .map_err(|err| PoolError::CacheUnavailable(format!("{}: {}", path.display(), err)))?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(err) => {
                return Err(PoolError::CacheUnavailable(format!(
                    "{}: {}",
                    path.display(),
                    err
                )))
            }
        };

        let now = Utc::now();
        let entries = entries
            .into_iter()
            .filter(|entry| entry.evict_at > now && !entry.lease.is_expired())
            .collect();

        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    async fn persist(&self, entries: &[DiskEntry]) -> Result<()> {
        let payload = serde_json::to_string_pretty(entries)
            .map_err(|err| PoolError::CacheUnavailable(err.to_string()))?;
        tokio::fs::write(&self.path, payload)
            .await
            .map_err(|err| PoolError::CacheUnavailable(format!("{}: {}", self.path.display(), err)))
    }
}

#[async_trait]
impl LeaseCachePort for JsonFileLeaseCache {
    async fn load_valid(&self, vendor: ProviderName) -> Result<Vec<ProxyLease>> {
        let namespace = format!("{}_", vendor.as_str());
        let now = Utc::now();

        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|entry| {
                entry.key.starts_with(&namespace)
                    && entry.evict_at > now
                    && !entry.lease.is_expired()
            })
            .map(|entry| entry.lease.clone())
            .collect())
    }

    async fn store(&self, key: &str, lease: &ProxyLease, ttl: Duration) -> Result<()> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|err| PoolError::CacheUnavailable(format!("ttl out of range: {}", err)))?;
        let now = Utc::now();

        let mut entries = self.entries.write().await;
        entries.retain(|entry| entry.evict_at > now && entry.key != key);
        entries.push(DiskEntry {
            key: key.to_string(),
            lease: lease.clone(),
            evict_at: now + ttl,
        });

        self.persist(&entries).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Credentials;
    use chrono::Duration as ChronoDuration;
    use tokio::time::sleep;

    fn lease(ip: &str, port: u16) -> ProxyLease {
        ProxyLease::new(
            ip.to_string(),
            port,
            Credentials::new("user".to_string(), "pass".to_string()),
            Utc::now() + ChronoDuration::hours(1),
        )
    }

    #[tokio::test]
    async fn test_leases_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leases.json");
        let stored = lease("1.2.3.4", 8080);

        {
            let cache = JsonFileLeaseCache::open(path.clone()).unwrap();
            cache
                .store(
                    &stored.cache_key(ProviderName::Shenlong),
                    &stored,
                    Duration::from_secs(60),
                )
                .await
                .unwrap();
        }

        let reopened = JsonFileLeaseCache::open(path).unwrap();
        let loaded = reopened.load_valid(ProviderName::Shenlong).await.unwrap();
        assert_eq!(loaded, vec![stored]);
    }

    #[tokio::test]
    async fn test_entries_expired_while_down_are_dropped_on_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leases.json");
        let stored = lease("1.2.3.4", 8080);

        {
            let cache = JsonFileLeaseCache::open(path.clone()).unwrap();
            cache
                .store(
                    &stored.cache_key(ProviderName::Shenlong),
                    &stored,
                    Duration::from_millis(30),
                )
                .await
                .unwrap();
        }

        sleep(Duration::from_millis(60)).await;

        let reopened = JsonFileLeaseCache::open(path).unwrap();
        let loaded = reopened.load_valid(ProviderName::Shenlong).await.unwrap();
        assert!(loaded.is_empty());
    }

    #[tokio::test]
    async fn test_missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cache = JsonFileLeaseCache::open(dir.path().join("absent.json")).unwrap();

        let loaded = cache.load_valid(ProviderName::Shenlong).await.unwrap();
        assert!(loaded.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leases.json");
        std::fs::write(&path, "not json at all").unwrap();

        let err = JsonFileLeaseCache::open(path).unwrap_err();
        assert!(matches!(err, PoolError::CacheUnavailable(_)));
    }

    #[tokio::test]
    async fn test_restoring_a_key_keeps_a_single_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leases.json");
        let stored = lease("1.2.3.4", 8080);
        let key = stored.cache_key(ProviderName::Shenlong);

        let cache = JsonFileLeaseCache::open(path).unwrap();
        cache.store(&key, &stored, Duration::from_secs(10)).await.unwrap();
        cache.store(&key, &stored, Duration::from_secs(60)).await.unwrap();

        let loaded = cache.load_valid(ProviderName::Shenlong).await.unwrap();
        assert_eq!(loaded, vec![stored]);
    }
}
