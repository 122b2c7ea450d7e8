use crate::domain::{ProviderName, ProxyLease, Result};
use async_trait::async_trait;
use std::time::Duration;

/// Port for the TTL cache that holds live leases between acquisitions.
#[async_trait]
pub trait LeaseCachePort: Send + Sync {
    /// All unexpired leases stored under the given vendor's namespace,
    /// oldest write first. An empty cache is not an error.
    async fn load_valid(&self, vendor: ProviderName) -> Result<Vec<ProxyLease>>;

    /// Store a lease under `key` for at most `ttl`. Re-storing an
    /// existing key replaces the entry and restarts its TTL.
    async fn store(&self, key: &str, lease: &ProxyLease, ttl: Duration) -> Result<()>;
}
