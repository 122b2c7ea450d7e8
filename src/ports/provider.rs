use crate::domain::{ProviderName, ProxyLease, Result};
use async_trait::async_trait;

/// Port for acquiring proxy leases from a vendor.
#[async_trait]
pub trait ProxyProviderPort: Send + Sync {
    /// Acquire exactly `count` usable leases, drawing from the cache
    /// first and fetching the shortfall from the vendor API.
    ///
    /// Returns `ShortSupply` when fewer than `count` leases could be
    /// produced; the result is never silently truncated.
    async fn acquire(&self, count: usize) -> Result<Vec<ProxyLease>>;

    /// The vendor this provider leases from.
    fn vendor(&self) -> ProviderName;
}
