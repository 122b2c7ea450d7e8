use crate::domain::{ProxyLease, Result};
use async_trait::async_trait;

/// Port for checking that a leased proxy actually relays traffic.
#[async_trait]
pub trait LeaseProbePort: Send + Sync {
    /// `Ok(false)` means the lease is unusable and should be dropped.
    /// `Err` is reserved for probe misconfiguration.
    async fn check(&self, lease: &ProxyLease) -> Result<bool>;
}
