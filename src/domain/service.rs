use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{PoolError, ProxyLease, Result};
use crate::ports::{LeaseProbePort, ProxyProviderPort};

/// Tuning for a [`ProxyPool`].
#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    /// How many leases a reload asks the provider for.
    pub capacity: usize,
    /// Probe each freshly acquired lease and drop the ones that fail.
    pub validate: bool,
}

/// A small working set of leases kept ready for handout.
///
/// The pool sits on top of a provider: `reload` acquires a batch and
/// `get` hands out one lease at a time, refilling once when it runs dry.
pub struct ProxyPool {
    provider: Arc<dyn ProxyProviderPort>,
    probe: Arc<dyn LeaseProbePort>,
    config: PoolConfig,
    leases: Mutex<Vec<ProxyLease>>,
}

impl ProxyPool {
    pub fn new(
        provider: Arc<dyn ProxyProviderPort>,
        probe: Arc<dyn LeaseProbePort>,
        config: PoolConfig,
    ) -> Self {
        Self {
            provider,
            probe,
            config,
            leases: Mutex::new(Vec::new()),
        }
    }

    /// Replace the pool contents with a fresh batch from the provider.
    pub async fn reload(&self) -> Result<()> {
        let batch = self.provider.acquire(self.config.capacity).await?;
        let batch = if self.config.validate {
            self.validate_batch(batch).await
        } else {
            batch
        };

        info!(
            "Reloaded {} pool with {} leases",
            self.provider.vendor(),
            batch.len()
        );

        let mut leases = self.leases.lock().await;
        *leases = batch;
        Ok(())
    }

    /// Hand out one live lease, reloading the pool once if it is empty
    /// or holds only expired entries.
    pub async fn get(&self) -> Result<ProxyLease> {
        for attempt in 0..2 {
            if attempt > 0 {
                self.reload().await?;
            }
            let mut leases = self.leases.lock().await;
            while let Some(lease) = leases.pop() {
                if lease.is_expired() {
                    debug!("Discarding expired lease {}", lease);
                    continue;
                }
                return Ok(lease);
            }
        }
        Err(PoolError::ShortSupply {
            requested: 1,
            available: 0,
        })
    }

    pub async fn len(&self) -> usize {
        self.leases.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.leases.lock().await.is_empty()
    }

    async fn validate_batch(&self, batch: Vec<ProxyLease>) -> Vec<ProxyLease> {
        let checks = join_all(batch.iter().map(|lease| self.probe.check(lease))).await;

        batch
            .into_iter()
            .zip(checks)
            .filter_map(|(lease, outcome)| match outcome {
                Ok(true) => Some(lease),
                Ok(false) => {
                    warn!("Dropping lease {} that failed its probe", lease);
                    None
                }
                Err(err) => {
                    warn!("Probe error for lease {}: {}", lease, err);
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Credentials, ProviderName};
    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn lease(ip: &str) -> ProxyLease {
        ProxyLease::new(
            ip.to_string(),
            8080,
            Credentials::default(),
            Utc::now() + ChronoDuration::minutes(5),
        )
    }

    fn expired_lease(ip: &str) -> ProxyLease {
        ProxyLease::new(
            ip.to_string(),
            8080,
            Credentials::default(),
            Utc::now() - ChronoDuration::seconds(1),
        )
    }

    struct StubProvider {
        batches: Mutex<Vec<Vec<ProxyLease>>>,
        calls: AtomicUsize,
    }

    impl StubProvider {
        fn new(batches: Vec<Vec<ProxyLease>>) -> Self {
            Self {
                batches: Mutex::new(batches),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ProxyProviderPort for StubProvider {
        async fn acquire(&self, count: usize) -> Result<Vec<ProxyLease>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut batches = self.batches.lock().await;
            let batch = if batches.is_empty() {
                Vec::new()
            } else {
                batches.remove(0)
            };
            if batch.len() < count {
                return Err(PoolError::ShortSupply {
                    requested: count,
                    available: batch.len(),
                });
            }
            Ok(batch)
        }

        fn vendor(&self) -> ProviderName {
            ProviderName::Shenlong
        }
    }

    struct AlwaysUsable;

    #[async_trait]
    impl LeaseProbePort for AlwaysUsable {
        async fn check(&self, _: &ProxyLease) -> Result<bool> {
            Ok(true)
        }
    }

    struct SelectiveProbe {
        reject_ip: String,
    }

    #[async_trait]
    impl LeaseProbePort for SelectiveProbe {
        async fn check(&self, lease: &ProxyLease) -> Result<bool> {
            Ok(lease.ip != self.reject_ip)
        }
    }

    fn pool_of(provider: Arc<StubProvider>, capacity: usize) -> ProxyPool {
        ProxyPool::new(
            provider,
            Arc::new(AlwaysUsable),
            PoolConfig {
                capacity,
                validate: false,
            },
        )
    }

    #[tokio::test]
    async fn test_get_drains_pool_without_extra_acquisitions() {
        let provider = Arc::new(StubProvider::new(vec![vec![lease("1.1.1.1"), lease("2.2.2.2")]]));
        let pool = pool_of(provider.clone(), 2);

        pool.reload().await.unwrap();
        assert_eq!(pool.len().await, 2);

        pool.get().await.unwrap();
        pool.get().await.unwrap();

        assert_eq!(provider.calls(), 1);
        assert!(pool.is_empty().await);
    }

    #[tokio::test]
    async fn test_get_reloads_once_when_pool_runs_dry() {
        let provider = Arc::new(StubProvider::new(vec![
            vec![lease("1.1.1.1")],
            vec![lease("2.2.2.2")],
        ]));
        let pool = pool_of(provider.clone(), 1);

        pool.reload().await.unwrap();
        pool.get().await.unwrap();

        let refilled = pool.get().await.unwrap();
        assert_eq!(refilled.ip, "2.2.2.2");
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_get_skips_expired_leases() {
        let provider = Arc::new(StubProvider::new(vec![
            vec![expired_lease("1.1.1.1")],
            vec![lease("2.2.2.2")],
        ]));
        let pool = pool_of(provider.clone(), 1);

        pool.reload().await.unwrap();
        let handed_out = pool.get().await.unwrap();

        assert_eq!(handed_out.ip, "2.2.2.2");
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_get_surfaces_short_supply_when_provider_is_dry() {
        let provider = Arc::new(StubProvider::new(vec![]));
        let pool = pool_of(provider, 3);

        let err = pool.get().await.unwrap_err();
        assert!(matches!(err, PoolError::ShortSupply { requested: 3, .. }));
    }

    #[tokio::test]
    async fn test_reload_drops_leases_that_fail_the_probe() {
        let provider = Arc::new(StubProvider::new(vec![vec![
            lease("1.1.1.1"),
            lease("6.6.6.6"),
            lease("2.2.2.2"),
        ]]));
        let pool = ProxyPool::new(
            provider,
            Arc::new(SelectiveProbe {
                reject_ip: "6.6.6.6".to_string(),
            }),
            PoolConfig {
                capacity: 3,
                validate: true,
            },
        );

        pool.reload().await.unwrap();
        assert_eq!(pool.len().await, 2);

        while let Ok(handed_out) = pool.get().await {
            assert_ne!(handed_out.ip, "6.6.6.6");
            if pool.is_empty().await {
                break;
            }
        }
    }
}
