use crate::config::ShenlongSettings;
use crate::domain::{Credentials, PoolError, ProviderName, ProxyLease, Result};
use crate::ports::{LeaseCachePort, ProxyProviderPort, VendorApiPort};
use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

use super::excerpt;

const DEFAULT_API_BASE: &str = "http://api.shenlongip.com";
const ENVELOPE_OK: i64 = 200;
const ENVELOPE_BAD_CREDENTIALS: i64 = 401;
const EXPIRE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Deserialize)]
struct IpEnvelope {
    code: i64,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    data: Vec<IpEntry>,
}

#[derive(Debug, Deserialize)]
struct IpEntry {
    ip: String,
    port: u16,
    expire: String,
}

/// Lease provider for the Shenlong IP vendor.
///
/// Shenlong answers `GET /ip` with a JSON envelope whose `data` entries
/// carry an `expire` wall-clock string in the vendor's local timezone.
pub struct ShenlongProvider {
    settings: ShenlongSettings,
    api_base: Url,
    api: Arc<dyn VendorApiPort>,
    cache: Arc<dyn LeaseCachePort>,
}

impl ShenlongProvider {
    pub fn new(
        settings: ShenlongSettings,
        api: Arc<dyn VendorApiPort>,
        cache: Arc<dyn LeaseCachePort>,
    ) -> Self {
        Self {
            settings,
            api_base: Url::parse(DEFAULT_API_BASE).unwrap(),
            api,
            cache,
        }
    }

    /// Point the provider at a different API host, for gateways and tests.
    pub fn with_api_base(mut self, api_base: Url) -> Self {
        self.api_base = api_base;
        self
    }

    // Per-call URL; concurrent acquisitions never share request state.
    fn endpoint(&self, count: usize) -> Result<Url> {
        let mut url = self
            .api_base
            .join("/ip")
            .map_err(|err| PoolError::VendorTransport(err.to_string()))?;
        url.query_pairs_mut()
            .append_pair("key", &self.settings.key)
            .append_pair("protocol", "2")
            .append_pair("mr", "1")
            .append_pair("pattern", "json")
            .append_pair("sign", &self.settings.sign)
            .append_pair("count", &count.to_string())
            .finish();
        Ok(url)
    }

    fn build_lease(&self, entry: &IpEntry) -> Result<ProxyLease> {
        if entry.ip.is_empty() {
            return Err(PoolError::MalformedRecord(
                "record is missing an ip".to_string(),
            ));
        }
        if entry.port == 0 {
            return Err(PoolError::MalformedRecord(format!(
                "{}: port 0 is not routable",
                entry.ip
            )));
        }
        let expires_at = parse_expire(&entry.expire)?;
        Ok(ProxyLease::new(
            entry.ip.clone(),
            entry.port,
            Credentials::new(self.settings.username.clone(), self.settings.password.clone()),
            expires_at,
        ))
    }
}

/// Parse the vendor's `YYYY-MM-DD HH:MM:SS` expiry, interpreted in the
/// local timezone the vendor quotes it in.
fn parse_expire(raw: &str) -> Result<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(raw, EXPIRE_FORMAT)
        .map_err(|err| PoolError::DateTimeParse(format!("{:?}: {}", raw, err)))?;
    let local = naive
        .and_local_timezone(Local)
        .earliest()
        .ok_or_else(|| PoolError::DateTimeParse(format!("{:?}: not a valid local time", raw)))?;
    Ok(local.with_timezone(&Utc))
}

#[async_trait]
impl ProxyProviderPort for ShenlongProvider {
    async fn acquire(&self, count: usize) -> Result<Vec<ProxyLease>> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let mut leases = match self.cache.load_valid(self.vendor()).await {
            Ok(cached) => cached,
            Err(err) => {
                warn!("Lease cache unavailable, falling back to a full fetch: {}", err);
                Vec::new()
            }
        };

        if leases.len() >= count {
            debug!("Served {} {} leases from cache", count, self.vendor());
            leases.truncate(count);
            return Ok(leases);
        }

        let shortfall = count - leases.len();
        debug!(
            "Fetching {} leases from {} ({} already cached)",
            shortfall,
            self.vendor(),
            leases.len()
        );

        let url = self.endpoint(shortfall)?;
        let response = self.api.fetch(&url).await?;
        if response.status != 200 {
            return Err(PoolError::VendorTransport(format!(
                "HTTP {} from {}: {}",
                response.status,
                self.vendor(),
                excerpt(&response.body)
            )));
        }

        let envelope: IpEnvelope = serde_json::from_str(&response.body).map_err(|err| {
            PoolError::MalformedRecord(format!(
                "undecodable envelope: {} ({})",
                err,
                excerpt(&response.body)
            ))
        })?;

        match envelope.code {
            ENVELOPE_OK => {}
            ENVELOPE_BAD_CREDENTIALS => return Err(PoolError::VendorAuth(envelope.msg)),
            code => {
                return Err(PoolError::VendorEnvelope {
                    code,
                    message: envelope.msg,
                })
            }
        }

        for entry in &envelope.data {
            let lease = self.build_lease(entry)?;
            let ttl = match lease.remaining_ttl() {
                Some(ttl) if !ttl.is_zero() => ttl,
                _ => {
                    return Err(PoolError::MalformedRecord(format!(
                        "{} was already expired on arrival",
                        lease
                    )))
                }
            };
            if let Err(err) = self.cache.store(&lease.cache_key(self.vendor()), &lease, ttl).await {
                warn!("Failed to cache lease {}: {}", lease, err);
            }
            leases.push(lease);
        }

        if leases.len() < count {
            return Err(PoolError::ShortSupply {
                requested: count,
                available: leases.len(),
            });
        }
        leases.truncate(count);
        Ok(leases)
    }

    fn vendor(&self) -> ProviderName {
        ProviderName::Shenlong
    }
}
