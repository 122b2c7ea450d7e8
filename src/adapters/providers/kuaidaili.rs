use crate::config::KuaidailiSettings;
use crate::domain::{Credentials, PoolError, ProviderName, ProxyLease, Result};
use crate::ports::{LeaseCachePort, ProxyProviderPort, VendorApiPort};
use async_trait::async_trait;
use chrono::Utc;
use regex::Regex;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::excerpt;

const DEFAULT_API_BASE: &str = "https://dps.kdlapi.com";
const ENVELOPE_BAD_CREDENTIALS: i64 = 401;
const LEASE_LINE_PATTERN: &str = r"^(\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}):(\d{1,5}),(\d+)$";
// TTLs beyond a year mean the vendor sent garbage, not a lease.
const MAX_LEASE_SECS: u64 = 86_400 * 365;

/// Error envelope Kuaidaili sends even when text format was requested.
#[derive(Debug, Deserialize)]
struct TextModeError {
    code: i64,
    #[serde(default)]
    msg: String,
}

/// Lease provider for the Kuaidaili private-proxy vendor.
///
/// With `f_et=1` the vendor answers `GET /api/getdps` with plain text,
/// one `ip:port,ttl_seconds` record per line. Failures still arrive as
/// a JSON envelope, so that shape is ruled out before line parsing.
pub struct KuaidailiProvider {
    settings: KuaidailiSettings,
    api_base: Url,
    line_pattern: Regex,
    api: Arc<dyn VendorApiPort>,
    cache: Arc<dyn LeaseCachePort>,
}

impl KuaidailiProvider {
    pub fn new(
        settings: KuaidailiSettings,
        api: Arc<dyn VendorApiPort>,
        cache: Arc<dyn LeaseCachePort>,
    ) -> Self {
        Self {
            settings,
            api_base: Url::parse(DEFAULT_API_BASE).unwrap(),
            line_pattern: Regex::new(LEASE_LINE_PATTERN).unwrap(),
            api,
            cache,
        }
    }

    /// Point the provider at a different API host, for gateways and tests.
    pub fn with_api_base(mut self, api_base: Url) -> Self {
        self.api_base = api_base;
        self
    }

    fn endpoint(&self, count: usize) -> Result<Url> {
        let mut url = self
            .api_base
            .join("/api/getdps")
            .map_err(|err| PoolError::VendorTransport(err.to_string()))?;
        url.query_pairs_mut()
            .append_pair("secret_id", &self.settings.secret_id)
            .append_pair("signature", &self.settings.signature)
            .append_pair("num", &count.to_string())
            .append_pair("pt", "1")
            .append_pair("format", "text")
            .append_pair("sep", "1")
            .append_pair("f_et", "1")
            .finish();
        Ok(url)
    }
}

/// Strict parse of one `ip:port,ttl_seconds` record.
///
/// The record must have exactly two colon-delimited fields and match the
/// full-line pattern; anything else is rejected rather than guessed at.
fn parse_lease_line(
    pattern: &Regex,
    line: &str,
    credentials: &Credentials,
) -> Result<(ProxyLease, Duration)> {
    if line.split(':').count() != 2 {
        return Err(PoolError::MalformedRecord(format!(
            "{:?}: expected exactly one ':' separator",
            line
        )));
    }

    let captures = pattern.captures(line).ok_or_else(|| {
        PoolError::MalformedRecord(format!("{:?}: not an ip:port,ttl record", line))
    })?;

    let ip = &captures[1];
    let port: u16 = captures[2]
        .parse()
        .map_err(|_| PoolError::MalformedRecord(format!("{:?}: port out of range", line)))?;
    if port == 0 {
        return Err(PoolError::MalformedRecord(format!(
            "{:?}: port 0 is not routable",
            line
        )));
    }

    let ttl_seconds: u64 = captures[3]
        .parse()
        .map_err(|_| PoolError::MalformedRecord(format!("{:?}: ttl out of range", line)))?;
    if ttl_seconds == 0 || ttl_seconds > MAX_LEASE_SECS {
        return Err(PoolError::MalformedRecord(format!(
            "{:?}: ttl of {}s is not usable",
            line, ttl_seconds
        )));
    }

    let expires_at = Utc::now() + chrono::Duration::seconds(ttl_seconds as i64);
    let lease = ProxyLease::new(ip.to_string(), port, credentials.clone(), expires_at);
    Ok((lease, Duration::from_secs(ttl_seconds)))
}

#[async_trait]
impl ProxyProviderPort for KuaidailiProvider {
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

        if let Ok(envelope) = serde_json::from_str::<TextModeError>(&response.body) {
            return Err(match envelope.code {
                ENVELOPE_BAD_CREDENTIALS => PoolError::VendorAuth(envelope.msg),
                code => PoolError::VendorEnvelope {
                    code,
                    message: envelope.msg,
                },
            });
        }

        let credentials =
            Credentials::new(self.settings.username.clone(), self.settings.password.clone());

        for line in response.body.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (lease, ttl) = parse_lease_line(&self.line_pattern, line, &credentials)?;
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
        ProviderName::Kuaidaili
    }
}
