use async_trait::async_trait;
use reqwest::header::HeaderValue;
use std::time::Duration;
use url::Url;

use crate::domain::{PoolError, ProxyLease, Result};
use crate::ports::{LeaseProbePort, VendorApiPort, VendorApiResponse};

const VENDOR_TIMEOUT: Duration = Duration::from_secs(10);
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_PROBE_URL: &str = "http://httpbin.org/ip";

/// Vendor API transport backed by reqwest.
pub struct ReqwestVendorApi;

impl ReqwestVendorApi {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ReqwestVendorApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VendorApiPort for ReqwestVendorApi {
    async fn fetch(&self, url: &Url) -> Result<VendorApiResponse> {
        // Vendor endpoints must be reached directly, never through the
        // proxies they hand out.
        let client = reqwest::Client::builder()
            .no_proxy()
            .timeout(VENDOR_TIMEOUT)
            .build()
            .map_err(|e| PoolError::VendorTransport(format!("Failed to build HTTP client: {}", e)))?;

        let response = client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| PoolError::VendorTransport(format!("HTTP request failed: {}", e)))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| PoolError::VendorTransport(format!("Failed to read response body: {}", e)))?;

        Ok(VendorApiResponse { status, body })
    }
}

/// Checks a lease by routing one request through it.
pub struct ReqwestLeaseProbe {
    probe_url: Url,
}

impl ReqwestLeaseProbe {
    pub fn new(probe_url: Url) -> Self {
        Self { probe_url }
    }
}

impl Default for ReqwestLeaseProbe {
    fn default() -> Self {
        Self::new(Url::parse(DEFAULT_PROBE_URL).unwrap())
    }
}

#[async_trait]
impl LeaseProbePort for ReqwestLeaseProbe {
    async fn check(&self, lease: &ProxyLease) -> Result<bool> {
        let mut proxy = reqwest::Proxy::all(lease.proxy_url())
            .map_err(|e| PoolError::MalformedRecord(format!("Unusable proxy endpoint: {}", e)))?;

        if !lease.credentials.is_empty() {
            proxy = proxy.custom_http_auth(
                HeaderValue::from_str(&lease.credentials.to_basic_auth())
                    .map_err(|e| PoolError::MalformedRecord(format!("{}", e)))?,
            );
        }

        let client = reqwest::Client::builder()
            .proxy(proxy)
            .timeout(PROBE_TIMEOUT)
            .build()
            .map_err(|e| PoolError::VendorTransport(format!("Failed to build HTTP client: {}", e)))?;

        match client.get(self.probe_url.clone()).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(err) => {
                log::debug!("Probe through {} failed: {}", lease, err);
                Ok(false)
            }
        }
    }
}
