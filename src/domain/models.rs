use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Identifies which vendor leased a given proxy. The name doubles as the
/// cache namespace so leases from different vendors never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderName {
    Shenlong,
    Kuaidaili,
}

impl ProviderName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderName::Shenlong => "shenlong",
            ProviderName::Kuaidaili => "kuaidaili",
        }
    }
}

impl fmt::Display for ProviderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Username and password attached to a leased proxy endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: String, password: String) -> Self {
        Self { username, password }
    }

    pub fn is_empty(&self) -> bool {
        self.username.is_empty() && self.password.is_empty()
    }

    pub fn to_basic_auth(&self) -> String {
        use base64::Engine;
        let credentials = format!("{}:{}", self.username, self.password);
        format!("Basic {}", base64::prelude::BASE64_STANDARD.encode(credentials))
    }
}

/// A proxy endpoint leased from a vendor, valid until `expires_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyLease {
    pub ip: String,
    pub port: u16,
    pub credentials: Credentials,
    pub expires_at: DateTime<Utc>,
}

impl ProxyLease {
    pub fn new(ip: String, port: u16, credentials: Credentials, expires_at: DateTime<Utc>) -> Self {
        Self {
            ip,
            port,
            credentials,
            expires_at,
        }
    }

    /// Cache key for this lease, namespaced by the vendor that issued it.
    pub fn cache_key(&self, vendor: ProviderName) -> String {
        format!("{}_{}_{}", vendor.as_str(), self.ip, self.port)
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Time left on the lease, `None` once it has expired.
    pub fn remaining_ttl(&self) -> Option<Duration> {
        (self.expires_at - Utc::now()).to_std().ok()
    }

    /// The endpoint formatted as a proxy URL, e.g. `http://1.2.3.4:8080`.
    pub fn proxy_url(&self) -> String {
        format!("http://{}:{}", self.ip, self.port)
    }
}

impl fmt::Display for ProxyLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} (expires {})",
            self.ip,
            self.port,
            self.expires_at.format("%Y-%m-%d %H:%M:%S")
        )
    }
}
