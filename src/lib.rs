//! Vendor-leased proxy acquisition with a TTL cache in front.
//!
//! Providers lease proxies from commercial vendors one HTTP call at a
//! time, cache every lease until its expiry, and serve later requests
//! from the cache so paid vendor calls only happen for the shortfall.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;

pub use domain::{Credentials, PoolConfig, PoolError, ProviderName, ProxyLease, ProxyPool, Result};
