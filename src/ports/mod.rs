pub mod cache;
pub mod probe;
pub mod provider;
pub mod vendor_api;

pub use cache::LeaseCachePort;
pub use probe::LeaseProbePort;
pub use provider::ProxyProviderPort;
pub use vendor_api::{VendorApiPort, VendorApiResponse};
