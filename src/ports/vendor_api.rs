use crate::domain::Result;
use async_trait::async_trait;
use url::Url;

/// Raw answer from a vendor lease endpoint, before any decoding.
#[derive(Debug, Clone)]
pub struct VendorApiResponse {
    pub status: u16,
    pub body: String,
}

/// Port for the HTTP transport used to call vendor lease APIs.
#[async_trait]
pub trait VendorApiPort: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<VendorApiResponse>;
}
