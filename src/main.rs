use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use url::Url;

use leasepool::adapters::{
    JsonFileLeaseCache, KuaidailiProvider, MemoryLeaseCache, ReqwestLeaseProbe, ReqwestVendorApi,
    ShenlongProvider,
};
use leasepool::config::{KuaidailiSettings, ShenlongSettings};
use leasepool::ports::{LeaseCachePort, ProxyProviderPort, VendorApiPort};
use leasepool::{PoolConfig, ProxyPool};

#[derive(Parser, Debug)]
#[clap(version = env!("LEASEPOOL_VERSION"))]
pub struct Opts {
    /// Vendor to lease from (shenlong or kuaidaili)
    #[clap(long, short = 'v', default_value = "shenlong")]
    vendor: String,

    /// How many leases to acquire
    #[clap(long, short = 'n', default_value = "1")]
    count: usize,

    /// Probe each lease and drop the ones that fail
    #[clap(long)]
    validate: bool,

    /// URL fetched through each lease when --validate is on
    #[clap(long, default_value = "http://httpbin.org/ip")]
    probe_url: Url,

    /// Persist the lease cache to this JSON file instead of memory
    #[clap(long)]
    cache_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let opts = Opts::parse();

    let cache: Arc<dyn LeaseCachePort> = match &opts.cache_file {
        Some(path) => Arc::new(JsonFileLeaseCache::open(path.clone())?),
        None => Arc::new(MemoryLeaseCache::new()),
    };
    let api: Arc<dyn VendorApiPort> = Arc::new(ReqwestVendorApi::new());

    let provider: Arc<dyn ProxyProviderPort> = match opts.vendor.as_str() {
        "shenlong" => Arc::new(ShenlongProvider::new(
            ShenlongSettings::from_env(),
            api,
            cache,
        )),
        "kuaidaili" => Arc::new(KuaidailiProvider::new(
            KuaidailiSettings::from_env(),
            api,
            cache,
        )),
        other => {
            return Err(format!("unknown vendor {:?} (expected shenlong or kuaidaili)", other).into())
        }
    };

    let probe = Arc::new(ReqwestLeaseProbe::new(opts.probe_url.clone()));
    let pool = ProxyPool::new(
        provider,
        probe,
        PoolConfig {
            capacity: opts.count,
            validate: opts.validate,
        },
    );

    pool.reload().await?;

    while !pool.is_empty().await {
        let lease = pool.get().await?;
        println!(
            "{}:{}\t{}\t{}",
            lease.ip,
            lease.port,
            lease.credentials.username,
            lease.expires_at.format("%Y-%m-%d %H:%M:%S")
        );
    }

    Ok(())
}
