use std::fmt;

/// Errors surfaced while acquiring or caching proxy leases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// The lease cache could not be read or written. Callers may treat
    /// this as non-fatal and fall back to a full vendor fetch.
    CacheUnavailable(String),
    /// The vendor API could not be reached, or answered with a non-200
    /// HTTP status.
    VendorTransport(String),
    /// The vendor answered 200 but its response envelope carries a
    /// business error code.
    VendorEnvelope { code: i64, message: String },
    /// The vendor rejected the configured credentials.
    VendorAuth(String),
    /// A single record in the vendor payload could not be turned into a
    /// usable lease.
    MalformedRecord(String),
    /// A lease expiry timestamp did not match the vendor's documented
    /// date-time format.
    DateTimeParse(String),
    /// The vendor returned fewer usable leases than requested.
    ShortSupply { requested: usize, available: usize },
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolError::CacheUnavailable(reason) => {
                write!(f, "lease cache unavailable: {}", reason)
            }
            PoolError::VendorTransport(reason) => {
                write!(f, "vendor transport failure: {}", reason)
            }
            PoolError::VendorEnvelope { code, message } => {
                write!(f, "vendor envelope reported code {}: {}", code, message)
            }
            PoolError::VendorAuth(reason) => {
                write!(f, "vendor rejected credentials: {}", reason)
            }
            PoolError::MalformedRecord(reason) => {
                write!(f, "malformed vendor record: {}", reason)
            }
            PoolError::DateTimeParse(reason) => {
                write!(f, "unparseable expiry date-time: {}", reason)
            }
            PoolError::ShortSupply {
                requested,
                available,
            } => {
                write!(
                    f,
                    "short supply: requested {} leases, {} available",
                    requested, available
                )
            }
        }
    }
}

impl std::error::Error for PoolError {}

pub type Result<T> = std::result::Result<T, PoolError>;
