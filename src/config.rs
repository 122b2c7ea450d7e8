use std::env;

fn env_or(name: &str, fallback: &str) -> String {
    env::var(name).unwrap_or_else(|_| fallback.to_string())
}

/// Shenlong account configuration.
///
/// Read from `SHENLONG_KEY`, `SHENLONG_SIGN`, `SHENLONG_USERNAME` and
/// `SHENLONG_PASSWORD`. The key/sign pair authenticates the lease API
/// call; the username/password pair is what the leased proxies
/// themselves expect.
#[derive(Debug, Clone, Default)]
pub struct ShenlongSettings {
    pub key: String,
    pub sign: String,
    pub username: String,
    pub password: String,
}

impl ShenlongSettings {
    pub fn from_env() -> Self {
        Self {
            key: env_or("SHENLONG_KEY", ""),
            sign: env_or("SHENLONG_SIGN", ""),
            username: env_or("SHENLONG_USERNAME", ""),
            password: env_or("SHENLONG_PASSWORD", ""),
        }
    }
}

/// Kuaidaili account configuration, read from `KDL_SECRET_ID`,
/// `KDL_SIGNATURE`, `KDL_USERNAME` and `KDL_PASSWORD`.
#[derive(Debug, Clone, Default)]
pub struct KuaidailiSettings {
    pub secret_id: String,
    pub signature: String,
    pub username: String,
    pub password: String,
}

impl KuaidailiSettings {
    pub fn from_env() -> Self {
        Self {
            secret_id: env_or("KDL_SECRET_ID", ""),
            signature: env_or("KDL_SIGNATURE", ""),
            username: env_or("KDL_USERNAME", ""),
            password: env_or("KDL_PASSWORD", ""),
        }
    }
}
