use std::env;
use std::time::Duration;

/// Process-wide configuration, loaded once at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_addr: String,
    pub log_level: String,
    /// Shared HMAC-SHA256 secret used to verify signed admission requests
    /// and in-band `pc-auth` frames. Never logged.
    pub hmac_secret: String,
    /// Origins allowed to receive CORS headers; empty means allow any.
    pub allowed_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_owned()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_owned()),
            hmac_secret: env::var("RELAY_HMAC_SECRET").expect("RELAY_HMAC_SECRET must be set"),
            allowed_origins: env::var("ALLOWED_ORIGINS")
                .unwrap_or_default()
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .collect(),
        }
    }
}

pub const CLOCK_SKEW_TOLERANCE: Duration = Duration::from_secs(60);
pub const NONCE_TTL: Duration = Duration::from_secs(120);
pub const SID_TTL_MIN: u64 = 30;
pub const SID_TTL_MAX: u64 = 120;
pub const PC_OFFLINE_GRACE: Duration = Duration::from_secs(45);
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(25);
