use secrecy::SecretString;
use std::time::Duration;
use url::Url;

pub const DEFAULT_MIDEYE_URL: &str = "https://mideye.domain.local:8443";
pub const DEFAULT_API_KEY: &str = "your-api-key-here";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 120;
pub const DEFAULT_CONNECT_TIMEOUT_SECONDS: u64 = 10;
pub const DEFAULT_EVENT_LOG_MAX_SIZE: usize = 1000;
pub const DEFAULT_EVENT_TTL_HOURS: u64 = 1;

/// Configuration read once at startup, immutable afterwards.
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub mideye_url: Url,
    pub api_key: SecretString,
    /// Upper bound for the whole Magic Link call, the user has this long to answer.
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub skip_tls_verify: bool,
    pub event_log_max_size: usize,
    pub event_ttl: Duration,
    pub admin_token: Option<SecretString>,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(mideye_url: Url) -> Self {
        Self {
            mideye_url,
            api_key: SecretString::from(DEFAULT_API_KEY.to_string()),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECONDS),
            skip_tls_verify: false,
            event_log_max_size: DEFAULT_EVENT_LOG_MAX_SIZE,
            event_ttl: Duration::from_secs(DEFAULT_EVENT_TTL_HOURS * 3600),
            admin_token: None,
        }
    }

    pub fn set_api_key(&mut self, api_key: SecretString) {
        self.api_key = api_key;
    }
}
