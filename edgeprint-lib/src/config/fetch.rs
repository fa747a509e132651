use serde::Deserialize;
use std::time::Duration;

/// Header fetch configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    /// Total time allowed for connecting, handshaking and reading the response head
    /// Default: 30000 (30 seconds)
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
    /// Value sent in the User-Agent header
    /// Default: "edgeprint/0.1"
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Skip certificate verification when fetching over HTTPS.
    /// Requests go to individual IPs, so certificates often do not match.
    /// Default: true
    #[serde(default = "default_true")]
    pub accept_invalid_certs: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout(),
            user_agent: default_user_agent(),
            accept_invalid_certs: default_true(),
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_timeout() -> u64 {
    30000
}

fn default_user_agent() -> String {
    "edgeprint/0.1".to_string()
}

fn default_true() -> bool {
    true
}
