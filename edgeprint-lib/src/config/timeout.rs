use serde::Deserialize;
use std::time::Duration;

/// Connection probe configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ProbeConfig {
    /// TCP connect timeout in milliseconds (also bounds the TLS fallback dial)
    /// Default: 5000 (5 seconds)
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
    /// Timeout for writing the probe request in milliseconds
    /// Default: 5000 (5 seconds)
    #[serde(default = "default_write_timeout")]
    pub write_timeout_ms: u64,
    /// Timeout for a single read attempt in milliseconds
    /// Each retry gets a fresh deadline
    /// Default: 5000 (5 seconds)
    #[serde(default = "default_read_timeout")]
    pub read_timeout_ms: u64,
    /// Maximum number of read attempts; only timeouts are retried
    /// Default: 3
    #[serde(default = "default_max_read_attempts")]
    pub max_read_attempts: u32,
    /// Pause between read attempts in milliseconds
    /// Default: 1000 (1 second)
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
    /// Size of the receive buffer in bytes, must hold at least one 20-byte header
    /// Default: 4096
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    /// Retry the connection over TLS when the plain TCP dial fails
    /// Default: true
    #[serde(default = "default_true")]
    pub tls_fallback: bool,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout(),
            write_timeout_ms: default_write_timeout(),
            read_timeout_ms: default_read_timeout(),
            max_read_attempts: default_max_read_attempts(),
            retry_delay_ms: default_retry_delay(),
            buffer_size: default_buffer_size(),
            tls_fallback: default_true(),
        }
    }
}

impl ProbeConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

fn default_connect_timeout() -> u64 {
    5000
}

fn default_write_timeout() -> u64 {
    5000
}

fn default_read_timeout() -> u64 {
    5000
}

fn default_max_read_attempts() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    1000
}

fn default_buffer_size() -> usize {
    4096
}

fn default_true() -> bool {
    true
}
