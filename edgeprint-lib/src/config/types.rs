use serde::Deserialize;

use super::fetch::HttpConfig;
use super::telemetry::LoggingConfig;
use super::timeout::ProbeConfig;

/// Main configuration structure
///
/// Every section is optional; an empty file yields the defaults.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    /// Connection probe settings
    #[serde(default)]
    pub probe: ProbeConfig,
    /// Header fetch settings
    #[serde(default)]
    pub http: HttpConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}
