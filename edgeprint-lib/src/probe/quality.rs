use std::fmt;

use serde::Serialize;

/// Coarse rating of the summed connect, write and read latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum QualityTier {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl QualityTier {
    /// `< 50` ms Excellent, `< 150` Good, `< 300` Fair, otherwise Poor.
    pub fn from_latency(total_ms: u64) -> Self {
        match total_ms {
            0..50 => Self::Excellent,
            50..150 => Self::Good,
            150..300 => Self::Fair,
            _ => Self::Poor,
        }
    }

    pub fn from_phases(connect_ms: u64, write_ms: u64, read_ms: u64) -> Self {
        Self::from_latency(connect_ms.saturating_add(write_ms).saturating_add(read_ms))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Fair => "Fair",
            Self::Poor => "Poor",
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
