use std::fmt;

use serde::Serialize;

/// Ordinal certainty of a detection or fingerprint.
///
/// Ordering follows certainty: `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ConfidenceTier {
    Low,
    Medium,
    High,
}

impl ConfidenceTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

impl fmt::Display for ConfidenceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CDN providers recognised by the header evidence collector.
///
/// Serializes as the lower-case provider key (`"cloudflare"`, `"keycdn"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Cloudflare,
    CloudFront,
    Akamai,
    Fastly,
    KeyCdn,
    MaxCdn,
    Incapsula,
    Sucuri,
}

impl Provider {
    pub const ALL: [Provider; 8] = [
        Provider::Cloudflare,
        Provider::CloudFront,
        Provider::Akamai,
        Provider::Fastly,
        Provider::KeyCdn,
        Provider::MaxCdn,
        Provider::Incapsula,
        Provider::Sucuri,
    ];

    /// Stable key used in reports
    pub fn key(&self) -> &'static str {
        match self {
            Self::Cloudflare => "cloudflare",
            Self::CloudFront => "cloudfront",
            Self::Akamai => "akamai",
            Self::Fastly => "fastly",
            Self::KeyCdn => "keycdn",
            Self::MaxCdn => "maxcdn",
            Self::Incapsula => "incapsula",
            Self::Sucuri => "sucuri",
        }
    }

    /// Human-readable provider name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Cloudflare => "Cloudflare",
            Self::CloudFront => "CloudFront",
            Self::Akamai => "Akamai",
            Self::Fastly => "Fastly",
            Self::KeyCdn => "KeyCDN",
            Self::MaxCdn => "MaxCDN",
            Self::Incapsula => "Incapsula",
            Self::Sucuri => "Sucuri",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of running one provider's rule set over a response.
///
/// `detected` implies a non-empty `evidence` list; `confidence` is the
/// highest tier of any rule that matched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    pub provider: Provider,
    pub detected: bool,
    pub confidence: ConfidenceTier,
    pub evidence: Vec<String>,
    pub primary_evidence: String,
}

impl Detection {
    /// A provider with no matching rule.
    pub fn none(provider: Provider) -> Self {
        Self {
            provider,
            detected: false,
            confidence: ConfidenceTier::Low,
            evidence: Vec::new(),
            primary_evidence: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ServerType {
    #[serde(rename = "nginx")]
    Nginx,
    Apache,
    #[serde(rename = "IIS")]
    Iis,
    LiteSpeed,
    OpenResty,
    Caddy,
    Unknown,
}

impl ServerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nginx => "nginx",
            Self::Apache => "Apache",
            Self::Iis => "IIS",
            Self::LiteSpeed => "LiteSpeed",
            Self::OpenResty => "OpenResty",
            Self::Caddy => "Caddy",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ServerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Platform {
    Windows,
    #[serde(rename = "Linux/Unix")]
    LinuxUnix,
    #[serde(rename = "Cross-platform")]
    CrossPlatform,
    Unknown,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Windows => "Windows",
            Self::LinuxUnix => "Linux/Unix",
            Self::CrossPlatform => "Cross-platform",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LoadBalancer {
    #[serde(rename = "HAProxy")]
    HaProxy,
    #[serde(rename = "F5 BIG-IP")]
    F5BigIp,
    #[serde(rename = "AWS Application Load Balancer")]
    AwsAlb,
    Cloudflare,
    Unknown,
}

impl LoadBalancer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HaProxy => "HAProxy",
            Self::F5BigIp => "F5 BIG-IP",
            Self::AwsAlb => "AWS Application Load Balancer",
            Self::Cloudflare => "Cloudflare",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for LoadBalancer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Placeholder for string fields that could not be determined.
pub const UNKNOWN: &str = "Unknown";

/// Server software classification derived from response headers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerFingerprint {
    pub server_type: ServerType,
    /// Version trailing the server family token, or `"Unknown"`
    pub version: String,
    pub platform: Platform,
    /// Raw `X-Powered-By` value, or `"Unknown"`
    pub powered_by: String,
    pub load_balancer: LoadBalancer,
    pub confidence: ConfidenceTier,
    /// `Name:Value;` concatenation of a fixed header subset
    pub fingerprint: String,
}

impl Default for ServerFingerprint {
    fn default() -> Self {
        Self {
            server_type: ServerType::Unknown,
            version: UNKNOWN.to_string(),
            platform: Platform::Unknown,
            powered_by: UNKNOWN.to_string(),
            load_balancer: LoadBalancer::Unknown,
            confidence: ConfidenceTier::Low,
            fingerprint: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_ordering() {
        assert!(ConfidenceTier::Low < ConfidenceTier::Medium);
        assert!(ConfidenceTier::Medium < ConfidenceTier::High);
    }

    #[test]
    fn test_provider_keys_are_lowercase_serde_names() -> Result<(), serde_json::Error> {
        for provider in Provider::ALL {
            let json = serde_json::to_string(&provider)?;
            assert_eq!(json, format!("\"{}\"", provider.key()));
        }
        Ok(())
    }
}
