use std::fmt;
use std::str::FromStr;

use http::Uri;
use serde::Serialize;

use crate::error::{EdgeprintError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn default_port(&self) -> u16 {
        match self {
            Self::Http => 80,
            Self::Https => 443,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

/// A site to analyze: `https://host[:port][/path]`, `http://...` or a bare
/// host, which is treated as https.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    pub scheme: Scheme,
    /// Lower-case host without IPv6 brackets
    pub host: String,
    pub port: u16,
    pub path_and_query: String,
}

impl Target {
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(EdgeprintError::InvalidTarget("empty target".to_string()));
        }

        let with_scheme = if input.contains("://") {
            input.to_string()
        } else {
            format!("https://{input}")
        };

        let invalid = |reason: String| EdgeprintError::InvalidTarget(format!("{input}: {reason}"));

        let uri: Uri = with_scheme.parse().map_err(|e| invalid(format!("{e}")))?;

        let scheme = match uri.scheme_str().map(str::to_ascii_lowercase).as_deref() {
            Some("https") => Scheme::Https,
            Some("http") => Scheme::Http,
            Some(other) => return Err(invalid(format!("unsupported scheme '{other}'"))),
            None => return Err(invalid("missing scheme".to_string())),
        };

        let authority = uri.authority().ok_or_else(|| invalid("missing host".to_string()))?;
        if authority.as_str().contains('@') {
            return Err(invalid("credentials are not supported".to_string()));
        }

        let host = authority
            .host()
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_ascii_lowercase();
        if host.is_empty() {
            return Err(invalid("missing host".to_string()));
        }

        let port = authority.port_u16().unwrap_or_else(|| scheme.default_port());
        let path_and_query = uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .filter(|pq| pq.starts_with('/'))
            .unwrap_or_else(|| "/".to_string());

        Ok(Self { scheme, host, port, path_and_query })
    }

    /// Value for the `Host` request header; the port is omitted when it is the
    /// scheme default.
    pub fn host_header(&self) -> String {
        let host = if self.host.contains(':') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        if self.port == self.scheme.default_port() {
            host
        } else {
            format!("{host}:{}", self.port)
        }
    }
}

impl FromStr for Target {
    type Err = EdgeprintError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}{}", self.scheme.as_str(), self.host_header(), self.path_and_query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_host_defaults_to_https() -> Result<()> {
        let target = Target::parse("Example.COM")?;
        assert_eq!(target.scheme, Scheme::Https);
        assert_eq!(target.host, "example.com");
        assert_eq!(target.port, 443);
        assert_eq!(target.path_and_query, "/");
        Ok(())
    }

    #[test]
    fn test_explicit_port_and_path() -> Result<()> {
        let target = Target::parse("http://example.com:8080/status?x=1")?;
        assert_eq!(target.scheme, Scheme::Http);
        assert_eq!(target.port, 8080);
        assert_eq!(target.path_and_query, "/status?x=1");
        assert_eq!(target.host_header(), "example.com:8080");
        assert_eq!(target.to_string(), "http://example.com:8080/status?x=1");
        Ok(())
    }

    #[test]
    fn test_ipv6_literal() -> Result<()> {
        let target = Target::parse("https://[::1]:8443/")?;
        assert_eq!(target.host, "::1");
        assert_eq!(target.host_header(), "[::1]:8443");
        Ok(())
    }

    #[test]
    fn test_rejects_bad_targets() {
        assert!(Target::parse("").is_err());
        assert!(Target::parse("ftp://example.com").is_err());
        assert!(Target::parse("https://user@example.com").is_err());
        assert!(Target::parse("exa mple.com").is_err());
    }
}
