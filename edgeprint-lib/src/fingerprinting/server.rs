use http::HeaderMap;

use super::headers::{contains_ignore_case, first_value, is_present, names};
use super::types::{
    ConfidenceTier, LoadBalancer, Platform, ServerFingerprint, ServerType, UNKNOWN,
};

/// Known server families, in match order. A later match overrides an earlier
/// one so that `nginx/1.21 (OpenResty)` classifies as OpenResty.
struct Family {
    server_type: ServerType,
    /// Lower-case substrings identifying the family in the Server header
    markers: &'static [&'static str],
    /// Token the version trails, e.g. `nginx` in `nginx/1.25.3`
    version_token: &'static str,
    platform: Platform,
}

const FAMILIES: &[Family] = &[
    Family {
        server_type: ServerType::Nginx,
        markers: &["nginx"],
        version_token: "nginx",
        platform: Platform::LinuxUnix,
    },
    Family {
        server_type: ServerType::Apache,
        markers: &["apache"],
        version_token: "apache",
        platform: Platform::LinuxUnix,
    },
    Family {
        server_type: ServerType::Iis,
        markers: &["iis", "microsoft"],
        version_token: "iis",
        platform: Platform::Windows,
    },
    Family {
        server_type: ServerType::LiteSpeed,
        markers: &["litespeed"],
        version_token: "litespeed",
        platform: Platform::LinuxUnix,
    },
    Family {
        server_type: ServerType::OpenResty,
        markers: &["openresty"],
        version_token: "openresty",
        platform: Platform::LinuxUnix,
    },
    Family {
        server_type: ServerType::Caddy,
        markers: &["caddy"],
        version_token: "caddy",
        platform: Platform::CrossPlatform,
    },
];

/// Header subset hashed into [`ServerFingerprint::fingerprint`], in order.
pub const DIGEST_HEADERS: [&str; 7] = [
    names::SERVER,
    names::X_POWERED_BY,
    names::X_ASPNET_VERSION,
    names::X_FRAME_OPTIONS,
    names::X_CONTENT_TYPE_OPTIONS,
    names::STRICT_TRANSPORT_SECURITY,
    names::CONTENT_SECURITY_POLICY,
];

const SCORE_SERVER_TYPE: u32 = 30;
const SCORE_VERSION: u32 = 25;
const SCORE_PLATFORM: u32 = 20;
const SCORE_POWERED_BY: u32 = 15;
const SCORE_LOAD_BALANCER: u32 = 10;
const HIGH_THRESHOLD: u32 = 70;
const MEDIUM_THRESHOLD: u32 = 40;

/// Classifies server software from response headers.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServerFingerprinter;

impl ServerFingerprinter {
    pub fn new() -> Self {
        Self
    }

    pub fn fingerprint(&self, headers: &HeaderMap) -> ServerFingerprint {
        let mut info = ServerFingerprint::default();

        if let Some(server) = first_value(headers, names::SERVER) {
            classify_server(&server, &mut info);
        }

        if let Some(powered_by) = first_value(headers, names::X_POWERED_BY) {
            info.powered_by = powered_by.to_string();
            apply_powered_by(&powered_by, &mut info);
        }

        info.load_balancer = detect_load_balancer(headers);
        info.fingerprint = digest(headers);
        info.confidence = tier_for(score(&info));
        info
    }
}

/// Shorthand for [`ServerFingerprinter::fingerprint`].
pub fn fingerprint(headers: &HeaderMap) -> ServerFingerprint {
    ServerFingerprinter.fingerprint(headers)
}

fn classify_server(server: &str, info: &mut ServerFingerprint) {
    let lower = server.to_ascii_lowercase();
    let windows = lower.contains("win");

    for family in FAMILIES {
        if !family.markers.iter().any(|m| lower.contains(m)) {
            continue;
        }
        info.server_type = family.server_type;
        info.platform = if windows { Platform::Windows } else { family.platform };
        info.version = extract_version(server, family.version_token)
            .unwrap_or_else(|| UNKNOWN.to_string());
    }
}

fn apply_powered_by(powered_by: &str, info: &mut ServerFingerprint) {
    if contains_ignore_case(powered_by, "asp.net") {
        info.platform = Platform::Windows;
        if info.server_type == ServerType::Unknown {
            info.server_type = ServerType::Iis;
        }
    }
    if contains_ignore_case(powered_by, "php") && info.platform == Platform::Unknown {
        info.platform = Platform::LinuxUnix;
    }
}

/// Load balancer hints in priority order; never touches the server type.
fn detect_load_balancer(headers: &HeaderMap) -> LoadBalancer {
    if is_present(headers, names::CF_RAY) {
        LoadBalancer::Cloudflare
    } else if is_present(headers, names::X_AMZN_TRACE_ID) {
        LoadBalancer::AwsAlb
    } else if is_present(headers, names::X_WA_INFO) {
        LoadBalancer::F5BigIp
    } else if first_value(headers, names::SERVER)
        .is_some_and(|s| contains_ignore_case(&s, "haproxy"))
    {
        LoadBalancer::HaProxy
    } else {
        LoadBalancer::Unknown
    }
}

/// Digits-and-dots run trailing `token` in `server`.
///
/// `/`, `-` and spaces between the token and the run are skipped; any other
/// character there means the header carries no version for this token.
pub fn extract_version(server: &str, token: &str) -> Option<String> {
    let start = server.to_ascii_lowercase().find(token)?.checked_add(token.len())?;
    let rest = server.get(start..)?;

    let trimmed = rest.trim_start_matches(['/', '-', ' ']);
    let version: String = trimmed
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    if version.chars().any(|c| c.is_ascii_digit()) {
        Some(version)
    } else {
        None
    }
}

/// `Name:Value;` for each present header of [`DIGEST_HEADERS`].
pub fn digest(headers: &HeaderMap) -> String {
    DIGEST_HEADERS
        .iter()
        .filter_map(|name| first_value(headers, name).map(|value| format!("{name}:{value};")))
        .collect()
}

fn score(info: &ServerFingerprint) -> u32 {
    let known = |value: &str| !value.is_empty() && value != UNKNOWN;

    [
        (info.server_type != ServerType::Unknown, SCORE_SERVER_TYPE),
        (known(&info.version), SCORE_VERSION),
        (info.platform != Platform::Unknown, SCORE_PLATFORM),
        (known(&info.powered_by), SCORE_POWERED_BY),
        (info.load_balancer != LoadBalancer::Unknown, SCORE_LOAD_BALANCER),
    ]
    .iter()
    .filter(|(hit, _)| *hit)
    .map(|(_, points)| points)
    .sum()
}

fn tier_for(score: u32) -> ConfidenceTier {
    if score >= HIGH_THRESHOLD {
        ConfidenceTier::High
    } else if score >= MEDIUM_THRESHOLD {
        ConfidenceTier::Medium
    } else {
        ConfidenceTier::Low
    }
}
