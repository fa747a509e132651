use std::borrow::Cow;
use std::collections::BTreeMap;

use http::HeaderMap;

/// Response header names inspected by the classifiers.
///
/// Lookups through [`http::HeaderMap`] are case-insensitive, so these keep the
/// conventional spelling that also appears in evidence strings.
pub mod names {
    pub const SERVER: &str = "Server";
    pub const X_POWERED_BY: &str = "X-Powered-By";
    pub const X_ASPNET_VERSION: &str = "X-AspNet-Version";
    pub const X_FRAME_OPTIONS: &str = "X-Frame-Options";
    pub const X_CONTENT_TYPE_OPTIONS: &str = "X-Content-Type-Options";
    pub const STRICT_TRANSPORT_SECURITY: &str = "Strict-Transport-Security";
    pub const CONTENT_SECURITY_POLICY: &str = "Content-Security-Policy";
    pub const SET_COOKIE: &str = "Set-Cookie";
    pub const VIA: &str = "Via";
    pub const AGE: &str = "Age";
    pub const VARY: &str = "Vary";
    pub const CACHE_CONTROL: &str = "Cache-Control";
    pub const KEEP_ALIVE: &str = "Keep-Alive";
    pub const EXPECT_CT: &str = "Expect-CT";
    pub const CONNECTION: &str = "Connection";
    pub const X_FORWARDED_FOR: &str = "X-Forwarded-For";
    pub const X_REAL_IP: &str = "X-Real-IP";

    pub const X_CACHE: &str = "X-Cache";
    pub const X_SERVED_BY: &str = "X-Served-By";
    pub const X_TIMER: &str = "X-Timer";
    pub const X_EDGE_LOCATION: &str = "X-Edge-Location";
    pub const X_CDN: &str = "X-CDN";
    pub const X_IINFO: &str = "X-Iinfo";
    pub const X_SUCURI_ID: &str = "X-Sucuri-ID";
    pub const X_SUCURI_CACHE: &str = "X-Sucuri-Cache";
    pub const X_AMZ_CF_ID: &str = "X-Amz-Cf-Id";
    pub const X_AMZN_TRACE_ID: &str = "X-Amzn-Trace-Id";
    pub const X_WA_INFO: &str = "X-WA-Info";
    pub const TRUE_CLIENT_IP: &str = "True-Client-IP";

    pub const CF_RAY: &str = "CF-Ray";
    pub const CF_CACHE_STATUS: &str = "CF-Cache-Status";
    pub const CF_CONNECTING_IP: &str = "CF-Connecting-IP";
    pub const CF_IPCOUNTRY: &str = "CF-IPCountry";
    pub const CF_VISITOR: &str = "CF-Visitor";
}

/// Generic caching/CDN headers used by correlation rules.
///
/// None of these identifies a provider on its own.
pub const CORRELATION_SIGNALS: [&str; 7] = [
    names::X_SERVED_BY,
    names::X_CACHE,
    names::X_TIMER,
    names::AGE,
    names::VIA,
    names::CACHE_CONTROL,
    names::VARY,
];

/// All values of `name`, in the order they were received.
pub fn values<'a>(headers: &'a HeaderMap, name: &str) -> impl Iterator<Item = Cow<'a, str>> {
    headers
        .get_all(name)
        .into_iter()
        .map(|v| String::from_utf8_lossy(v.as_bytes()))
}

/// First non-empty value of `name`.
pub fn first_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<Cow<'a, str>> {
    values(headers, name).find(|v| !v.is_empty())
}

pub fn is_present(headers: &HeaderMap, name: &str) -> bool {
    first_value(headers, name).is_some()
}

/// ASCII case-insensitive substring test. `needle` must be lower-case.
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_ascii_lowercase().contains(needle)
}

/// Client address echoed by the edge: `X-Forwarded-For`, else `X-Real-IP`.
pub fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    first_value(headers, names::X_FORWARDED_FOR)
        .or_else(|| first_value(headers, names::X_REAL_IP))
        .map(Cow::into_owned)
}

/// Every header as lower-case name to its values in received order.
pub fn snapshot(headers: &HeaderMap) -> BTreeMap<String, Vec<String>> {
    let mut out: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in headers {
        out.entry(name.as_str().to_string())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    out
}

/// Timeout advertised by a `Keep-Alive: timeout=5, max=100` response header.
pub fn keep_alive_timeout(headers: &HeaderMap) -> Option<String> {
    let value = first_value(headers, names::KEEP_ALIVE)?;
    value
        .split(',')
        .map(str::trim)
        .find_map(|param| {
            let (key, val) = param.split_once('=')?;
            key.trim()
                .eq_ignore_ascii_case("timeout")
                .then(|| val.trim().to_string())
        })
        .filter(|v| !v.is_empty())
}
