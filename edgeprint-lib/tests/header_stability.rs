use edgeprint_lib::fingerprinting::{compare, HeaderStabilityComparator};
use http::{HeaderMap, HeaderName, HeaderValue};

type TestResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

fn headers(pairs: &[(&str, &str)]) -> Result<HeaderMap, Box<dyn std::error::Error + Send + Sync>> {
    let mut map = HeaderMap::new();
    for (name, value) in pairs {
        map.append(HeaderName::from_bytes(name.as_bytes())?, HeaderValue::from_str(value)?);
    }
    Ok(map)
}

#[test]
fn differing_date_is_unstable() -> TestResult {
    let samples = vec![
        headers(&[("Server", "nginx"), ("Date", "Mon, 01 Jan 2024 00:00:00 GMT")])?,
        headers(&[("Server", "nginx"), ("Date", "Mon, 01 Jan 2024 00:00:01 GMT")])?,
        headers(&[("Server", "nginx"), ("Date", "Mon, 01 Jan 2024 00:00:00 GMT")])?,
    ];

    let report = compare(&samples);
    assert_eq!(report.samples, 3);
    assert_eq!(report.stable_headers.get("server").map(String::as_str), Some("nginx"));
    assert!(!report.stable_headers.contains_key("date"));
    assert!(report.unstable_names.contains("date"));
    assert!(report.any_difference());
    Ok(())
}

#[test]
fn zero_samples_yield_empty_report() {
    let report = HeaderStabilityComparator::new().compare(&[]);
    assert_eq!(report.samples, 0);
    assert!(report.stable_headers.is_empty());
    assert!(report.unstable_names.is_empty());
    assert!(!report.any_difference());
}

#[test]
fn single_sample_is_entirely_stable() -> TestResult {
    let report = compare(&[headers(&[("Server", "nginx"), ("Age", "1")])?]);
    assert_eq!(report.samples, 1);
    assert_eq!(report.stable_headers.len(), 2);
    assert!(!report.any_difference());
    Ok(())
}

#[test]
fn missing_in_later_sample_is_unstable() -> TestResult {
    let samples = vec![
        headers(&[("Server", "nginx"), ("X-Cache", "HIT")])?,
        headers(&[("Server", "nginx")])?,
    ];
    let report = compare(&samples);
    assert!(report.unstable_names.contains("x-cache"));
    Ok(())
}

#[test]
fn names_absent_from_baseline_are_not_evaluated() -> TestResult {
    let samples = vec![
        headers(&[("Server", "nginx")])?,
        headers(&[("Server", "nginx"), ("X-Extra", "1")])?,
    ];
    let report = compare(&samples);
    assert!(!report.stable_headers.contains_key("x-extra"));
    assert!(!report.unstable_names.contains("x-extra"));
    assert!(!report.any_difference());
    Ok(())
}

#[test]
fn multiple_values_are_joined() -> TestResult {
    let sample = headers(&[("Vary", "Accept-Encoding"), ("Vary", "Origin")])?;
    let report = compare(&[sample.clone(), sample]);
    assert_eq!(
        report.stable_headers.get("vary").map(String::as_str),
        Some("Accept-Encoding, Origin")
    );
    Ok(())
}

#[test]
fn report_serializes() -> TestResult {
    let samples = vec![headers(&[("Server", "nginx")])?, headers(&[("Server", "caddy")])?];
    let json = serde_json::to_value(compare(&samples))?;
    assert_eq!(json["samples"], 2);
    assert_eq!(json["unstableNames"][0], "server");
    Ok(())
}

#[test]
fn values_differing_only_in_non_utf8_bytes_are_unstable() -> TestResult {
    let mut a = HeaderMap::new();
    a.insert("x-name", HeaderValue::from_bytes(b"caf\xe9")?);
    let mut b = HeaderMap::new();
    b.insert("x-name", HeaderValue::from_bytes(b"caf\xfc")?);

    let report = compare(&[a.clone(), b]);
    assert!(report.unstable_names.contains("x-name"));
    assert!(!report.stable_headers.contains_key("x-name"));

    let report = compare(&[a.clone(), a]);
    assert_eq!(report.stable_headers.get("x-name").map(String::as_str), Some("caf\u{FFFD}"));
    Ok(())
}
