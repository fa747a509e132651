use std::io::Write;

use edgeprint_lib::config::{from_toml_str, load_from_path, validate, Config};
use edgeprint_lib::EdgeprintError;
use tempfile::NamedTempFile;

type TestResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

#[test]
fn empty_file_yields_defaults() -> TestResult {
    let file = NamedTempFile::new()?;
    let cfg = load_from_path(file.path())?;

    assert_eq!(cfg.probe.connect_timeout_ms, 5000);
    assert_eq!(cfg.probe.write_timeout_ms, 5000);
    assert_eq!(cfg.probe.read_timeout_ms, 5000);
    assert_eq!(cfg.probe.max_read_attempts, 3);
    assert_eq!(cfg.probe.retry_delay_ms, 1000);
    assert_eq!(cfg.probe.buffer_size, 4096);
    assert!(cfg.probe.tls_fallback);
    assert_eq!(cfg.http.timeout_ms, 30000);
    assert_eq!(cfg.http.user_agent, "edgeprint/0.1");
    assert!(cfg.http.accept_invalid_certs);
    assert_eq!(cfg.logging.level, "info");
    assert!(!cfg.logging.show_target);
    Ok(())
}

#[test]
fn loads_partial_sections() -> TestResult {
    let mut file = NamedTempFile::new()?;
    writeln!(
        file,
        r#"
[probe]
read_timeout_ms = 250
max_read_attempts = 5
tls_fallback = false

[http]
user_agent = "probe-bot/2"

[logging]
level = "debug"
show_target = true
"#
    )?;

    let cfg = load_from_path(file.path())?;
    assert_eq!(cfg.probe.read_timeout_ms, 250);
    assert_eq!(cfg.probe.max_read_attempts, 5);
    assert!(!cfg.probe.tls_fallback);
    assert_eq!(cfg.probe.connect_timeout_ms, 5000);
    assert_eq!(cfg.http.user_agent, "probe-bot/2");
    assert_eq!(cfg.http.timeout_ms, 30000);
    assert_eq!(cfg.logging.level, "debug");
    assert!(cfg.logging.show_target);
    Ok(())
}

#[test]
fn rejects_small_buffer() {
    let result = from_toml_str("[probe]\nbuffer_size = 19\n");
    assert!(matches!(result, Err(EdgeprintError::Config(ref msg)) if msg.contains("buffer_size")));
}

#[test]
fn rejects_zero_attempts_and_timeouts() {
    assert!(from_toml_str("[probe]\nmax_read_attempts = 0\n").is_err());
    assert!(from_toml_str("[probe]\nconnect_timeout_ms = 0\n").is_err());
    assert!(from_toml_str("[http]\ntimeout_ms = 0\n").is_err());
    assert!(from_toml_str("[http]\nuser_agent = \"  \"\n").is_err());
}

#[test]
fn rejects_malformed_toml() {
    let result = from_toml_str("[probe\nread_timeout_ms = 1");
    assert!(matches!(result, Err(EdgeprintError::Config(_))));
}

#[test]
fn missing_file_is_a_config_error() {
    let result = load_from_path("/nonexistent/edgeprint.toml");
    assert!(matches!(result, Err(EdgeprintError::Config(ref msg)) if msg.contains("read")));
}

#[test]
fn default_config_is_valid() {
    assert!(validate(&Config::default()).is_ok());
}
