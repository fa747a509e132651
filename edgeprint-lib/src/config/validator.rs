use crate::config::types::Config;
use crate::probe::segment::HEADER_LEN;

pub fn validate(config: &Config) -> Result<(), String> {
    let probe = &config.probe;
    if probe.connect_timeout_ms == 0 {
        return Err("probe.connect_timeout_ms must be > 0".into());
    }
    if probe.write_timeout_ms == 0 {
        return Err("probe.write_timeout_ms must be > 0".into());
    }
    if probe.read_timeout_ms == 0 {
        return Err("probe.read_timeout_ms must be > 0".into());
    }
    if probe.max_read_attempts == 0 {
        return Err("probe.max_read_attempts must be >= 1".into());
    }
    if probe.buffer_size < HEADER_LEN {
        return Err(format!("probe.buffer_size must be >= {HEADER_LEN}"));
    }
    if config.http.timeout_ms == 0 {
        return Err("http.timeout_ms must be > 0".into());
    }
    if config.http.user_agent.trim().is_empty() {
        return Err("http.user_agent cannot be empty".into());
    }
    Ok(())
}
