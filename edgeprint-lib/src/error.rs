use thiserror::Error;

/// Errors that can occur while analyzing a target
#[derive(Error, Debug)]
pub enum EdgeprintError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("DNS error for {host}: {reason}")]
    Dns { host: String, reason: String },

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Timed out after {0} ms")]
    Timeout(u64),
}

pub type Result<T> = std::result::Result<T, EdgeprintError>;
