pub mod connection;
pub mod quality;
pub mod segment;

use std::net::SocketAddr;

use thiserror::Error;

pub use connection::{ConnectionProbe, ConnectionSample, ProbeOutcome, Transport};
pub use quality::QualityTier;
pub use segment::{decode, DecodeError, Segment, SegmentHeader, TcpFlags, TcpOption, HEADER_LEN};

/// Errors that end a connection probe
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("connection to {addr} failed: {reason}")]
    Connect { addr: SocketAddr, reason: String },

    #[error("write failed: {0}")]
    Write(String),

    #[error("write timed out after {0} ms")]
    WriteTimeout(u64),

    #[error("read error after {attempts} attempts: {reason}")]
    Read { attempts: u32, reason: String },

    #[error("no data received after {attempts} attempts")]
    NoData { attempts: u32 },

    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
}
