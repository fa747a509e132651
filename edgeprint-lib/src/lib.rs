#![forbid(unsafe_code)]

pub mod analysis;
pub mod collect;
pub mod config;
pub mod error;
pub mod fingerprinting;
pub mod probe;
pub mod telemetry;
pub mod tls;

pub use analysis::{Analyzer, DomainReport, IpReport};
pub use collect::{HeaderFetcher, Target};
pub use config::{load_from_path, Config};
pub use error::{EdgeprintError, Result};
pub use fingerprinting::{
    compare, detect_all, fingerprint, HeaderEvidenceCollector, HeaderStabilityComparator,
    ServerFingerprinter, StabilityReport,
};
pub use probe::{ConnectionProbe, ConnectionSample, ProbeError, ProbeOutcome, QualityTier};
