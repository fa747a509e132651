pub mod cdn;
pub mod headers;
pub mod server;
pub mod stability;
pub mod types;

pub use cdn::{detect_all, HeaderEvidenceCollector};
pub use headers::{keep_alive_timeout, names};
pub use server::{fingerprint, ServerFingerprinter};
pub use stability::{compare, HeaderStabilityComparator, StabilityReport};
pub use types::{
    ConfidenceTier, Detection, LoadBalancer, Platform, Provider, ServerFingerprint, ServerType,
};
