pub mod connector;
pub mod info;
pub mod verifier;

pub use connector::{build_connector, server_name};
pub use info::{protocol_version, version_label};
