mod fetch;
mod loader;
mod telemetry;
mod timeout;
mod types;
mod validator;

pub use fetch::HttpConfig;
pub use loader::{from_toml_str, load_from_path};
pub use telemetry::LoggingConfig;
pub use timeout::ProbeConfig;
pub use types::Config;
pub use validator::validate;
