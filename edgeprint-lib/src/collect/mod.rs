pub mod dns;
pub mod fetch;
pub mod target;

pub use dns::resolve;
pub use fetch::{FetchResult, HeaderFetcher};
pub use target::{Scheme, Target};
