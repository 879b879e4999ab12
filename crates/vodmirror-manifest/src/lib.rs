//! Manifest acquisition and parsing.
//!
//! One retrying HTTP fetcher plus two resource-enumeration engines — HLS
//! (nested playlist indirection) and DASH (templated/timelined segment
//! generation) — both producing the same `VodAsset` shape.

pub mod dash;
pub mod duration;
pub mod fetch;
pub mod hls;

pub use dash::parse_dash_asset;
pub use fetch::{FetchError, RetryingFetcher};
pub use hls::parse_hls_asset;
