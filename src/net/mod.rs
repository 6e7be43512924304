//! Shared networking plumbing: the hosting API client, bounded retries for
//! transient failures, and the rate-limit throttler every external call site
//! goes through.

pub mod client;
pub mod resilient;
pub mod throttler;

pub use self::client::{ApiResult, Client, RateLimitInfo};
pub use self::throttler::Throttler;
