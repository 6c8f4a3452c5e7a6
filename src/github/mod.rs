pub mod auth;
pub mod client;
pub mod rate_limiter;
pub mod paginator;
#[cfg(test)]
pub(crate) mod testing;

pub use auth::AuthContext;
pub use client::{ApiResponse, GitHubClient, HttpTransport, ReqwestTransport, ResponseMeta};
pub use rate_limiter::{RateLimitResource, RateLimitTracker};
pub use paginator::{parse_next_link, Paged, Paginator};
