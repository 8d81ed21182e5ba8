//! Per-client rate limiting for Tollgate.
//!
//! # Architecture
//!
//! 1. **TokenBucket** (`bucket.rs`): continuous-refill token bucket with its
//!    own small lock, so consumption never serialises unrelated clients.
//!
//! 2. **ClientLimiterTable** (`table.rs`): map from client identity to bucket
//!    and last activity, guarded by one exclusive lock held only for
//!    lookup/insert and eviction.
//!
//! 3. **Sweeper** (`sweeper.rs`): background task evicting idle clients,
//!    stopped through a cancellation token.
//!
//! 4. **IdentityResolver** (`identity.rs`): derives the client identity from the
//!    peer address, trusted forwarding headers or a configured header.
//!
//! # Example Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use tollgate_lib::security::rate_limit::{BucketParams, ClientLimiterTable};
//!
//! // 2 requests per second, bursts of 4
//! let table = Arc::new(ClientLimiterTable::new(BucketParams::new(2.0, 4)));
//!
//! if table.get_or_create("192.168.1.1").allow() {
//!     // Process request...
//! } else {
//!     // Return 429 Too Many Requests
//! }
//! ```
//!
//! # Configuration
//!
//! ```toml
//! [security.rate_limit]
//! enabled = true
//! requests_per_second = 2.0
//! burst = 4
//! sweep_interval_secs = 60
//! stale_threshold_secs = 180
//! ```

mod bucket;
mod identity;
mod sweeper;
mod table;

pub use bucket::{BucketParams, RateLimitResult, TokenBucket};
pub use identity::IdentityResolver;
pub use sweeper::Sweeper;
pub use table::ClientLimiterTable;
