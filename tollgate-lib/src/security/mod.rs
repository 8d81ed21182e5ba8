pub mod admission;
pub mod cors;
pub mod rate_limit;

pub use admission::{Admission, AdmissionControl};
pub use cors::CorsPolicy;
pub use rate_limit::{BucketParams, ClientLimiterTable, IdentityResolver, Sweeper, TokenBucket};
