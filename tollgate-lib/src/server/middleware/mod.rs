pub mod pipeline;
pub mod rate_limit;
pub mod recover;

pub use pipeline::Pipeline;
pub use rate_limit::check_rate_limit;
pub use recover::recover_panic;
