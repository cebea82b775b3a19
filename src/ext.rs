//! Pluggable collaborators of the executor: rate limiting and call observers.

pub mod observer;
pub mod rate_limit;

pub use observer::*;
pub use rate_limit::*;
