//! Failure Containment: circuit breakers and the action rate limiter.
pub mod breaker;
pub mod rate;

pub use breaker::{Admission, CircuitState, JobBreaker, JobVerdict, RunBreaker};
pub use rate::RateLimiter;
