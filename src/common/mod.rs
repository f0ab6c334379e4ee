//! Fault-tolerance utilities shared by exchange clients
//!
//! - Circuit breaker that stops hammering a failing exchange
//! - Rate limiter that spaces outgoing requests

pub mod circuit_breaker;
pub mod rate_limiter;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use rate_limiter::RateLimiter;
