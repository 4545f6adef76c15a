// web-server/src/middleware/mod.rs
pub mod rate_limiter;
pub mod session_gate;

pub use rate_limiter::RateLimiter;
pub use session_gate::{GatePolicy, SessionGate};
