//! API middleware stack.
//!
//! Execution order (outermost → innermost):
//! 1. Audit logger: assigns the request id, times the whole exchange
//! 2. Rate limiter: rejects early, before any model work

pub mod audit;
pub mod rate;
