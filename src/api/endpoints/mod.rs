//! API endpoint handlers.
//!
//! Handlers stay thin: decode, call into `CoreState`, map errors.

pub mod forecast;
pub mod health;
pub mod schema;
