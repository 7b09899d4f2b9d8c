//! Application Layer - Use Cases
//!
//! Orchestrates domain rules and the repository ports. Every component takes
//! the current [`config::SecurityConfig`] as an argument instead of reading a
//! global.

pub mod challenge;
pub mod config;
pub mod coupon_engine;
pub mod device_identity;
pub mod order_tracking;
pub mod payment;
pub mod rate_limiter;
pub mod security_log;
pub mod session;
pub mod submit_order;
