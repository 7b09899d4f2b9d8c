//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared technical foundations for the checkout service:
//! - Time source abstraction (swappable in tests)
//! - Device signal hashing
//! - Cookie management and signed session tokens
//! - Sliding-window counting
//! - HTML escaping for user-supplied text
//! - Key-value storage port with an in-memory implementation

pub mod clock;
pub mod cookie;
pub mod crypto;
pub mod fingerprint;
pub mod rate_limit;
pub mod sanitize;
pub mod storage;
