//! Checkout Backend Module
//!
//! Order submission and anti-abuse pipeline for the storefront.
//!
//! Clean Architecture structure:
//! - `domain/` - Entities, value objects, pure rules, repository traits
//! - `application/` - Use cases and configuration
//! - `infra/` - Key-value repositories, SQLite store, remote sink, catalog
//! - `presentation/` - HTTP handlers
//!
//! ## Security Model
//! - Prices, quantities and totals are re-validated on every submission;
//!   client-held prices that differ from the catalog are rejected as tampering
//! - The device id is a spoofable heuristic used for rate limiting and fraud
//!   scoring only, never for authentication
//! - Rate-limit quota is consumed only by orders that were actually persisted
//! - One submission at a time per session
//! - Member ids are only accepted as references signed by the member service
//! - Admin routes exist only when an admin bearer token is configured

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

// Re-exports for convenience
pub use application::config::{CheckoutConfig, SecurityConfig};
pub use error::{CheckoutError, CheckoutResult};
pub use infra::kv::KvRepository;
pub use infra::sqlite::SqliteStore;
pub use presentation::router::checkout_router;

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult, OptionExt, ResultExt},
    kind::ErrorKind,
};
