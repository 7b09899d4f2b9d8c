//! Infrastructure Layer
//!
//! Repository implementations over the key-value port, the SQLite backend,
//! the remote order sink and the product catalog.

pub mod catalog;
pub mod kv;
pub mod remote_sink;
pub mod sqlite;
