//! Domain Layer
//!
//! Entities, value objects, pure rules and the ports the application layer
//! depends on. Nothing here performs I/O.

pub mod cart;
pub mod customer;
pub mod entities;
pub mod order;
pub mod repository;
pub mod services;
pub mod value_objects;
