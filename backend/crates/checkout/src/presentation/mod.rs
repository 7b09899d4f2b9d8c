//! Presentation Layer
//!
//! HTTP handlers and DTOs exposing the checkout pipeline to the storefront.

pub mod admin;
pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod router;
