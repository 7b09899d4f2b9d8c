//! Domain Services
//!
//! Pure rule evaluation: cart checks, pricing, fraud scoring and challenge
//! generation.

pub mod captcha;
pub mod cart_rules;
pub mod fraud;
pub mod pricing;
