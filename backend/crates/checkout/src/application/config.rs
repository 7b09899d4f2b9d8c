//! Application Configuration
//!
//! [`SecurityConfig`] holds the admin-tunable anti-abuse limits. It is stored
//! as a document and re-read at the start of every submission through
//! [`SecuritySettings`], then passed explicitly to each component.
//! [`CheckoutConfig`] holds process-level settings fixed at startup.

use std::sync::Arc;
use std::time::Duration;

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

/// Re-export SameSite from platform
pub use platform::cookie::SameSite;
use platform::cookie::CookieConfig;
use platform::rate_limit::RateLimitConfig;

use crate::domain::cart::CartLimits;
use crate::domain::repository::SettingsRepository;
use crate::domain::services::cart_rules::CartRules;
use crate::domain::services::fraud::FraudRules;
use crate::domain::value_objects::Amount;
use crate::error::{CheckoutError, CheckoutResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptchaRange {
    pub min: i64,
    pub max: i64,
}

impl Default for CaptchaRange {
    fn default() -> Self {
        Self { min: 1, max: 10 }
    }
}

/// Anti-abuse limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SecurityConfig {
    /// Orders allowed per device inside `time_window`
    pub max_orders: u32,
    /// Sliding window in minutes; zero or less blocks after the first order
    pub time_window: i64,
    /// Block length in minutes
    pub block_duration: i64,
    pub max_items: usize,
    pub max_quantity_per_product: i64,
    pub max_total_quantity: i64,
    pub min_amount: Amount,
    pub max_amount: Amount,
    pub captcha_enabled: bool,
    pub captcha_range: CaptchaRange,
    /// Enforce name charset and phone formats
    pub strict_mode: bool,
    /// Compare client prices with the catalog
    pub check_price_on_backend: bool,
    pub max_item_price: Amount,
    pub shipping_fee: Amount,
    pub high_value_threshold: Amount,
    pub suspicious_order_threshold: usize,
    pub fraud_lookback_hours: i64,
    pub large_quantity_threshold: i64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_orders: 3,
            time_window: 60,
            block_duration: 1440,
            max_items: 20,
            max_quantity_per_product: 10,
            max_total_quantity: 50,
            min_amount: 100,
            max_amount: 50_000,
            captcha_enabled: true,
            captcha_range: CaptchaRange::default(),
            strict_mode: true,
            check_price_on_backend: true,
            max_item_price: 10_000,
            shipping_fee: 60,
            high_value_threshold: 10_000,
            suspicious_order_threshold: 3,
            fraud_lookback_hours: 24,
            large_quantity_threshold: 5,
        }
    }
}

impl SecurityConfig {
    /// Range checks applied before a config is stored
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if !(1..=100).contains(&self.max_orders) {
            errors.push("maxOrders must be between 1 and 100".to_string());
        }
        if !(1..=100).contains(&self.max_items) {
            errors.push("maxItems must be between 1 and 100".to_string());
        }
        if self.max_quantity_per_product < 1 || self.max_total_quantity < 1 {
            errors.push("Quantity limits must be at least 1".to_string());
        }
        if self.block_duration < 0 {
            errors.push("blockDuration cannot be negative".to_string());
        }
        if self.min_amount < 0 {
            errors.push("minAmount cannot be negative".to_string());
        }
        if self.max_amount > 1_000_000 {
            errors.push("maxAmount cannot exceed 1000000".to_string());
        }
        if self.min_amount > self.max_amount {
            errors.push("minAmount cannot be greater than maxAmount".to_string());
        }
        if self.captcha_range.min > self.captcha_range.max {
            errors.push("captchaRange min cannot be greater than max".to_string());
        }
        errors
    }

    pub fn cart_limits(&self) -> CartLimits {
        CartLimits {
            max_items: self.max_items,
            max_quantity_per_product: self.max_quantity_per_product,
            max_total_quantity: self.max_total_quantity,
            max_item_price: self.max_item_price,
        }
    }

    pub fn cart_rules(&self) -> CartRules {
        CartRules {
            limits: self.cart_limits(),
            max_item_price: self.max_item_price,
            check_price: self.check_price_on_backend,
        }
    }

    pub fn fraud_rules(&self) -> FraudRules {
        FraudRules {
            large_quantity_threshold: self.large_quantity_threshold,
            high_value_threshold: self.high_value_threshold,
            suspicious_order_threshold: self.suspicious_order_threshold,
        }
    }

    pub fn rate_limit(&self) -> RateLimitConfig {
        RateLimitConfig::new(self.max_orders, TimeDelta::minutes(self.time_window))
    }

    pub fn block_duration(&self) -> TimeDelta {
        TimeDelta::minutes(self.block_duration.max(0))
    }

    pub fn fraud_lookback(&self) -> TimeDelta {
        TimeDelta::hours(self.fraud_lookback_hours.max(0))
    }
}

/// Loads and stores [`SecurityConfig`]
pub struct SecuritySettings<R>
where
    R: SettingsRepository,
{
    repo: Arc<R>,
}

impl<R> SecuritySettings<R>
where
    R: SettingsRepository,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// The stored config, or the defaults when none is stored or it cannot be read
    pub async fn current(&self) -> SecurityConfig {
        match self.repo.load_security_config().await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!(error = %e, "Stored security config is malformed, using defaults");
                    SecurityConfig::default()
                }
            },
            Ok(None) => SecurityConfig::default(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read security config, using defaults");
                SecurityConfig::default()
            }
        }
    }

    /// Validate and store a new config; takes effect on the next submission
    pub async fn update(&self, config: &SecurityConfig) -> CheckoutResult<()> {
        let errors = config.validate();
        if !errors.is_empty() {
            return Err(CheckoutError::Validation(errors));
        }
        let raw = serde_json::to_string(config)
            .map_err(|e| CheckoutError::Internal(format!("Failed to encode config: {e}")))?;
        self.repo.save_security_config(raw).await?;
        tracing::info!(
            max_orders = config.max_orders,
            time_window = config.time_window,
            "Security config updated"
        );
        Ok(())
    }
}

/// Process-level checkout configuration
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    /// Cookie name for the checkout session
    pub session_cookie_name: String,
    /// HMAC key signing session cookies (32 bytes)
    pub session_secret: [u8; 32],
    /// Idle lifetime of a checkout session
    pub session_ttl: Duration,
    pub cookie_secure: bool,
    pub cookie_same_site: SameSite,
    /// Simulated payment processing delay
    pub payment_latency: Duration,
    /// Remote order sink endpoint; disabled when `None`
    pub order_sink_url: Option<String>,
    /// HMAC key of member references, shared with the member service
    pub member_secret: [u8; 32],
    /// Bearer token for the admin routes; they are not mounted when `None`
    pub admin_token: Option<String>,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            session_cookie_name: "checkout_session".to_string(),
            session_secret: [0u8; 32],
            session_ttl: Duration::from_secs(2 * 3600),
            cookie_secure: true,
            cookie_same_site: SameSite::Lax,
            payment_latency: Duration::from_millis(1500),
            order_sink_url: None,
            member_secret: [0u8; 32],
            admin_token: None,
        }
    }
}

impl CheckoutConfig {
    /// Create config with a random session secret
    pub fn with_random_secret() -> Self {
        Self {
            session_secret: platform::crypto::random_secret(),
            member_secret: platform::crypto::random_secret(),
            ..Default::default()
        }
    }

    /// Create config for development (insecure cookie)
    pub fn development() -> Self {
        Self {
            cookie_secure: false,
            ..Self::with_random_secret()
        }
    }

    pub fn session_ttl_secs(&self) -> i64 {
        i64::try_from(self.session_ttl.as_secs()).unwrap_or(i64::MAX)
    }

    pub fn cookie(&self) -> CookieConfig {
        CookieConfig {
            name: self.session_cookie_name.clone(),
            secure: self.cookie_secure,
            same_site: self.cookie_same_site,
            max_age_secs: Some(self.session_ttl_secs()),
            ..CookieConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SecurityConfig::default();
        assert_eq!(config.max_orders, 3);
        assert_eq!(config.time_window, 60);
        assert_eq!(config.block_duration, 1440);
        assert_eq!(config.captcha_range, CaptchaRange { min: 1, max: 10 });
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_partial_document_fills_defaults() {
        let config: SecurityConfig =
            serde_json::from_str(r#"{"maxOrders": 5, "strictMode": false}"#).unwrap();
        assert_eq!(config.max_orders, 5);
        assert!(!config.strict_mode);
        assert_eq!(config.max_amount, 50_000);
    }

    #[test]
    fn test_validate_ranges() {
        let config = SecurityConfig {
            max_orders: 0,
            max_items: 101,
            min_amount: 500,
            max_amount: 100,
            captcha_range: CaptchaRange { min: 9, max: 1 },
            ..SecurityConfig::default()
        };
        assert_eq!(config.validate().len(), 4);
    }

    #[test]
    fn test_development_config() {
        let config = CheckoutConfig::development();
        assert!(!config.cookie_secure);
        assert_ne!(config.session_secret, [0u8; 32]);
        assert_eq!(config.cookie().max_age_secs, Some(7200));
    }
}
