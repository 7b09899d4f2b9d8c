//! API DTOs (Data Transfer Objects)

use chrono::{DateTime, Utc};
use platform::fingerprint::ReportedSignals;
use serde::{Deserialize, Serialize};

use crate::application::coupon_engine::PointsOffer;
use crate::domain::cart::CartLine;
use crate::domain::customer::CustomerInput;
use crate::domain::entities::Coupon;
use crate::domain::order::Order;
use crate::domain::value_objects::{Amount, OrderStatus, RiskLevel};

/// Response for GET /api/checkout/challenge
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeResponse {
    pub enabled: bool,
    pub question: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Request for PUT /api/checkout/cart
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartRequest {
    pub lines: Vec<CartLine>,
    /// Signed member reference from the member service; an empty string
    /// signs the member out, an absent one keeps the current member
    #[serde(default)]
    pub member_token: Option<String>,
}

/// Response for PUT /api/checkout/cart
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartResponse {
    pub lines: Vec<CartLine>,
    pub subtotal: Amount,
    pub total_quantity: i64,
}

/// Request for POST /api/checkout/coupon
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponRequest {
    pub code: String,
    #[serde(default)]
    pub device: ReportedSignals,
}

/// Response for POST /api/checkout/coupon
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponResponse {
    pub valid: bool,
    pub code: String,
    pub discount: Option<Amount>,
    pub description: Option<String>,
    pub message: Option<String>,
}

/// Response for GET /api/checkout/coupons
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponListResponse {
    pub coupons: Vec<Coupon>,
    pub points_offers: Vec<PointsOffer>,
}

/// Request for POST /api/checkout/points/exchange
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointsExchangeRequest {
    pub code: String,
    #[serde(default)]
    pub device: ReportedSignals,
}

/// Query for GET /api/checkout/orders
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderLookupQuery {
    pub phone: String,
    pub email: String,
}

/// Request for PUT /api/checkout/admin/orders/{order_number}/status
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateRequest {
    pub status: OrderStatus,
    #[serde(default)]
    pub note: String,
}

/// Request for PUT /api/checkout/admin/orders/{order_number}/tracking
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingNumberRequest {
    pub tracking_number: String,
}

/// Request for POST /api/checkout/submit
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub customer: CustomerInput,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub coupon_code: Option<String>,
    #[serde(default)]
    pub captcha_answer: Option<i64>,
    #[serde(default)]
    pub acknowledge_risk: bool,
    #[serde(default)]
    pub device: ReportedSignals,
}

/// Response for POST /api/checkout/submit
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub order: Order,
    pub risk_level: RiskLevel,
    pub remaining_orders: u32,
    pub points_earned: Option<i64>,
}
