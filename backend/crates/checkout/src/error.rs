//! Checkout Error Types
//!
//! Checkout-specific error variants that integrate with the unified
//! `kernel::error::AppError` system. Every rejection names the violated
//! constraint; handlers render them as a list of user-facing messages.

use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use platform::storage::StorageError;
use thiserror::Error;

use crate::domain::value_objects::OrderStatus;

/// Checkout-specific result type alias
pub type CheckoutResult<T> = Result<T, CheckoutError>;

#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Cart, amount or customer data violations; nothing was persisted
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("No verification question was issued. Please request a new one")]
    ChallengeMissing,

    #[error("The verification question expired. Please request a new one")]
    ChallengeExpired,

    #[error("Incorrect answer to the verification question")]
    ChallengeIncorrect,

    /// Device is temporarily blocked
    #[error("{message}")]
    RateLimited {
        message: String,
        retry_after_minutes: i64,
    },

    /// High-risk order waiting for explicit confirmation
    #[error("This order needs confirmation before it can be placed")]
    ConfirmationRequired { flags: Vec<String> },

    #[error("An order submission is already in progress")]
    SubmissionInProgress,

    /// Member reference missing a valid signature
    #[error("Member sign-in could not be verified")]
    MemberTokenInvalid,

    #[error("Admin credentials required")]
    AdminUnauthorized,

    #[error("Payment failed: {0}")]
    Payment(String),

    /// Local order store failure
    #[error("The order could not be saved: {0}")]
    Persistence(String),

    /// Failure after the order was assembled; the cart is kept for a retry
    #[error("Order {order_number} could not be completed: {reason}")]
    SubmissionFailed {
        order_number: String,
        reason: String,
    },

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Cannot change order status from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CheckoutError {
    pub fn validation(message: impl Into<String>) -> Self {
        CheckoutError::Validation(vec![message.into()])
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CheckoutError::Validation(_) => ErrorKind::UnprocessableEntity,
            CheckoutError::ChallengeMissing | CheckoutError::ChallengeExpired => ErrorKind::Gone,
            CheckoutError::ChallengeIncorrect => ErrorKind::BadRequest,
            CheckoutError::RateLimited { .. } => ErrorKind::TooManyRequests,
            CheckoutError::MemberTokenInvalid | CheckoutError::AdminUnauthorized => {
                ErrorKind::Unauthorized
            }
            CheckoutError::ConfirmationRequired { .. } => ErrorKind::PreconditionRequired,
            CheckoutError::SubmissionInProgress | CheckoutError::InvalidTransition { .. } => {
                ErrorKind::Conflict
            }
            CheckoutError::Payment(_) => ErrorKind::BadGateway,
            CheckoutError::Persistence(_) | CheckoutError::Storage(_) => {
                ErrorKind::ServiceUnavailable
            }
            CheckoutError::OrderNotFound(_) => ErrorKind::NotFound,
            CheckoutError::SubmissionFailed { .. } | CheckoutError::Internal(_) => {
                ErrorKind::InternalServerError
            }
        }
    }

    /// Log the error with appropriate level
    fn log(&self) {
        match self {
            CheckoutError::Storage(e) => {
                tracing::error!(error = %e, "Checkout storage error");
            }
            CheckoutError::Persistence(msg) | CheckoutError::Internal(msg) => {
                tracing::error!(message = %msg, "Checkout internal error");
            }
            CheckoutError::SubmissionFailed {
                order_number,
                reason,
            } => {
                tracing::error!(order_number = %order_number, reason = %reason, "Order submission failed");
            }
            CheckoutError::Payment(msg) => {
                tracing::warn!(message = %msg, "Payment failed");
            }
            CheckoutError::RateLimited {
                retry_after_minutes,
                ..
            } => {
                tracing::warn!(retry_after_minutes, "Checkout rate limit exceeded");
            }
            CheckoutError::ConfirmationRequired { flags } => {
                tracing::warn!(flags = ?flags, "High-risk order awaiting confirmation");
            }
            _ => {
                tracing::debug!(error = %self, "Checkout error");
            }
        }
    }
}

impl From<CheckoutError> for AppError {
    fn from(err: CheckoutError) -> Self {
        let kind = err.kind();
        let message = err.to_string();
        match err {
            CheckoutError::Validation(errors) => AppError::new(kind, "Please correct the order")
                .with_details(errors)
                .with_action("Fix the listed problems and submit again"),
            CheckoutError::ChallengeMissing | CheckoutError::ChallengeExpired => {
                AppError::new(kind, message).with_action("Request a new verification question")
            }
            CheckoutError::ChallengeIncorrect => {
                AppError::new(kind, message).with_action("Check your answer and try again")
            }
            CheckoutError::MemberTokenInvalid => {
                AppError::new(kind, message).with_action("Sign in as a member again")
            }
            CheckoutError::RateLimited {
                retry_after_minutes,
                ..
            } => AppError::new(kind, message)
                .with_retry_after(u64::try_from(retry_after_minutes.max(1) * 60).unwrap_or(60)),
            CheckoutError::ConfirmationRequired { flags } => AppError::new(kind, message)
                .with_details(flags)
                .with_action(
                    "Confirm the order to submit it for manual review, or contact customer support",
                ),
            CheckoutError::SubmissionFailed { .. } | CheckoutError::Payment(_) => {
                AppError::new(kind, message)
                    .with_action("Your cart was kept. Please try again in a moment")
            }
            CheckoutError::Storage(e) => {
                AppError::service_unavailable("Storage is temporarily unavailable").with_source(e)
            }
            _ => AppError::new(kind, message),
        }
    }
}

impl IntoResponse for CheckoutError {
    fn into_response(self) -> Response {
        self.log();
        AppError::from(self).into_response()
    }
}

impl From<crate::domain::cart::CartLimitError> for CheckoutError {
    fn from(err: crate::domain::cart::CartLimitError) -> Self {
        CheckoutError::validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_maps_to_detail_list() {
        let app: AppError = CheckoutError::Validation(vec![
            "Your cart is empty".to_string(),
            "Phone number is required".to_string(),
        ])
        .into();
        assert_eq!(app.status_code(), 422);
        assert_eq!(app.user_messages().len(), 2);
    }

    #[test]
    fn test_rate_limit_sets_retry_after() {
        let app: AppError = CheckoutError::RateLimited {
            message: "Too many orders".to_string(),
            retry_after_minutes: 10,
        }
        .into();
        assert_eq!(app.status_code(), 429);
        assert_eq!(app.retry_after_secs(), Some(600));
        assert_eq!(app.message(), "Too many orders");
    }

    #[test]
    fn test_confirmation_required_lists_flags() {
        let app: AppError = CheckoutError::ConfirmationRequired {
            flags: vec!["High order total: NT$ 12000".to_string()],
        }
        .into();
        assert_eq!(app.status_code(), 428);
        assert_eq!(app.user_messages(), vec!["High order total: NT$ 12000"]);
        assert!(app.action().is_some());
    }

    #[test]
    fn test_kinds() {
        assert_eq!(CheckoutError::ChallengeExpired.kind(), ErrorKind::Gone);
        assert_eq!(CheckoutError::SubmissionInProgress.kind(), ErrorKind::Conflict);
        assert_eq!(CheckoutError::MemberTokenInvalid.kind(), ErrorKind::Unauthorized);
        assert_eq!(
            CheckoutError::Payment("declined".to_string()).kind(),
            ErrorKind::BadGateway
        );
    }
}
