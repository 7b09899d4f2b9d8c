//! Payment Simulator
//!
//! Stands in for a real gateway behind [`PaymentGateway`]. It waits a
//! configurable latency and always succeeds, producing the method-specific
//! reference data a customer needs to pay.

use std::sync::Arc;
use std::time::Duration;

use chrono::TimeDelta;
use platform::clock::Clock;

use crate::domain::order::{BankAccount, Order, PaymentConfirmation, PaymentDetails};
use crate::domain::repository::PaymentGateway;
use crate::domain::value_objects::PaymentMethod;
use crate::error::CheckoutResult;

/// Days a transfer or ATM payment stays open
pub const PAYMENT_DUE_DAYS: i64 = 3;

/// Prefix of generated ATM virtual accounts
const VIRTUAL_ACCOUNT_PREFIX: &str = "9985";

pub struct PaymentSimulator {
    clock: Arc<dyn Clock>,
    latency: Duration,
    bank: BankAccount,
}

impl PaymentSimulator {
    pub fn new(clock: Arc<dyn Clock>, latency: Duration) -> Self {
        Self {
            clock,
            latency,
            bank: default_bank_account(),
        }
    }

    pub fn with_bank_account(mut self, bank: BankAccount) -> Self {
        self.bank = bank;
        self
    }

    fn details(&self, method: PaymentMethod) -> PaymentDetails {
        let due_date = (self.clock.now() + TimeDelta::days(PAYMENT_DUE_DAYS)).date_naive();
        match method {
            PaymentMethod::CashOnDelivery => PaymentDetails::CashOnDelivery {
                note: "Please pay the courier in cash on delivery".to_string(),
            },
            PaymentMethod::BankTransfer => PaymentDetails::BankTransfer {
                transfer_code: platform::crypto::random_digits(5),
                bank: self.bank.clone(),
                due_date,
            },
            PaymentMethod::Atm => PaymentDetails::Atm {
                virtual_account: format!(
                    "{VIRTUAL_ACCOUNT_PREFIX}{}",
                    platform::crypto::random_digits(12)
                ),
                due_date,
            },
            PaymentMethod::CreditCard | PaymentMethod::LinePay | PaymentMethod::JkoPay => {
                PaymentDetails::Online {
                    transaction_id: format!(
                        "TXN{}{}",
                        self.clock.now_ms(),
                        platform::crypto::random_digits(3)
                    ),
                    paid: true,
                }
            }
        }
    }
}

impl PaymentGateway for PaymentSimulator {
    async fn process(
        &self,
        method: PaymentMethod,
        order: &Order,
    ) -> CheckoutResult<PaymentConfirmation> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let confirmation = PaymentConfirmation {
            method,
            fee: method.fee(),
            details: self.details(method),
            processed_at: self.clock.now(),
        };

        tracing::info!(
            order_number = %order.order_number,
            method = %method,
            fee = confirmation.fee,
            "Payment processed"
        );

        Ok(confirmation)
    }
}

fn default_bank_account() -> BankAccount {
    BankAccount {
        bank_name: "台灣銀行".to_string(),
        branch: "信義分行".to_string(),
        account_number: "123-456-789012".to_string(),
        account_name: "DiDo咖啡".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::fixtures;
    use chrono::{NaiveDate, TimeZone, Utc};
    use platform::clock::ManualClock;

    fn simulator() -> PaymentSimulator {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 7, 10, 3, 0, 0).unwrap(),
        ));
        PaymentSimulator::new(clock, Duration::ZERO)
    }

    fn order() -> Order {
        fixtures::order(
            "ORD202607100001",
            "dev",
            Utc.with_ymd_and_hms(2026, 7, 10, 3, 0, 0).unwrap(),
            vec![fixtures::line("A", "120g", 350, 2)],
        )
    }

    #[tokio::test]
    async fn test_transfer_details() {
        let confirmation = simulator()
            .process(PaymentMethod::BankTransfer, &order())
            .await
            .unwrap();
        assert_eq!(confirmation.fee, 0);
        match confirmation.details {
            PaymentDetails::BankTransfer {
                transfer_code,
                bank,
                due_date,
            } => {
                assert_eq!(transfer_code.len(), 5);
                assert_eq!(bank.account_number, "123-456-789012");
                assert_eq!(due_date, NaiveDate::from_ymd_opt(2026, 7, 13).unwrap());
            }
            other => panic!("unexpected details {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_atm_virtual_account() {
        let confirmation = simulator()
            .process(PaymentMethod::Atm, &order())
            .await
            .unwrap();
        assert_eq!(confirmation.fee, 10);
        match confirmation.details {
            PaymentDetails::Atm {
                virtual_account, ..
            } => {
                assert_eq!(virtual_account.len(), 16);
                assert!(virtual_account.starts_with("9985"));
                assert!(virtual_account.chars().all(|c| c.is_ascii_digit()));
            }
            other => panic!("unexpected details {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_online_and_cod() {
        let sim = simulator();
        let online = sim.process(PaymentMethod::LinePay, &order()).await.unwrap();
        match online.details {
            PaymentDetails::Online {
                transaction_id,
                paid,
            } => {
                assert!(paid);
                assert!(transaction_id.starts_with("TXN"));
            }
            other => panic!("unexpected details {other:?}"),
        }

        let cod = sim
            .process(PaymentMethod::CashOnDelivery, &order())
            .await
            .unwrap();
        assert_eq!(cod.fee, 30);
        assert!(matches!(cod.details, PaymentDetails::CashOnDelivery { .. }));
    }
}
