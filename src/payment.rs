use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use crate::models::PaymentMethod;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Authorization {
    Approved { reference: String },
    Declined { reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("cannot charge a non-positive amount ({0} cents)")]
    InvalidAmount(i64),
}

/// Charges an order total. Implementations talk to a real gateway; the
/// storefront only sees approve/decline.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    async fn authorize(
        &self,
        amount_cents: i64,
        method: PaymentMethod,
    ) -> Result<Authorization, PaymentError>;
}

/// Approves every charge. Stands in for a gateway in demos and tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct DemoProcessor;

#[async_trait]
impl PaymentProcessor for DemoProcessor {
    async fn authorize(
        &self,
        amount_cents: i64,
        method: PaymentMethod,
    ) -> Result<Authorization, PaymentError> {
        if amount_cents <= 0 {
            return Err(PaymentError::InvalidAmount(amount_cents));
        }
        let reference = format!("demo-{}", Uuid::new_v4().simple());
        info!(amount_cents = amount_cents, method = method.as_code(), reference = %reference, "demo payment approved");
        Ok(Authorization::Approved { reference })
    }
}

#[cfg(test)]
pub struct DecliningProcessor;

#[cfg(test)]
#[async_trait]
impl PaymentProcessor for DecliningProcessor {
    async fn authorize(
        &self,
        _amount_cents: i64,
        _method: PaymentMethod,
    ) -> Result<Authorization, PaymentError> {
        Ok(Authorization::Declined { reason: "insufficient funds".to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn demo_processor_approves_positive_amounts() {
        let auth = DemoProcessor.authorize(2673, PaymentMethod::CreditCard).await.unwrap();
        let Authorization::Approved { reference } = auth else {
            panic!("expected approval");
        };
        assert!(reference.starts_with("demo-"));

        let err = DemoProcessor.authorize(0, PaymentMethod::Paypal).await;
        assert!(matches!(err, Err(PaymentError::InvalidAmount(0))));
    }
}
