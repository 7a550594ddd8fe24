//! Payment gateway seam.
//!
//! Checkout only needs two things from a gateway: a client token for the
//! browser drop-in, and a charge against a payment-method nonce. The
//! transaction record comes back as opaque JSON and is stored verbatim on
//! the order.

mod braintree;

pub use braintree::BraintreeGateway;

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors from the payment gateway.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// The processor or gateway refused the charge.
    #[error("payment declined: {0}")]
    Declined(String),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not the expected JSON.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The gateway answered with an error unrelated to the card.
    #[error("gateway error: {0}")]
    Gateway(String),

    /// No gateway credentials were configured.
    #[error("payment gateway is not configured")]
    NotConfigured,
}

/// A settled (or authorized) charge.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    /// Gateway transaction ID.
    pub id: String,
    /// Gateway status string, e.g. `SUBMITTED_FOR_SETTLEMENT`.
    pub status: String,
    /// Full transaction record as returned by the gateway.
    pub raw: serde_json::Value,
}

/// Operations checkout needs from a payment provider.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Token the browser drop-in uses to collect a payment method.
    async fn client_token(&self) -> Result<String, PaymentError>;

    /// Charge `amount` to the payment method behind `nonce`.
    async fn charge(&self, nonce: &str, amount: Decimal) -> Result<Transaction, PaymentError>;
}

/// Gateway used when no credentials are configured; every call fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledGateway;

#[async_trait]
impl PaymentGateway for DisabledGateway {
    async fn client_token(&self) -> Result<String, PaymentError> {
        Err(PaymentError::NotConfigured)
    }

    async fn charge(&self, _nonce: &str, _amount: Decimal) -> Result<Transaction, PaymentError> {
        Err(PaymentError::NotConfigured)
    }
}
