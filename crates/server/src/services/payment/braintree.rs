//! Braintree GraphQL client.
//!
//! Queries are hand-written; `graphql_client` supplies the request and
//! response envelopes. Authentication is HTTP basic with the API key pair.

use std::sync::Arc;

use async_trait::async_trait;
use graphql_client::{QueryBody, Response};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{PaymentError, PaymentGateway, Transaction};
use crate::config::BraintreeConfig;

const BRAINTREE_VERSION: &str = "2019-01-01";

const CLIENT_TOKEN_MUTATION: &str = r"
mutation ClientToken($input: CreateClientTokenInput) {
  createClientToken(input: $input) {
    clientToken
  }
}
";

const CHARGE_MUTATION: &str = r"
mutation ChargePaymentMethod($input: ChargePaymentMethodInput!) {
  chargePaymentMethod(input: $input) {
    transaction {
      id
      legacyId
      status
      createdAt
      amount {
        value
        currencyIsoCode
      }
      paymentMethodSnapshot {
        __typename
      }
    }
  }
}
";

/// Transaction statuses that mean the charge did not go through.
const DECLINED_STATUSES: &[&str] = &[
    "PROCESSOR_DECLINED",
    "GATEWAY_REJECTED",
    "FAILED",
    "SETTLEMENT_DECLINED",
];

#[derive(Serialize)]
struct Input<T> {
    input: T,
}

#[derive(Serialize)]
struct EmptyInput {}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChargeInput<'a> {
    payment_method_id: &'a str,
    transaction: TransactionInput,
}

#[derive(Serialize)]
struct TransactionInput {
    amount: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClientTokenData {
    create_client_token: Option<ClientTokenPayload>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClientTokenPayload {
    client_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChargeData {
    charge_payment_method: Option<ChargePayload>,
}

#[derive(Deserialize)]
struct ChargePayload {
    transaction: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct TransactionSummary {
    id: String,
    status: String,
}

/// Client for the Braintree GraphQL API.
#[derive(Clone)]
pub struct BraintreeGateway {
    inner: Arc<BraintreeGatewayInner>,
}

struct BraintreeGatewayInner {
    client: reqwest::Client,
    endpoint: String,
    merchant_id: String,
    public_key: String,
    private_key: SecretString,
}

impl BraintreeGateway {
    /// Create a client for the configured environment.
    #[must_use]
    pub fn new(config: &BraintreeConfig) -> Self {
        Self {
            inner: Arc::new(BraintreeGatewayInner {
                client: reqwest::Client::new(),
                endpoint: config.environment.endpoint().to_string(),
                merchant_id: config.merchant_id.clone(),
                public_key: config.public_key.clone(),
                private_key: config.private_key.clone(),
            }),
        }
    }

    /// Execute a GraphQL operation and return its `data`.
    async fn execute<V, D>(
        &self,
        operation_name: &'static str,
        query: &'static str,
        variables: V,
    ) -> Result<D, PaymentError>
    where
        V: Serialize + Send,
        D: DeserializeOwned,
    {
        let body = QueryBody {
            variables,
            query,
            operation_name,
        };

        let response = self
            .inner
            .client
            .post(&self.inner.endpoint)
            .basic_auth(
                &self.inner.public_key,
                Some(self.inner.private_key.expose_secret()),
            )
            .header("Braintree-Version", BRAINTREE_VERSION)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let response_text = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                operation = operation_name,
                merchant_id = %self.inner.merchant_id,
                body = %response_text.chars().take(500).collect::<String>(),
                "Braintree API returned non-success status"
            );
            return Err(PaymentError::Gateway(format!("HTTP {status}")));
        }

        let response: Response<D> = serde_json::from_str(&response_text).inspect_err(|e| {
            tracing::error!(
                error = %e,
                operation = operation_name,
                body = %response_text.chars().take(500).collect::<String>(),
                "Failed to parse Braintree GraphQL response"
            );
        })?;

        if let Some(errors) = response.errors
            && !errors.is_empty()
        {
            tracing::debug!(errors = ?errors, operation = operation_name, "GraphQL errors in response");
            return Err(classify_errors(&errors));
        }

        response
            .data
            .ok_or_else(|| PaymentError::Gateway("No data in response".to_string()))
    }
}

/// Validation errors are about the payment method; anything else is the gateway's problem.
fn classify_errors(errors: &[graphql_client::Error]) -> PaymentError {
    let message = errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ");

    let is_validation = errors.iter().any(|e| {
        e.extensions
            .as_ref()
            .and_then(|ext| ext.get("errorClass"))
            .and_then(serde_json::Value::as_str)
            == Some("VALIDATION")
    });

    if is_validation {
        PaymentError::Declined(message)
    } else {
        PaymentError::Gateway(message)
    }
}

/// Turn the raw transaction record into a [`Transaction`], rejecting declines.
fn into_transaction(raw: serde_json::Value) -> Result<Transaction, PaymentError> {
    let summary: TransactionSummary = serde_json::from_value(raw.clone())?;
    if DECLINED_STATUSES.contains(&summary.status.as_str()) {
        return Err(PaymentError::Declined(format!(
            "transaction {} {}",
            summary.id, summary.status
        )));
    }
    Ok(Transaction {
        id: summary.id,
        status: summary.status,
        raw,
    })
}

#[async_trait]
impl PaymentGateway for BraintreeGateway {
    async fn client_token(&self) -> Result<String, PaymentError> {
        let data: ClientTokenData = self
            .execute("ClientToken", CLIENT_TOKEN_MUTATION, Input { input: EmptyInput {} })
            .await?;

        data.create_client_token
            .and_then(|p| p.client_token)
            .ok_or_else(|| PaymentError::Gateway("no client token returned".to_string()))
    }

    async fn charge(&self, nonce: &str, amount: Decimal) -> Result<Transaction, PaymentError> {
        let variables = Input {
            input: ChargeInput {
                payment_method_id: nonce,
                transaction: TransactionInput {
                    amount: format!("{amount:.2}"),
                },
            },
        };

        let data: ChargeData = self
            .execute("ChargePaymentMethod", CHARGE_MUTATION, variables)
            .await?;

        let raw = data
            .charge_payment_method
            .and_then(|p| p.transaction)
            .ok_or_else(|| PaymentError::Gateway("no transaction returned".to_string()))?;

        let transaction = into_transaction(raw)?;
        tracing::info!(
            transaction_id = %transaction.id,
            status = %transaction.status,
            amount = %amount,
            "Braintree charge completed"
        );
        Ok(transaction)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn graphql_error(message: &str, error_class: &str) -> graphql_client::Error {
        serde_json::from_value(json!({
            "message": message,
            "extensions": { "errorClass": error_class }
        }))
        .unwrap()
    }

    #[test]
    fn test_validation_errors_are_declines() {
        let err = classify_errors(&[graphql_error("Unknown or expired payment_method_nonce.", "VALIDATION")]);
        assert!(matches!(err, PaymentError::Declined(ref m) if m.contains("payment_method_nonce")));
    }

    #[test]
    fn test_other_errors_are_gateway_failures() {
        let err = classify_errors(&[graphql_error("Service unavailable", "INTERNAL")]);
        assert!(matches!(err, PaymentError::Gateway(_)));
    }

    #[test]
    fn test_declined_status_rejected() {
        let raw = json!({ "id": "dHJhbnNhY3Rpb25fYWJj", "status": "PROCESSOR_DECLINED" });
        assert!(matches!(into_transaction(raw), Err(PaymentError::Declined(_))));
    }

    #[test]
    fn test_submitted_transaction_kept_verbatim() {
        let raw = json!({
            "id": "dHJhbnNhY3Rpb25fYWJj",
            "status": "SUBMITTED_FOR_SETTLEMENT",
            "amount": { "value": "79.99", "currencyIsoCode": "USD" }
        });
        let transaction = into_transaction(raw.clone()).unwrap();
        assert_eq!(transaction.id, "dHJhbnNhY3Rpb25fYWJj");
        assert_eq!(transaction.raw, raw);
    }

    #[test]
    fn test_charge_variables_shape() {
        let variables = Input {
            input: ChargeInput {
                payment_method_id: "fake-valid-nonce",
                transaction: TransactionInput {
                    amount: format!("{:.2}", Decimal::new(10, 0)),
                },
            },
        };
        let json = serde_json::to_value(&variables).unwrap();
        assert_eq!(json["input"]["paymentMethodId"], "fake-valid-nonce");
        assert_eq!(json["input"]["transaction"]["amount"], "10.00");
    }
}
