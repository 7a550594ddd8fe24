//! Checkout handlers under `/api/v1/payment`.

use std::collections::HashMap;

use axum::extract::State;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bazaar_core::{Product, ProductId};

use super::extract::{AppJson, present};
use crate::error::{AppError, Result};
use crate::middleware::AuthUser;
use crate::models::NewOrder;
use crate::state::AppState;

/// A cart line. Clients send whole products; only `_id` is read.
#[derive(Debug, Deserialize)]
pub struct CartLine {
    #[serde(rename = "_id")]
    pub id: ProductId,
}

#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    pub nonce: Option<String>,
    #[serde(default)]
    pub cart: Vec<CartLine>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientTokenResponse {
    pub client_token: String,
}

#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub ok: bool,
}

/// `GET /braintree/token`
pub async fn client_token(State(state): State<AppState>) -> Result<AppJson<ClientTokenResponse>> {
    let client_token = state.payments().client_token().await?;
    Ok(AppJson(ClientTokenResponse { client_token }))
}

/// Sum of stored prices for each cart line, duplicates counted per line.
fn cart_total(lines: &[ProductId], products: &[Product]) -> Result<Decimal> {
    let prices: HashMap<ProductId, Decimal> = products.iter().map(|p| (p.id, p.price)).collect();
    lines.iter().try_fold(Decimal::ZERO, |total, id| {
        prices
            .get(id)
            .map(|price| total + price)
            .ok_or_else(|| AppError::NotFound("Product not found".to_string()))
    })
}

/// `POST /braintree/payment`
pub async fn checkout(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    AppJson(body): AppJson<PaymentRequest>,
) -> Result<AppJson<PaymentResponse>> {
    let Some(nonce) = present(body.nonce) else {
        return Err(AppError::BadRequest("Payment nonce is required".to_string()));
    };
    if body.cart.is_empty() {
        return Err(AppError::BadRequest("Cart is empty".to_string()));
    }

    let lines: Vec<ProductId> = body.cart.iter().map(|line| line.id).collect();
    let products = state.repos().products.get_many(&lines).await?;
    let amount = cart_total(&lines, &products)?;

    let transaction = state.payments().charge(&nonce, amount).await?;
    tracing::info!(
        user_id = %claims.id,
        transaction_id = %transaction.id,
        %amount,
        "Payment charged"
    );

    let order = NewOrder {
        products: lines,
        payment: transaction.raw,
        buyer: claims.id,
    };
    match state.repos().orders.create(&order).await {
        Ok(order) => {
            tracing::info!(order_id = %order.id, user_id = %claims.id, "Order placed");
            Ok(AppJson(PaymentResponse { ok: true }))
        }
        Err(err) => {
            tracing::error!(
                transaction_id = %transaction.id,
                user_id = %claims.id,
                error = %err,
                "Order not recorded after successful charge"
            );
            Err(AppError::Internal(format!(
                "order not recorded for transaction {}",
                transaction.id
            )))
        }
    }
}
