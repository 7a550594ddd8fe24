//! Orders placed at checkout.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Product;
use crate::types::{OrderId, OrderStatus, UserId};

/// The buyer reference embedded in an order, populated with the name only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Buyer {
    #[serde(rename = "_id")]
    pub id: UserId,
    pub name: String,
}

/// A placed order.
///
/// `payment` is the payment gateway's transaction record, kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: OrderId,
    pub products: Vec<Product>,
    pub payment: serde_json::Value,
    pub buyer: Buyer,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
