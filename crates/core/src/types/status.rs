//! Roles and order statuses.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Access level of a user account.
///
/// Serialized as the integers the storefront has always used:
/// `0` for buyers, `1` for admins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Role {
    /// Can browse, keep a cart and check out.
    #[default]
    Buyer,
    /// Can additionally manage categories, products and order status.
    Admin,
}

impl Role {
    /// The numeric code stored in the database and sent on the wire.
    #[must_use]
    pub const fn code(self) -> i16 {
        match self {
            Self::Buyer => 0,
            Self::Admin => 1,
        }
    }

    /// Look up a role by its numeric code.
    #[must_use]
    pub const fn from_code(code: i16) -> Option<Self> {
        match code {
            0 => Some(Self::Buyer),
            1 => Some(Self::Admin),
            _ => None,
        }
    }

    /// Whether this role may use back-office routes.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i16(self.code())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = i16::deserialize(deserializer)?;
        Self::from_code(code)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid role code: {code}")))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buyer => write!(f, "buyer"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

/// Fulfilment status of an order, as set by an admin.
///
/// The wire strings are kept exactly as existing clients send them,
/// including the `deliverd` spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    #[default]
    #[serde(rename = "Not Process")]
    NotProcessed,
    #[serde(rename = "Processing")]
    Processing,
    #[serde(rename = "Shipped")]
    Shipped,
    #[serde(rename = "deliverd")]
    Delivered,
    #[serde(rename = "cancel")]
    Cancelled,
}

impl OrderStatus {
    /// Every status, in workflow order.
    pub const ALL: [Self; 5] = [
        Self::NotProcessed,
        Self::Processing,
        Self::Shipped,
        Self::Delivered,
        Self::Cancelled,
    ];

    /// The wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotProcessed => "Not Process",
            Self::Processing => "Processing",
            Self::Shipped => "Shipped",
            Self::Delivered => "deliverd",
            Self::Cancelled => "cancel",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("invalid order status: {s}"))
    }
}
