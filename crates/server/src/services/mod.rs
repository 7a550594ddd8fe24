//! Business logic services.
//!
//! - `auth` - Password hashing and session tokens
//! - `payment` - Payment gateway trait and the Braintree client

pub mod auth;
pub mod payment;
