//! Bazaar Client - typed REST client and persisted shopper session.
//!
//! # Modules
//!
//! - [`api`] - [`ApiClient`] for every `/api/v1` route
//! - [`session`] - auth, cart and search state that survives restarts
//!
//! The two are independent: the session holds the token, the client is
//! handed it with [`ApiClient::with_token`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod error;
pub mod session;

pub use api::ApiClient;
pub use error::{ClientError, SessionError};
pub use session::Session;
