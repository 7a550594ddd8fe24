//! Bazaar Core - Shared types library.
//!
//! This crate provides the types shared by every Bazaar component:
//! - `server` - REST API for the catalog, checkout and back-office
//! - `client` - Typed API client and persisted shopper session state
//! - `cli` - Operator and shopper command-line tools
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. The server and the client both speak the wire format
//! defined here, so a field renamed in [`models`] changes both sides at once.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, emails, slugs, roles and order statuses
//! - [`models`] - Catalog, user and order documents as they appear on the wire

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod models;
pub mod types;

pub use models::*;
pub use types::*;
