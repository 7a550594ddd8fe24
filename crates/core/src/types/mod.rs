//! Core types for Bazaar.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod slug;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use slug::{Slug, SlugError};
pub use status::*;
