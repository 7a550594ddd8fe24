//! Shopper session state that outlives a single process.
//!
//! Three contexts share one [`SessionStore`]:
//!
//! | Context | Key | Holds |
//! |---------|-----|-------|
//! | [`AuthContext`] | `auth` | `{ user, token }` from login |
//! | [`CartContext`] | `cart` | product snapshots |
//! | [`SearchContext`] | `search` | `{ keyword, results }` |
//!
//! Each context rehydrates when loaded and writes through on every change,
//! so callers never sync state back by hand. There is no cross-process
//! coordination: two processes sharing a directory overwrite each other.

mod auth;
mod cart;
mod persisted;
mod search;
mod store;

pub use auth::{AuthContext, AuthSession};
pub use cart::CartContext;
pub use persisted::Persisted;
pub use search::{SearchContext, SearchState};
pub use store::{FileSessionStore, MemorySessionStore, SessionStore};

use std::path::PathBuf;
use std::sync::Arc;

/// All shopper contexts over one store.
#[derive(Debug)]
pub struct Session {
    pub auth: AuthContext,
    pub cart: CartContext,
    pub search: SearchContext,
}

impl Session {
    /// Load every context from `store`.
    pub fn open(store: Arc<dyn SessionStore>) -> Self {
        Self {
            auth: AuthContext::load(store.clone()),
            cart: CartContext::load(store.clone()),
            search: SearchContext::load(store),
        }
    }

    /// Load every context from files under `dir`.
    pub fn open_dir(dir: impl Into<PathBuf>) -> Self {
        Self::open(Arc::new(FileSessionStore::new(dir)))
    }
}
