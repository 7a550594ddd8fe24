//! Last keyword search and its results.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use bazaar_core::Product;

use super::persisted::Persisted;
use super::store::SessionStore;
use crate::error::SessionError;

const KEY: &str = "search";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchState {
    pub keyword: String,
    pub results: Vec<Product>,
}

/// The last search, persisted under `search`.
#[derive(Debug)]
pub struct SearchContext {
    state: Persisted<SearchState>,
}

impl SearchContext {
    pub fn load(store: Arc<dyn SessionStore>) -> Self {
        Self {
            state: Persisted::load(store, KEY),
        }
    }

    pub fn keyword(&self) -> &str {
        self.state.get().map_or("", |s| s.keyword.as_str())
    }

    pub fn results(&self) -> &[Product] {
        self.state.get().map_or(&[], |s| s.results.as_slice())
    }

    /// Store a finished search.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be written.
    pub fn set(&mut self, keyword: String, results: Vec<Product>) -> Result<(), SessionError> {
        self.state.set(SearchState { keyword, results })
    }

    /// Forget the last search.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be written.
    pub fn clear(&mut self) -> Result<(), SessionError> {
        self.state.clear()
    }
}
