//! A value mirrored into a [`SessionStore`].

use std::sync::Arc;

use serde::{Serialize, de::DeserializeOwned};

use super::store::SessionStore;
use crate::error::SessionError;

/// A value that is read from its store once and written back on every change.
///
/// Construction rehydrates from the store. A stored document that cannot be
/// read or does not decode as `T` is logged and treated as absent, so a bad
/// session file never locks a shopper out. Every mutation writes through
/// first and only then changes the in-memory value, so a failed write leaves
/// both where they were.
pub struct Persisted<T> {
    key: &'static str,
    store: Arc<dyn SessionStore>,
    value: Option<T>,
}

impl<T> std::fmt::Debug for Persisted<T>
where
    T: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Persisted")
            .field("key", &self.key)
            .field("value", &self.value)
            .finish_non_exhaustive()
    }
}

impl<T> Persisted<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Load the value stored under `key`.
    pub fn load(store: Arc<dyn SessionStore>, key: &'static str) -> Self {
        let value = match store.load(key) {
            Ok(Some(doc)) => match serde_json::from_value(doc) {
                Ok(value) => Some(value),
                Err(err) => {
                    tracing::warn!(key, error = %err, "Discarding unreadable session value");
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                tracing::warn!(key, error = %err, "Session store unreadable");
                None
            }
        };
        Self { key, store, value }
    }

    /// The current value.
    pub const fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// Replace the value and write it through.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written, in which case the
    /// current value is kept.
    pub fn set(&mut self, value: T) -> Result<(), SessionError> {
        let doc = serde_json::to_value(&value)?;
        self.store.save(self.key, &doc)?;
        self.value = Some(value);
        Ok(())
    }

    /// Drop the value and remove it from the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written, in which case the
    /// current value is kept.
    pub fn clear(&mut self) -> Result<(), SessionError> {
        self.store.remove(self.key)?;
        self.value = None;
        Ok(())
    }
}

impl<T> Persisted<T>
where
    T: Serialize + DeserializeOwned + Default + Clone,
{
    /// The current value, or `T::default()` when absent.
    pub fn get_or_default(&self) -> T {
        self.value.clone().unwrap_or_default()
    }

    /// Mutate a copy of the value (starting from `T::default()` when absent),
    /// write it through and then keep it.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written, in which case the
    /// current value is kept.
    pub fn update<R>(&mut self, f: impl FnOnce(&mut T) -> R) -> Result<R, SessionError> {
        let mut value = self.get_or_default();
        let out = f(&mut value);
        let doc = serde_json::to_value(&value)?;
        self.store.save(self.key, &doc)?;
        self.value = Some(value);
        Ok(out)
    }
}
