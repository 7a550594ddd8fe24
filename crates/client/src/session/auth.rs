//! Signed-in identity.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use bazaar_core::UserSummary;

use super::persisted::Persisted;
use super::store::SessionStore;
use crate::error::SessionError;

const KEY: &str = "auth";

/// What a successful login leaves behind: `{ user, token }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub user: UserSummary,
    pub token: String,
}

/// The shopper's login, persisted under `auth`.
#[derive(Debug)]
pub struct AuthContext {
    state: Persisted<AuthSession>,
}

impl AuthContext {
    pub fn load(store: Arc<dyn SessionStore>) -> Self {
        Self {
            state: Persisted::load(store, KEY),
        }
    }

    pub const fn session(&self) -> Option<&AuthSession> {
        self.state.get()
    }

    /// Raw token for the `Authorization` header.
    pub fn token(&self) -> Option<&str> {
        self.session().map(|s| s.token.as_str())
    }

    pub fn user(&self) -> Option<&UserSummary> {
        self.session().map(|s| &s.user)
    }

    /// Whether the cached user has the admin role. The server still checks.
    pub fn is_admin(&self) -> bool {
        self.user().is_some_and(|u| u.role.is_admin())
    }

    /// Record a login.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be written.
    pub fn sign_in(&mut self, session: AuthSession) -> Result<(), SessionError> {
        self.state.set(session)
    }

    /// Keep the token but refresh the cached profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be written.
    pub fn refresh_user(&mut self, user: UserSummary) -> Result<(), SessionError> {
        match self.state.get() {
            Some(current) => {
                let token = current.token.clone();
                self.state.set(AuthSession { user, token })
            }
            None => Ok(()),
        }
    }

    /// Forget the login.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be written.
    pub fn sign_out(&mut self) -> Result<(), SessionError> {
        self.state.clear()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bazaar_core::{Email, Role, UserId};

    use super::*;
    use crate::session::MemorySessionStore;

    fn summary(role: Role) -> UserSummary {
        UserSummary {
            id: UserId::new(1),
            name: "abc".to_string(),
            email: Email::parse("abc@gmail.com").unwrap(),
            phone: "1234".to_string(),
            address: "1234".to_string(),
            role,
        }
    }

    #[test]
    fn test_sign_in_survives_reload() {
        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::default());
        let mut auth = AuthContext::load(store.clone());
        assert!(auth.token().is_none());

        auth.sign_in(AuthSession {
            user: summary(Role::Admin),
            token: "jwt".to_string(),
        })
        .unwrap();

        let reloaded = AuthContext::load(store.clone());
        assert_eq!(reloaded.token(), Some("jwt"));
        assert!(reloaded.is_admin());

        auth.sign_out().unwrap();
        assert!(AuthContext::load(store).session().is_none());
    }

    #[test]
    fn test_refresh_user_keeps_token() {
        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::default());
        let mut auth = AuthContext::load(store);
        auth.sign_in(AuthSession {
            user: summary(Role::Buyer),
            token: "jwt".to_string(),
        })
        .unwrap();

        let mut renamed = summary(Role::Buyer);
        renamed.name = "renamed".to_string();
        auth.refresh_user(renamed).unwrap();

        assert_eq!(auth.token(), Some("jwt"));
        assert_eq!(auth.user().unwrap().name, "renamed");
    }
}
