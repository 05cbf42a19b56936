//! Auth-session state for the current user.
//!
//! SYSTEM CONTEXT
//! ==============
//! Used by the navigation guard, the HTTP client, and the session store to
//! agree on who is signed in.
//!
//! INVARIANTS
//! ==========
//! - Identity and credential token are set together or not at all.
//! - Durable storage mirrors identity, token, and the verification flag.
//! - The federated session reference is never persisted.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::sync::Arc;

use tokio::sync::watch;

use crate::error::ApiError;
use crate::identity::FederatedUser;
use crate::net::types::{Role, User};
use crate::storage::{self, KeyValueStore, keys};

// =============================================================================
// SESSION
// =============================================================================

/// Snapshot of the current session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    identity: Option<User>,
    credential_token: Option<String>,
    email_verified: bool,
    federated: Option<FederatedUser>,
}

impl Session {
    /// A signed-in session for `user` holding `token`.
    #[must_use]
    pub fn authenticated(user: User, token: impl Into<String>) -> Self {
        Self { identity: Some(user), credential_token: usable_token(token.into()), email_verified: false, federated: None }
    }

    #[must_use]
    pub fn identity(&self) -> Option<&User> {
        self.identity.as_ref()
    }

    #[must_use]
    pub fn credential_token(&self) -> Option<&str> {
        self.credential_token.as_deref()
    }

    #[must_use]
    pub fn email_verified(&self) -> bool {
        self.email_verified
    }

    #[must_use]
    pub fn federated(&self) -> Option<&FederatedUser> {
        self.federated.as_ref()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some() && self.credential_token.as_deref().is_some_and(|t| !t.trim().is_empty())
    }

    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.identity.as_ref().and_then(|u| u.role)
    }

    /// Role of an authenticated session. `None` when signed out or when the
    /// role is missing, which navigation treats as unauthenticated.
    #[must_use]
    pub fn authenticated_role(&self) -> Option<Role> {
        if self.is_authenticated() { self.role() } else { None }
    }
}

/// A blank string is not a bearer token.
fn usable_token(token: String) -> Option<String> {
    if token.trim().is_empty() { None } else { Some(token) }
}

// =============================================================================
// HANDLE
// =============================================================================

/// Shared, observable owner of the process-wide session.
///
/// Every mutation goes through this handle, which keeps durable storage in
/// step and notifies subscribers.
#[derive(Clone)]
pub struct SessionHandle {
    state: Arc<watch::Sender<Session>>,
    storage: Arc<dyn KeyValueStore>,
}

impl SessionHandle {
    /// Create an empty session backed by `storage`. Call [`rehydrate`] once
    /// at startup to restore a persisted session.
    ///
    /// [`rehydrate`]: SessionHandle::rehydrate
    #[must_use]
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { state: Arc::new(watch::Sender::new(Session::default())), storage }
    }

    /// Restore the session from durable storage.
    ///
    /// Unreadable entries count as absent. An identity without a token (or
    /// the reverse) restores neither.
    pub fn rehydrate(&self) -> Session {
        let store = self.storage.as_ref();
        let mut identity = storage::load_json::<User>(store, keys::USER);
        let mut token = storage::load_json::<String>(store, keys::ACCESS_TOKEN).and_then(usable_token);
        let email_verified = storage::load_json::<bool>(store, keys::EMAIL_VERIFIED).unwrap_or(false);

        if identity.is_some() != token.is_some() {
            tracing::warn!(
                has_identity = identity.is_some(),
                has_token = token.is_some(),
                "discarding half-persisted session"
            );
            identity = None;
            token = None;
        }

        let session = Session { identity, credential_token: token, email_verified, federated: None };
        tracing::debug!(authenticated = session.is_authenticated(), role = ?session.role(), "session rehydrated");
        self.state.send_replace(session.clone());
        session
    }

    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    /// Current bearer token, if signed in.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.state.borrow().credential_token.clone()
    }

    #[must_use]
    pub fn storage(&self) -> &Arc<dyn KeyValueStore> {
        &self.storage
    }

    /// Install a freshly authenticated identity and token.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Decode`] and leaves the session untouched when
    /// `token` is blank.
    pub fn commit(&self, user: User, token: String) -> Result<(), ApiError> {
        let Some(token) = usable_token(token) else {
            tracing::warn!(email = %user.email, "auth response carried a blank access token");
            return Err(ApiError::Decode("auth response carries no access token".into()));
        };
        storage::save_json(self.storage.as_ref(), keys::USER, &user);
        storage::save_json(self.storage.as_ref(), keys::ACCESS_TOKEN, &token);
        tracing::info!(email = %user.email, role = ?user.role, "session committed");
        self.state.send_modify(|s| {
            s.identity = Some(user);
            s.credential_token = Some(token);
        });
        Ok(())
    }

    pub fn set_email_verified(&self, verified: bool) {
        storage::save_json(self.storage.as_ref(), keys::EMAIL_VERIFIED, &verified);
        self.state.send_modify(|s| s.email_verified = verified);
    }

    pub fn set_federated(&self, federated: Option<FederatedUser>) {
        self.state.send_modify(|s| s.federated = federated);
    }

    /// Clear the session and every storage entry tied to it, including the
    /// feature pointers other screens keep for the signed-in user.
    pub fn reset(&self) {
        for key in keys::SESSION.iter().chain(keys::FEATURE_POINTERS) {
            self.storage.remove(key);
        }
        let was_authenticated = self.state.borrow().is_authenticated();
        self.state.send_replace(Session::default());
        tracing::info!(was_authenticated, "session reset");
    }
}
