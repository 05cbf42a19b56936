//! Application wiring.
//!
//! Builds the single session, router, HTTP client, identity provider, and
//! the action objects on top of them from a [`PortalConfig`].

#[cfg(test)]
#[path = "app_test.rs"]
mod app_test;

use std::sync::Arc;

use crate::config::PortalConfig;
use crate::error::ApiError;
use crate::identity::{DisabledIdentity, FirebaseRestIdentity, IdentityProvider};
use crate::nav::{RouteTable, Router};
use crate::net::api::HttpApi;
use crate::notify::{Notifier, TracingNotifier};
use crate::state::{SessionHandle, SessionStore, UserDirectory};
use crate::storage::{FileStore, KeyValueStore};

pub struct Portal {
    config: PortalConfig,
    session: SessionHandle,
    router: Arc<Router>,
    store: SessionStore,
    users: UserDirectory,
}

impl Portal {
    /// Wire the portal against the configured session file, logging toasts
    /// through tracing.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidBaseUrl`] if the base URL is unusable.
    pub fn from_config(config: PortalConfig) -> Result<Self, ApiError> {
        let storage = Arc::new(FileStore::open(&config.session_file));
        Self::with_parts(config, storage, Arc::new(TracingNotifier))
    }

    /// Wire the portal over explicit storage and notifier.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidBaseUrl`] if the base URL is unusable.
    pub fn with_parts(
        config: PortalConfig,
        storage: Arc<dyn KeyValueStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, ApiError> {
        let session = SessionHandle::new(storage);
        session.rehydrate();

        let router = Arc::new(Router::new(RouteTable::platform(), session.clone()));
        let api = Arc::new(HttpApi::new(&config.api_base_url, session.clone())?.with_navigator(router.clone()));

        let identity: Arc<dyn IdentityProvider> = match &config.firebase_api_key {
            Some(key) => Arc::new(FirebaseRestIdentity::new(key.clone())),
            None => {
                tracing::debug!("no identity provider key configured; federated features disabled");
                Arc::new(DisabledIdentity::new())
            }
        };

        let store = SessionStore::new(session.clone(), api.clone(), identity, router.clone(), Arc::clone(&notifier));
        let users = UserDirectory::new(api, store.loading().clone(), notifier);

        tracing::info!(
            api = %config.api_base_url,
            authenticated = session.snapshot().is_authenticated(),
            "portal ready"
        );
        Ok(Self { config, session, router, store, users })
    }

    #[must_use]
    pub fn config(&self) -> &PortalConfig {
        &self.config
    }

    #[must_use]
    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    #[must_use]
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    #[must_use]
    pub fn users(&self) -> &UserDirectory {
        &self.users
    }
}
