//! User-management actions for admin and agent screens.
//!
//! Thin passthrough over [`UsersApi`]. Failures are shown to the user and
//! come back as `None`; nothing here is rethrown.

#[cfg(test)]
#[path = "users_test.rs"]
mod users_test;

use std::sync::Arc;

use super::loading::LoadingState;
use crate::error::{ApiError, AuthError};
use crate::net::api::UsersApi;
use crate::net::types::{Registration, User, UserData};
use crate::notify::Notifier;

const FALLBACK_LOAD: &str = "Could not load users.";
const FALLBACK_SAVE: &str = "Could not save the user.";
const FALLBACK_DELETE: &str = "Could not delete the user.";

pub(crate) const MSG_CREATED: &str = "User created.";
pub(crate) const MSG_UPDATED: &str = "User updated.";
pub(crate) const MSG_DELETED: &str = "User deleted.";

pub struct UserDirectory {
    api: Arc<dyn UsersApi>,
    loading: LoadingState,
    notifier: Arc<dyn Notifier>,
}

impl UserDirectory {
    #[must_use]
    pub fn new(api: Arc<dyn UsersApi>, loading: LoadingState, notifier: Arc<dyn Notifier>) -> Self {
        Self { api, loading, notifier }
    }

    fn passive<T>(&self, result: Result<T, ApiError>, fallback: &str) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.loading.fail(&AuthError::Api(err), fallback);
                None
            }
        }
    }

    pub async fn list_users(&self) -> Option<Vec<User>> {
        let _loading = self.loading.start("Loading users");
        self.passive(self.api.list_users().await, FALLBACK_LOAD).map(|r| r.data)
    }

    /// Applicant accounts only.
    pub async fn list_applicants(&self) -> Option<Vec<User>> {
        let _loading = self.loading.start("Loading applicants");
        self.passive(self.api.list_applicants().await, FALLBACK_LOAD).map(|r| r.data)
    }

    pub async fn show_user(&self, id: &str) -> Option<User> {
        let _loading = self.loading.start("Loading user");
        self.passive(self.api.show_user(id).await, FALLBACK_LOAD).map(|r| r.data)
    }

    /// Applicant record with the counters agents see on their workspace.
    pub async fn show_user_by_agent(&self, id: &str) -> Option<UserData> {
        let _loading = self.loading.start("Loading user");
        self.passive(self.api.show_user_by_agent(id).await, FALLBACK_LOAD).map(|r| r.data)
    }

    pub async fn create_user(&self, data: &Registration) -> Option<User> {
        let _loading = self.loading.start("Creating user");
        let response = self.passive(self.api.create_user(data).await, FALLBACK_SAVE)?;
        self.notifier.success(response.message.as_deref().unwrap_or(MSG_CREATED));
        Some(response.data)
    }

    /// Returns the backend's confirmation message.
    pub async fn edit_user(&self, id: &str, data: &Registration) -> Option<String> {
        let _loading = self.loading.start("Updating user");
        let response = self.passive(self.api.edit_user(id, data).await, FALLBACK_SAVE)?;
        let message = response.message.unwrap_or_else(|| MSG_UPDATED.to_owned());
        self.notifier.success(&message);
        Some(message)
    }

    /// Returns the backend's confirmation message.
    pub async fn delete_user(&self, id: &str) -> Option<String> {
        let _loading = self.loading.start("Deleting user");
        let response = self.passive(self.api.delete_user(id).await, FALLBACK_DELETE)?;
        let message = response.message.unwrap_or_else(|| MSG_DELETED.to_owned());
        self.notifier.success(&message);
        Some(message)
    }
}
