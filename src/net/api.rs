//! REST API client for the platform backend.
//!
//! ERROR HANDLING
//! ==============
//! Non-success responses become `ApiError` with the backend's `message`
//! attached when the body carries one. A 401 on any request is handled here,
//! once, for the whole application: the session is reset through the same
//! path logout uses and the router is sent to the login screen.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use std::sync::Arc;

use reqwest::header::ACCEPT;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

use super::types::{
    AuthResponse, Credentials, DataResponse, ErrorBody, FederatedLogin, MessageResponse, Registration, User, UserData,
};
use crate::error::ApiError;
use crate::nav::{Location, Navigator, RouteName};
use crate::state::session::SessionHandle;

// =============================================================================
// COLLABORATOR TRAITS
// =============================================================================

/// Authentication endpoints used by the session store.
#[async_trait::async_trait]
pub trait AuthApi: Send + Sync {
    async fn register(&self, data: &Registration) -> Result<AuthResponse, ApiError>;
    async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, ApiError>;
    async fn logout(&self) -> Result<MessageResponse, ApiError>;
    /// Exchange a federated ID token for a local session.
    async fn federated_login(&self, data: &FederatedLogin) -> Result<AuthResponse, ApiError>;
}

/// User-management endpoints.
#[async_trait::async_trait]
pub trait UsersApi: Send + Sync {
    async fn list_users(&self) -> Result<DataResponse<Vec<User>>, ApiError>;
    async fn list_applicants(&self) -> Result<DataResponse<Vec<User>>, ApiError>;
    async fn show_user(&self, id: &str) -> Result<DataResponse<User>, ApiError>;
    async fn show_user_by_agent(&self, id: &str) -> Result<DataResponse<UserData>, ApiError>;
    async fn create_user(&self, data: &Registration) -> Result<DataResponse<User>, ApiError>;
    async fn edit_user(&self, id: &str, data: &Registration) -> Result<MessageResponse, ApiError>;
    async fn delete_user(&self, id: &str) -> Result<MessageResponse, ApiError>;
}

// =============================================================================
// HTTP CLIENT
// =============================================================================

pub struct HttpApi {
    client: reqwest::Client,
    base_url: String,
    session: SessionHandle,
    navigator: Option<Arc<dyn Navigator>>,
}

impl HttpApi {
    /// Build a client for `base_url` (e.g. `http://127.0.0.1:8001/api`).
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidBaseUrl`] unless the URL is http(s).
    pub fn new(base_url: &str, session: SessionHandle) -> Result<Self, ApiError> {
        let base_url = base_url.trim_end_matches('/');
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ApiError::InvalidBaseUrl(base_url.to_owned()));
        }
        Ok(Self { client: reqwest::Client::new(), base_url: base_url.to_owned(), session, navigator: None })
    }

    /// Send the application to the login screen on 401.
    #[must_use]
    pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{path}", self.base_url);
        let mut req = self.client.request(method, url).header(ACCEPT, "application/json");
        if let Some(token) = self.session.token() {
            req = req.bearer_auth(token);
        }
        req
    }

    async fn execute<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, ApiError> {
        let resp = req.send().await.map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = resp.status();

        if status.is_success() {
            return resp.json::<T>().await.map_err(|e| ApiError::Decode(e.to_string()));
        }

        let body = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body).ok().and_then(|b| b.message);

        if status == StatusCode::UNAUTHORIZED {
            self.handle_unauthorized();
            return Err(ApiError::Unauthorized { message });
        }

        Err(ApiError::Rejected { status: status.as_u16(), message })
    }

    fn handle_unauthorized(&self) {
        tracing::warn!("backend rejected credentials; clearing session");
        self.session.reset();
        if let Some(navigator) = &self.navigator {
            if let Err(e) = navigator.push(Location::named(RouteName::LOGIN)) {
                tracing::warn!(error = %e, "redirect to login after 401 failed");
            }
        }
    }
}

#[async_trait::async_trait]
impl AuthApi for HttpApi {
    async fn register(&self, data: &Registration) -> Result<AuthResponse, ApiError> {
        self.execute(self.request(Method::POST, "/auth/register").json(data)).await
    }

    async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, ApiError> {
        self.execute(self.request(Method::POST, "/auth/login").json(credentials)).await
    }

    async fn logout(&self) -> Result<MessageResponse, ApiError> {
        self.execute(self.request(Method::POST, "/auth/logout")).await
    }

    async fn federated_login(&self, data: &FederatedLogin) -> Result<AuthResponse, ApiError> {
        self.execute(self.request(Method::POST, "/auth/firebase").json(data)).await
    }
}

#[async_trait::async_trait]
impl UsersApi for HttpApi {
    async fn list_users(&self) -> Result<DataResponse<Vec<User>>, ApiError> {
        self.execute(self.request(Method::GET, "/user")).await
    }

    async fn list_applicants(&self) -> Result<DataResponse<Vec<User>>, ApiError> {
        self.execute(self.request(Method::GET, "/usercustom")).await
    }

    async fn show_user(&self, id: &str) -> Result<DataResponse<User>, ApiError> {
        self.execute(self.request(Method::GET, &format!("/user/show/{id}"))).await
    }

    async fn show_user_by_agent(&self, id: &str) -> Result<DataResponse<UserData>, ApiError> {
        self.execute(self.request(Method::GET, &format!("/user/showbyagent/{id}"))).await
    }

    async fn create_user(&self, data: &Registration) -> Result<DataResponse<User>, ApiError> {
        self.execute(self.request(Method::POST, "/user/store").json(data)).await
    }

    async fn edit_user(&self, id: &str, data: &Registration) -> Result<MessageResponse, ApiError> {
        self.execute(self.request(Method::PUT, &format!("/user/update/{id}")).json(data)).await
    }

    async fn delete_user(&self, id: &str) -> Result<MessageResponse, ApiError> {
        self.execute(self.request(Method::DELETE, &format!("/user/delete/{id}"))).await
    }
}
