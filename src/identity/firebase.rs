//! Firebase Identity Toolkit REST provider.
//!
//! Covers the account flows that work outside a browser: email and password
//! accounts, verification emails, password reset links, reset-code checks,
//! and reset confirmation. Popup sign-in needs a browser window and is
//! reported as a disabled provider.
//!
//! A password sign-in (or sign-up) holds the returned ID token as the
//! provider session; verification calls act on that session.

#[cfg(test)]
#[path = "firebase_test.rs"]
mod firebase_test;

use serde::Deserialize;
use serde_json::json;
use tokio::sync::watch;

use super::{FederatedCredential, FederatedUser, IdentityProvider, OAuthProvider};
use crate::error::{FederatedError, FederatedErrorCode};

pub const DEFAULT_IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";

/// Provider id reported for email and password accounts.
const PASSWORD_PROVIDER_ID: &str = "password";

pub struct FirebaseRestIdentity {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    id_token: watch::Sender<Option<String>>,
    session: watch::Sender<Option<FederatedUser>>,
}

#[derive(Debug, Deserialize)]
struct ResetPasswordResponse {
    #[serde(default)]
    email: Option<String>,
}

/// `accounts:signUp` / `accounts:signInWithPassword` answer.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordAuthResponse {
    id_token: String,
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    email_verified: bool,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    photo_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FirebaseErrorBody {
    error: FirebaseErrorDetail,
}

#[derive(Debug, Deserialize)]
struct FirebaseErrorDetail {
    #[serde(default)]
    message: String,
}

fn no_current_user() -> FederatedError {
    FederatedError::new(FederatedErrorCode::Other("auth/no-current-user".into()), "no signed-in user")
}

fn internal(detail: impl Into<String>) -> FederatedError {
    FederatedError::new(FederatedErrorCode::Other("auth/internal-error".into()), detail)
}

impl FirebaseRestIdentity {
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_IDENTITY_TOOLKIT_URL)
    }

    /// Point the provider at a different Identity Toolkit endpoint
    /// (emulator or test server).
    #[must_use]
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            id_token: watch::Sender::new(None),
            session: watch::Sender::new(None),
        }
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        body: &serde_json::Value,
    ) -> Result<T, FederatedError> {
        let url = format!("{}/accounts:{method}", self.base_url);
        let resp = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(body)
            .send()
            .await
            .map_err(|e| FederatedError::new(FederatedErrorCode::NetworkRequestFailed, e.to_string()))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| FederatedError::new(FederatedErrorCode::NetworkRequestFailed, e.to_string()))?;

        if !status.is_success() {
            let reason = serde_json::from_str::<FirebaseErrorBody>(&text)
                .map(|b| b.error.message)
                .unwrap_or_else(|_| format!("status {status}"));
            return Err(FederatedError::new(code_for_reason(&reason), reason));
        }

        serde_json::from_str(&text).map_err(|e| internal(e.to_string()))
    }

    fn held_token(&self) -> Result<String, FederatedError> {
        self.id_token.borrow().clone().ok_or_else(no_current_user)
    }

    fn hold(&self, resp: PasswordAuthResponse) -> FederatedUser {
        let user = FederatedUser {
            uid: resp.local_id,
            email: resp.email,
            display_name: resp.display_name.filter(|n| !n.is_empty()),
            photo_url: None,
            email_verified: false,
            provider_id: PASSWORD_PROVIDER_ID.into(),
        };
        self.id_token.send_replace(Some(resp.id_token));
        self.session.send_replace(Some(user.clone()));
        user
    }

    async fn send_verification(&self, id_token: &str) -> Result<(), FederatedError> {
        let _: serde_json::Value =
            self.call("sendOobCode", &json!({ "requestType": "VERIFY_EMAIL", "idToken": id_token })).await?;
        Ok(())
    }
}

/// Map an Identity Toolkit reason string (`TOO_MANY_ATTEMPTS_TRY_LATER : ...`)
/// onto a provider error code.
pub(crate) fn code_for_reason(reason: &str) -> FederatedErrorCode {
    let head = reason.split_whitespace().next().unwrap_or_default();
    match head {
        "TOO_MANY_ATTEMPTS_TRY_LATER" => FederatedErrorCode::TooManyRequests,
        "OPERATION_NOT_ALLOWED" | "PASSWORD_LOGIN_DISABLED" => FederatedErrorCode::OperationNotAllowed,
        "" => FederatedErrorCode::Other("auth/internal-error".into()),
        other => FederatedErrorCode::Other(format!("auth/{}", other.to_ascii_lowercase().replace('_', "-"))),
    }
}

#[async_trait::async_trait]
impl IdentityProvider for FirebaseRestIdentity {
    async fn sign_in(&self, provider: OAuthProvider) -> Result<FederatedCredential, FederatedError> {
        Err(FederatedError::new(
            FederatedErrorCode::OperationNotAllowed,
            format!("{provider} popup sign-in requires a browser"),
        ))
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<FederatedUser, FederatedError> {
        let resp: PasswordAuthResponse = self
            .call("signInWithPassword", &json!({ "email": email, "password": password, "returnSecureToken": true }))
            .await?;
        let user = self.hold(resp);
        tracing::info!(uid = %user.uid, "provider password sign-in");
        Ok(user)
    }

    async fn sign_up_with_password(&self, email: &str, password: &str) -> Result<FederatedUser, FederatedError> {
        let resp: PasswordAuthResponse =
            self.call("signUp", &json!({ "email": email, "password": password, "returnSecureToken": true })).await?;
        let token = resp.id_token.clone();
        let user = self.hold(resp);
        tracing::info!(uid = %user.uid, "provider account created");
        self.send_verification(&token).await?;
        Ok(user)
    }

    async fn id_token(&self, _credential: &FederatedCredential) -> Result<String, FederatedError> {
        self.held_token()
    }

    fn current_session(&self) -> Option<FederatedUser> {
        self.session.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<FederatedUser>> {
        self.session.subscribe()
    }

    async fn terminate(&self) -> Result<(), FederatedError> {
        self.id_token.send_replace(None);
        self.session.send_replace(None);
        Ok(())
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), FederatedError> {
        let _: serde_json::Value =
            self.call("sendOobCode", &json!({ "requestType": "PASSWORD_RESET", "email": email })).await?;
        tracing::info!(%email, "password reset link requested");
        Ok(())
    }

    async fn verify_reset_code(&self, code: &str) -> Result<String, FederatedError> {
        let resp: ResetPasswordResponse = self.call("resetPassword", &json!({ "oobCode": code })).await?;
        resp.email.ok_or_else(|| {
            FederatedError::new(FederatedErrorCode::Other("auth/invalid-action-code".into()), "reset code carries no email")
        })
    }

    async fn confirm_password_reset(&self, code: &str, new_password: &str) -> Result<(), FederatedError> {
        let _: ResetPasswordResponse =
            self.call("resetPassword", &json!({ "oobCode": code, "newPassword": new_password })).await?;
        Ok(())
    }

    async fn resend_verification_email(&self) -> Result<(), FederatedError> {
        let token = self.held_token()?;
        self.send_verification(&token).await
    }

    async fn check_email_verified(&self) -> Result<bool, FederatedError> {
        let Some(token) = self.id_token.borrow().clone() else {
            return Ok(false);
        };
        let resp: LookupResponse = self.call("lookup", &json!({ "idToken": token })).await?;
        let fresh = resp.users.into_iter().next().ok_or_else(|| internal("lookup returned no user"))?;
        let verified = fresh.email_verified;

        self.session.send_modify(|held| {
            if let Some(user) = held.as_mut().filter(|u| u.uid == fresh.local_id) {
                user.email_verified = verified;
                user.email = fresh.email.or(user.email.take());
                user.display_name = fresh.display_name.or(user.display_name.take());
                user.photo_url = fresh.photo_url.or(user.photo_url.take());
            }
        });
        Ok(verified)
    }
}
