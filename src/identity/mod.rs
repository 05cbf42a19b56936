//! Federated identity provider collaborator.
//!
//! SYSTEM CONTEXT
//! ==============
//! OAuth sign-in, password reset, and email verification are owned by an
//! external identity provider. The session store only sees the
//! `IdentityProvider` trait; the concrete provider is picked at startup
//! from configuration.

pub mod firebase;

#[cfg(test)]
#[path = "mod_test.rs"]
mod mod_test;

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::error::{FederatedError, FederatedErrorCode};

pub use firebase::FirebaseRestIdentity;

// =============================================================================
// PROVIDERS
// =============================================================================

/// OAuth providers offered on the login screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OAuthProvider {
    Google,
    Facebook,
    Microsoft,
    Apple,
}

impl OAuthProvider {
    /// Provider identifier reported in federated credentials.
    #[must_use]
    pub fn provider_id(self) -> &'static str {
        match self {
            Self::Google => "google.com",
            Self::Facebook => "facebook.com",
            Self::Microsoft => "microsoft.com",
            Self::Apple => "apple.com",
        }
    }

    /// OAuth scopes requested from the provider.
    #[must_use]
    pub fn scopes(self) -> &'static [&'static str] {
        match self {
            Self::Google | Self::Microsoft => &["email", "profile"],
            Self::Facebook => &["email", "public_profile"],
            Self::Apple => &["email", "name"],
        }
    }
}

impl FromStr for OAuthProvider {
    type Err = FederatedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "google" => Ok(Self::Google),
            "facebook" => Ok(Self::Facebook),
            "microsoft" => Ok(Self::Microsoft),
            "apple" => Ok(Self::Apple),
            other => Err(FederatedError::new(
                FederatedErrorCode::OperationNotAllowed,
                format!("unsupported OAuth provider: {other}"),
            )),
        }
    }
}

impl std::fmt::Display for OAuthProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Google => "google",
            Self::Facebook => "facebook",
            Self::Microsoft => "microsoft",
            Self::Apple => "apple",
        };
        f.write_str(name)
    }
}

// =============================================================================
// CREDENTIALS
// =============================================================================

/// User profile held by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FederatedUser {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub email_verified: bool,
    pub provider_id: String,
}

/// Result of a successful provider sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederatedCredential {
    pub provider: OAuthProvider,
    pub user: FederatedUser,
}

// =============================================================================
// TRAIT
// =============================================================================

/// Federated identity provider operations used by the session store.
#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Run the provider's sign-in interaction.
    async fn sign_in(&self, provider: OAuthProvider) -> Result<FederatedCredential, FederatedError>;

    /// Sign in to an existing email and password account held by the
    /// provider. The account becomes the current provider session.
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<FederatedUser, FederatedError>;

    /// Create an email and password account, make it the current provider
    /// session, and send it a verification email.
    async fn sign_up_with_password(&self, email: &str, password: &str) -> Result<FederatedUser, FederatedError>;

    /// ID token proving `credential` to the backend.
    async fn id_token(&self, credential: &FederatedCredential) -> Result<String, FederatedError>;

    /// The provider session currently active, if any.
    fn current_session(&self) -> Option<FederatedUser>;

    /// Observe provider session changes.
    fn subscribe(&self) -> watch::Receiver<Option<FederatedUser>>;

    /// End the provider session.
    async fn terminate(&self) -> Result<(), FederatedError>;

    async fn send_password_reset(&self, email: &str) -> Result<(), FederatedError>;

    /// Check a reset code, returning the email it was issued for.
    async fn verify_reset_code(&self, code: &str) -> Result<String, FederatedError>;

    async fn confirm_password_reset(&self, code: &str, new_password: &str) -> Result<(), FederatedError>;

    async fn resend_verification_email(&self) -> Result<(), FederatedError>;

    /// Refresh and report the active user's verification flag. `false`
    /// when nobody is signed in.
    async fn check_email_verified(&self) -> Result<bool, FederatedError>;
}

// =============================================================================
// DISABLED PROVIDER
// =============================================================================

/// Provider used when no identity backend is configured.
pub struct DisabledIdentity {
    session: watch::Sender<Option<FederatedUser>>,
}

impl DisabledIdentity {
    #[must_use]
    pub fn new() -> Self {
        Self { session: watch::Sender::new(None) }
    }

    fn not_enabled(operation: &str) -> FederatedError {
        FederatedError::new(
            FederatedErrorCode::OperationNotAllowed,
            format!("{operation}: no identity provider configured"),
        )
    }
}

impl Default for DisabledIdentity {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl IdentityProvider for DisabledIdentity {
    async fn sign_in(&self, provider: OAuthProvider) -> Result<FederatedCredential, FederatedError> {
        Err(Self::not_enabled(&format!("sign in with {provider}")))
    }

    async fn sign_in_with_password(&self, _email: &str, _password: &str) -> Result<FederatedUser, FederatedError> {
        Err(Self::not_enabled("password sign-in"))
    }

    async fn sign_up_with_password(&self, _email: &str, _password: &str) -> Result<FederatedUser, FederatedError> {
        Err(Self::not_enabled("password sign-up"))
    }

    async fn id_token(&self, _credential: &FederatedCredential) -> Result<String, FederatedError> {
        Err(Self::not_enabled("id token"))
    }

    fn current_session(&self) -> Option<FederatedUser> {
        None
    }

    fn subscribe(&self) -> watch::Receiver<Option<FederatedUser>> {
        self.session.subscribe()
    }

    async fn terminate(&self) -> Result<(), FederatedError> {
        Ok(())
    }

    async fn send_password_reset(&self, _email: &str) -> Result<(), FederatedError> {
        Err(Self::not_enabled("password reset"))
    }

    async fn verify_reset_code(&self, _code: &str) -> Result<String, FederatedError> {
        Err(Self::not_enabled("password reset"))
    }

    async fn confirm_password_reset(&self, _code: &str, _new_password: &str) -> Result<(), FederatedError> {
        Err(Self::not_enabled("password reset"))
    }

    async fn resend_verification_email(&self) -> Result<(), FederatedError> {
        Err(Self::not_enabled("email verification"))
    }

    async fn check_email_verified(&self) -> Result<bool, FederatedError> {
        Ok(false)
    }
}
