//! Session store: the actions that change who is signed in.
//!
//! ARCHITECTURE
//! ============
//! Each action runs to completion under a loading guard. Successful
//! sign-ins commit the session, redirect to the role's dashboard, and notify
//! success. Failures notify with the backend or provider message and are
//! returned to the caller so forms can stay open.
//!
//! Logout is the exception: every remote step is best effort and the local
//! session is always cleared.

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;

use std::sync::Arc;

use tokio::sync::watch;

use super::loading::LoadingState;
use super::session::{Session, SessionHandle};
use crate::error::{ApiError, AuthError};
use crate::identity::{FederatedCredential, FederatedUser, IdentityProvider, OAuthProvider};
use crate::nav::{Location, Navigator, RouteName, dashboard_for};
use crate::net::api::AuthApi;
use crate::net::types::{AuthResponse, Credentials, FederatedLogin, Registration, Role, User};
use crate::notify::Notifier;

pub(crate) const MSG_REGISTERED: &str = "Registration successful.";
pub(crate) const MSG_LOGGED_IN: &str = "Signed in successfully.";
pub(crate) const MSG_LOGGED_OUT: &str = "Signed out successfully.";
pub(crate) const MSG_RESET_SENT: &str = "A password reset link has been sent to your email.";
pub(crate) const MSG_PASSWORD_CHANGED: &str = "Your password has been changed. You can now sign in.";
pub(crate) const MSG_VERIFICATION_SENT: &str = "A verification email has been sent.";

const FALLBACK_REGISTER: &str = "Registration failed.";
const FALLBACK_LOGIN: &str = "Sign-in failed. Check your credentials.";
const FALLBACK_OAUTH: &str = "Sign-in with this provider failed.";
const FALLBACK_RESET: &str = "Password reset failed.";
const FALLBACK_VERIFICATION: &str = "Email verification failed.";

pub struct SessionStore {
    session: SessionHandle,
    api: Arc<dyn AuthApi>,
    identity: Arc<dyn IdentityProvider>,
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn Notifier>,
    loading: LoadingState,
}

impl SessionStore {
    #[must_use]
    pub fn new(
        session: SessionHandle,
        api: Arc<dyn AuthApi>,
        identity: Arc<dyn IdentityProvider>,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let loading = LoadingState::new(Arc::clone(&notifier));
        Self { session, api, identity, navigator, notifier, loading }
    }

    // =========================================================================
    // READS
    // =========================================================================

    #[must_use]
    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.session.snapshot()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.session.subscribe()
    }

    #[must_use]
    pub fn loading(&self) -> &LoadingState {
        &self.loading
    }

    #[must_use]
    pub fn identity(&self) -> Option<User> {
        self.session.snapshot().identity().cloned()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.session.snapshot().is_authenticated()
    }

    #[must_use]
    pub fn email_verified(&self) -> bool {
        self.session.snapshot().email_verified()
    }

    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.session.snapshot().role()
    }

    #[must_use]
    pub fn credential_token(&self) -> Option<String> {
        self.session.token()
    }

    // =========================================================================
    // SIGN-IN
    // =========================================================================

    /// Create an account and sign in as it.
    ///
    /// # Errors
    ///
    /// Returns the backend failure after notifying the user.
    pub async fn register(&self, data: &Registration) -> Result<User, AuthError> {
        let _loading = self.loading.start("Registering");
        self.api
            .register(data)
            .await
            .map_err(AuthError::from)
            .and_then(|response| self.establish(response, MSG_REGISTERED))
            .map_err(|err| self.report(err, FALLBACK_REGISTER))
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns the backend failure after notifying the user.
    pub async fn login(&self, credentials: &Credentials) -> Result<User, AuthError> {
        let _loading = self.loading.start("Signing in");
        self.api
            .login(credentials)
            .await
            .map_err(AuthError::from)
            .and_then(|response| self.establish(response, MSG_LOGGED_IN))
            .map_err(|err| self.report(err, FALLBACK_LOGIN))
    }

    /// Sign in through a federated provider (`google`, `facebook`,
    /// `microsoft`, `apple`) and exchange its ID token for a local session.
    ///
    /// # Errors
    ///
    /// Returns the provider or backend failure after notifying the user.
    pub async fn login_with_oauth(&self, provider_name: &str) -> Result<User, AuthError> {
        let _loading = self.loading.start("Signing in");
        match self.federated_exchange(provider_name).await {
            Ok((credential, response)) => match self.establish(response, MSG_LOGGED_IN) {
                Ok(user) => {
                    self.session.set_federated(Some(credential.user));
                    Ok(user)
                }
                Err(err) => {
                    self.terminate_provider("unusable exchange response").await;
                    Err(self.report(err, FALLBACK_OAUTH))
                }
            },
            Err(err) => Err(self.report(err, FALLBACK_OAUTH)),
        }
    }

    async fn federated_exchange(&self, provider_name: &str) -> Result<(FederatedCredential, AuthResponse), AuthError> {
        let provider: OAuthProvider = provider_name.parse()?;
        let credential = self.identity.sign_in(provider).await?;
        let token = self.identity.id_token(&credential).await?;
        let payload = FederatedLogin {
            firebase_token: token,
            firebase_uid: credential.user.uid.clone(),
            email: credential.user.email.clone(),
            name: credential.user.display_name.clone(),
            photo_url: credential.user.photo_url.clone(),
            provider: credential.provider.to_string(),
        };

        match self.api.federated_login(&payload).await {
            Ok(response) => Ok((credential, response)),
            Err(err) => {
                self.terminate_provider("failed exchange").await;
                Err(err.into())
            }
        }
    }

    /// Do not leave a provider session behind a sign-in that did not land.
    async fn terminate_provider(&self, after: &str) {
        if let Err(e) = self.identity.terminate().await {
            tracing::debug!(error = %e, %after, "provider sign-out failed");
        }
    }

    /// Commit a backend auth response, redirect, and notify.
    ///
    /// Every sign-in path is treated as verified by the backend.
    fn establish(&self, response: AuthResponse, success: &str) -> Result<User, AuthError> {
        let user = response.user;
        self.session.commit(user.clone(), response.access_token)?;
        self.session.set_email_verified(true);
        self.redirect_dashboard();
        self.notifier.success(success);
        Ok(user)
    }

    fn report(&self, err: AuthError, fallback: &str) -> AuthError {
        self.loading.fail(&err, fallback);
        err
    }

    /// Navigate to the dashboard of the signed-in role, or to login.
    pub fn redirect_dashboard(&self) {
        let target = dashboard_for(self.session.snapshot().authenticated_role());
        if let Err(e) = self.navigator.push(Location::named(target)) {
            tracing::warn!(error = %e, "dashboard redirect failed");
        }
    }

    // =========================================================================
    // SIGN-OUT
    // =========================================================================

    /// Sign out. Always ends with a cleared local session on the login
    /// screen, whatever the provider or backend answer.
    pub async fn logout(&self) {
        let _loading = self.loading.start("Signing out");

        if self.session.snapshot().federated().is_some() || self.identity.current_session().is_some() {
            if let Err(e) = self.identity.terminate().await {
                tracing::warn!(error = %e, "provider sign-out failed; continuing");
            }
        }

        match self.api.logout().await {
            Ok(_) => {}
            Err(ApiError::Unauthorized { .. }) => tracing::debug!("backend logout rejected stale token"),
            Err(e) => tracing::warn!(error = %e, "backend logout failed; clearing local session anyway"),
        }

        self.reset_auth();
        if let Err(e) = self.navigator.push(Location::named(RouteName::LOGIN)) {
            tracing::warn!(error = %e, "redirect to login after logout failed");
        }
        self.notifier.success(MSG_LOGGED_OUT);
    }

    /// Clear the local session and its storage without contacting anyone.
    pub fn reset_auth(&self) {
        self.session.reset();
    }

    // =========================================================================
    // PASSWORD RESET / VERIFICATION
    // =========================================================================

    /// Ask the identity provider to email a password reset link.
    ///
    /// # Errors
    ///
    /// Returns the provider failure after notifying the user.
    pub async fn send_password_reset(&self, email: &str) -> Result<(), AuthError> {
        let _loading = self.loading.start("Sending reset link");
        match self.identity.send_password_reset(email).await {
            Ok(()) => {
                self.notifier.success(MSG_RESET_SENT);
                Ok(())
            }
            Err(err) => Err(self.report(err.into(), FALLBACK_RESET)),
        }
    }

    /// Check a reset code and return the email it belongs to.
    ///
    /// # Errors
    ///
    /// Returns the provider failure after notifying the user.
    pub async fn verify_reset_code(&self, code: &str) -> Result<String, AuthError> {
        let _loading = self.loading.start("Checking reset code");
        self.identity.verify_reset_code(code).await.map_err(|err| self.report(err.into(), FALLBACK_RESET))
    }

    /// Set a new password and send the user to the login screen.
    ///
    /// # Errors
    ///
    /// Returns the provider failure after notifying the user.
    pub async fn confirm_password_reset(&self, code: &str, new_password: &str) -> Result<(), AuthError> {
        let _loading = self.loading.start("Resetting password");
        match self.identity.confirm_password_reset(code, new_password).await {
            Ok(()) => {
                self.notifier.success(MSG_PASSWORD_CHANGED);
                if let Err(e) = self.navigator.push(Location::named(RouteName::LOGIN)) {
                    tracing::warn!(error = %e, "redirect to login after password reset failed");
                }
                Ok(())
            }
            Err(err) => Err(self.report(err.into(), FALLBACK_RESET)),
        }
    }

    /// Sign in to the identity provider's own email and password account so
    /// the verification actions have a provider session to act on. The
    /// backend session is left as it is.
    ///
    /// # Errors
    ///
    /// Returns the provider failure after notifying the user.
    pub async fn provider_sign_in(&self, credentials: &Credentials) -> Result<FederatedUser, AuthError> {
        let _loading = self.loading.start("Signing in to identity provider");
        match self.identity.sign_in_with_password(&credentials.email, &credentials.password).await {
            Ok(user) => {
                self.session.set_federated(Some(user.clone()));
                Ok(user)
            }
            Err(err) => Err(self.report(err.into(), FALLBACK_VERIFICATION)),
        }
    }

    /// Create an identity provider account; the provider emails a
    /// verification link to it.
    ///
    /// # Errors
    ///
    /// Returns the provider failure after notifying the user.
    pub async fn provider_register(&self, credentials: &Credentials) -> Result<FederatedUser, AuthError> {
        let _loading = self.loading.start("Creating identity provider account");
        match self.identity.sign_up_with_password(&credentials.email, &credentials.password).await {
            Ok(user) => {
                self.session.set_federated(Some(user.clone()));
                self.notifier.success(MSG_VERIFICATION_SENT);
                Ok(user)
            }
            Err(err) => Err(self.report(err.into(), FALLBACK_REGISTER)),
        }
    }

    /// Ask the identity provider to resend the verification email.
    ///
    /// # Errors
    ///
    /// Returns the provider failure after notifying the user.
    pub async fn resend_verification_email(&self) -> Result<(), AuthError> {
        let _loading = self.loading.start("Sending verification email");
        match self.identity.resend_verification_email().await {
            Ok(()) => {
                self.notifier.success(MSG_VERIFICATION_SENT);
                Ok(())
            }
            Err(err) => Err(self.report(err.into(), FALLBACK_VERIFICATION)),
        }
    }

    /// Refresh the verification flag from the identity provider.
    ///
    /// A failed check is reported and read as "not verified".
    pub async fn check_email_verified(&self) -> bool {
        let _loading = self.loading.start("Checking email verification");
        match self.identity.check_email_verified().await {
            Ok(true) => {
                self.session.set_email_verified(true);
                true
            }
            Ok(false) => false,
            Err(err) => {
                self.loading.fail(&err.into(), FALLBACK_VERIFICATION);
                false
            }
        }
    }
}
