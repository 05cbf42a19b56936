//! Shared fixtures for unit tests: sample users, scripted collaborators, and
//! an in-process HTTP server.

use std::sync::{Arc, Mutex};

use tokio::sync::watch;

use crate::error::{ApiError, FederatedError, FederatedErrorCode};
use crate::identity::{FederatedCredential, FederatedUser, IdentityProvider, OAuthProvider};
use crate::nav::{RouteTable, Router};
use crate::net::api::{AuthApi, UsersApi};
use crate::net::types::{
    AuthResponse, Credentials, DataResponse, FederatedLogin, MessageResponse, Registration, Role, User, UserData,
};
use crate::notify::{Notifier, ToastKind};
use crate::state::{Session, SessionHandle, SessionStore};
use crate::storage::MemoryStore;

// =============================================================================
// Sample data
// =============================================================================

pub fn sample_user(role: Role) -> User {
    User {
        id: Some("7".into()),
        name: "Sample User".into(),
        email: format!("{role}@example.com"),
        role: Some(role),
        image: None,
        firebase_uid: None,
    }
}

pub fn session_for(role: Role) -> Session {
    Session::authenticated(sample_user(role), "tok")
}

pub fn auth_response(role: Role, token: &str) -> AuthResponse {
    AuthResponse { message: None, user: sample_user(role), access_token: token.into() }
}

pub fn federated_user() -> FederatedUser {
    FederatedUser {
        uid: "fb-uid-1".into(),
        email: Some("ada@example.com".into()),
        display_name: Some("Ada".into()),
        photo_url: None,
        email_verified: true,
        provider_id: "google.com".into(),
    }
}

pub fn federated(code: FederatedErrorCode) -> FederatedError {
    FederatedError::new(code, "scripted")
}

// =============================================================================
// HTTP
// =============================================================================

/// Serve `app` on an ephemeral local port. Returns `http://127.0.0.1:<port>`.
pub async fn spawn_server(app: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

// =============================================================================
// Notifier
// =============================================================================

#[derive(Default)]
pub struct RecordingNotifier {
    pub toasts: Mutex<Vec<(ToastKind, String)>>,
}

impl RecordingNotifier {
    pub fn of_kind(&self, kind: ToastKind) -> Vec<String> {
        self.toasts.lock().unwrap().iter().filter(|(k, _)| *k == kind).map(|(_, m)| m.clone()).collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.of_kind(ToastKind::Error)
    }

    pub fn successes(&self) -> Vec<String> {
        self.of_kind(ToastKind::Success)
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, kind: ToastKind, message: &str) {
        self.toasts.lock().unwrap().push((kind, message.to_owned()));
    }
}

// =============================================================================
// Auth API
// =============================================================================

/// Scripted backend. Sign-in calls share `response`; `logout_result` answers
/// logout. Every call is recorded by name.
pub struct MockAuthApi {
    pub response: Mutex<Result<AuthResponse, ApiError>>,
    pub logout_result: Mutex<Result<MessageResponse, ApiError>>,
    pub calls: Mutex<Vec<&'static str>>,
    pub federated_payloads: Mutex<Vec<FederatedLogin>>,
}

impl MockAuthApi {
    pub fn new(response: Result<AuthResponse, ApiError>) -> Self {
        Self {
            response: Mutex::new(response),
            logout_result: Mutex::new(Ok(MessageResponse::default())),
            calls: Mutex::new(Vec::new()),
            federated_payloads: Mutex::new(Vec::new()),
        }
    }

    pub fn signing_in_as(role: Role) -> Self {
        Self::new(Ok(auth_response(role, "tok")))
    }

    pub fn failing(err: ApiError) -> Self {
        Self::new(Err(err))
    }

    pub fn with_logout(self, result: Result<MessageResponse, ApiError>) -> Self {
        *self.logout_result.lock().unwrap() = result;
        self
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn answer(&self, call: &'static str) -> Result<AuthResponse, ApiError> {
        self.calls.lock().unwrap().push(call);
        self.response.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl AuthApi for MockAuthApi {
    async fn register(&self, _data: &Registration) -> Result<AuthResponse, ApiError> {
        self.answer("register")
    }

    async fn login(&self, _credentials: &Credentials) -> Result<AuthResponse, ApiError> {
        self.answer("login")
    }

    async fn logout(&self) -> Result<MessageResponse, ApiError> {
        self.calls.lock().unwrap().push("logout");
        self.logout_result.lock().unwrap().clone()
    }

    async fn federated_login(&self, data: &FederatedLogin) -> Result<AuthResponse, ApiError> {
        self.federated_payloads.lock().unwrap().push(data.clone());
        self.answer("federated_login")
    }
}

// =============================================================================
// Users API
// =============================================================================

/// Users backend that either fails every call with `failure` or answers with
/// `sample_user`-based rows.
#[derive(Default)]
pub struct MockUsersApi {
    pub failure: Option<ApiError>,
    pub calls: Mutex<Vec<String>>,
}

impl MockUsersApi {
    pub fn failing(err: ApiError) -> Self {
        Self { failure: Some(err), calls: Mutex::new(Vec::new()) }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record<T>(&self, call: String, ok: impl FnOnce() -> T) -> Result<T, ApiError> {
        self.calls.lock().unwrap().push(call);
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(ok()),
        }
    }
}

#[async_trait::async_trait]
impl UsersApi for MockUsersApi {
    async fn list_users(&self) -> Result<DataResponse<Vec<User>>, ApiError> {
        self.record("list_users".into(), || DataResponse {
            data: vec![sample_user(Role::Admin), sample_user(Role::Agent)],
            message: None,
        })
    }

    async fn list_applicants(&self) -> Result<DataResponse<Vec<User>>, ApiError> {
        self.record("list_applicants".into(), || DataResponse { data: vec![sample_user(Role::Applicant)], message: None })
    }

    async fn show_user(&self, id: &str) -> Result<DataResponse<User>, ApiError> {
        self.record(format!("show_user:{id}"), || DataResponse { data: sample_user(Role::Agent), message: None })
    }

    async fn show_user_by_agent(&self, id: &str) -> Result<DataResponse<UserData>, ApiError> {
        self.record(format!("show_user_by_agent:{id}"), || DataResponse {
            data: UserData { user: sample_user(Role::Applicant), unread_messages: 3, pending_visa_requests: 1 },
            message: None,
        })
    }

    async fn create_user(&self, data: &Registration) -> Result<DataResponse<User>, ApiError> {
        let created = User { name: data.name.clone(), email: data.email.clone(), ..sample_user(Role::Agent) };
        self.record("create_user".into(), || DataResponse { data: created, message: Some("User created".into()) })
    }

    async fn edit_user(&self, id: &str, _data: &Registration) -> Result<MessageResponse, ApiError> {
        self.record(format!("edit_user:{id}"), MessageResponse::default)
    }

    async fn delete_user(&self, id: &str) -> Result<MessageResponse, ApiError> {
        self.record(format!("delete_user:{id}"), || MessageResponse { message: Some("User deleted".into()) })
    }
}

// =============================================================================
// Identity provider
// =============================================================================

/// Scripted identity provider. `sign_in_error` fails the sign-in step;
/// `terminate_error` fails sign-out; `action_error` fails the password
/// account, reset, and verification calls.
pub struct MockIdentity {
    pub sign_in_error: Option<FederatedError>,
    pub terminate_error: Option<FederatedError>,
    pub action_error: Option<FederatedError>,
    pub verified: bool,
    pub session: watch::Sender<Option<FederatedUser>>,
    pub calls: Mutex<Vec<String>>,
}

impl MockIdentity {
    pub fn new() -> Self {
        Self {
            sign_in_error: None,
            terminate_error: None,
            action_error: None,
            verified: false,
            session: watch::Sender::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    fn action(&self, call: impl Into<String>) -> Result<(), FederatedError> {
        self.record(call);
        match &self.action_error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

impl Default for MockIdentity {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl IdentityProvider for MockIdentity {
    async fn sign_in(&self, provider: OAuthProvider) -> Result<FederatedCredential, FederatedError> {
        self.record(format!("sign_in:{provider}"));
        if let Some(err) = &self.sign_in_error {
            return Err(err.clone());
        }
        let user = federated_user();
        self.session.send_replace(Some(user.clone()));
        Ok(FederatedCredential { provider, user })
    }

    async fn sign_in_with_password(&self, email: &str, _password: &str) -> Result<FederatedUser, FederatedError> {
        self.action(format!("sign_in_with_password:{email}"))?;
        let user = FederatedUser { provider_id: "password".into(), email_verified: self.verified, ..federated_user() };
        self.session.send_replace(Some(user.clone()));
        Ok(user)
    }

    async fn sign_up_with_password(&self, email: &str, _password: &str) -> Result<FederatedUser, FederatedError> {
        self.action(format!("sign_up_with_password:{email}"))?;
        let user = FederatedUser { provider_id: "password".into(), email_verified: false, ..federated_user() };
        self.session.send_replace(Some(user.clone()));
        Ok(user)
    }

    async fn id_token(&self, credential: &FederatedCredential) -> Result<String, FederatedError> {
        Ok(format!("id-token-{}", credential.user.uid))
    }

    fn current_session(&self) -> Option<FederatedUser> {
        self.session.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<FederatedUser>> {
        self.session.subscribe()
    }

    async fn terminate(&self) -> Result<(), FederatedError> {
        self.record("terminate");
        if let Some(err) = &self.terminate_error {
            return Err(err.clone());
        }
        self.session.send_replace(None);
        Ok(())
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), FederatedError> {
        self.action(format!("send_password_reset:{email}"))
    }

    async fn verify_reset_code(&self, code: &str) -> Result<String, FederatedError> {
        self.action(format!("verify_reset_code:{code}"))?;
        Ok("ada@example.com".into())
    }

    async fn confirm_password_reset(&self, code: &str, _new_password: &str) -> Result<(), FederatedError> {
        self.action(format!("confirm_password_reset:{code}"))
    }

    async fn resend_verification_email(&self) -> Result<(), FederatedError> {
        self.action("resend_verification_email")
    }

    async fn check_email_verified(&self) -> Result<bool, FederatedError> {
        self.action("check_email_verified")?;
        Ok(self.verified)
    }
}

// =============================================================================
// Store harness
// =============================================================================

/// A session store wired to in-memory storage, the platform router, and
/// scripted collaborators.
pub struct Harness {
    pub store: SessionStore,
    pub session: SessionHandle,
    pub storage: Arc<MemoryStore>,
    pub router: Arc<Router>,
    pub api: Arc<MockAuthApi>,
    pub identity: Arc<MockIdentity>,
    pub notifier: Arc<RecordingNotifier>,
}

pub fn harness(api: MockAuthApi, identity: MockIdentity) -> Harness {
    let storage = Arc::new(MemoryStore::new());
    let session = SessionHandle::new(storage.clone());
    let router = Arc::new(Router::new(RouteTable::platform(), session.clone()));
    let api = Arc::new(api);
    let identity = Arc::new(identity);
    let notifier = Arc::new(RecordingNotifier::default());
    let store = SessionStore::new(session.clone(), api.clone(), identity.clone(), router.clone(), notifier.clone());
    Harness { store, session, storage, router, api, identity, notifier }
}
