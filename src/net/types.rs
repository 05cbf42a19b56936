//! Wire types exchanged with the platform backend.
//!
//! DESIGN
//! ======
//! Decoding is lenient where the backend is loose: numeric or string ids both
//! decode to a string, and an unrecognized role decodes to `None` so the
//! navigation layer treats it as unauthenticated instead of failing the
//! whole payload.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use serde::{Deserialize, Deserializer, Serialize};

// =============================================================================
// ROLE
// =============================================================================

/// Platform role. Applicants travel on the wire as `custom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "admin")]
    Admin,
    #[serde(rename = "agent")]
    Agent,
    #[serde(rename = "custom", alias = "applicant")]
    Applicant,
}

impl Role {
    /// Parse the backend tag (`applicant` accepted as an alias of `custom`).
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "admin" => Some(Self::Admin),
            "agent" => Some(Self::Agent),
            "custom" | "applicant" => Some(Self::Applicant),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Agent => "agent",
            Self::Applicant => "custom",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// USER
// =============================================================================

/// A platform user as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(default, deserialize_with = "lenient_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub email: String,
    #[serde(default, deserialize_with = "lenient_role", skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Federated identity reference when the account is linked to one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firebase_uid: Option<String>,
}

/// A user row enriched with agent-facing counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserData {
    #[serde(flatten)]
    pub user: User,
    #[serde(rename = "numberMessageUnRead", default)]
    pub unread_messages: u32,
    #[serde(rename = "numberVisaRequestPending", default)]
    pub pending_visa_requests: u32,
}

fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_role<'de, D>(deserializer: D) -> Result<Option<Role>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(serde_json::Value::as_str).and_then(Role::parse))
}

// =============================================================================
// REQUESTS
// =============================================================================

/// Password login payload for `POST /auth/login`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firebase_token: Option<String>,
}

impl Credentials {
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self { email: email.into(), password: password.into(), firebase_token: None }
    }
}

/// Account payload for registration and the user-management endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firebase_uid: Option<String>,
}

impl Registration {
    #[must_use]
    pub fn new(name: impl Into<String>, email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            password: Some(password.into()),
            role: None,
            image: None,
            firebase_uid: None,
        }
    }
}

/// Federated token exchange payload for `POST /auth/firebase`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FederatedLogin {
    pub firebase_token: String,
    pub firebase_uid: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub photo_url: Option<String>,
    pub provider: String,
}

// =============================================================================
// RESPONSES
// =============================================================================

/// Body of a successful login, registration, or token exchange.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub message: Option<String>,
    pub user: User,
    pub access_token: String,
}

/// Body carrying only a status message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: Option<String>,
}

/// Body wrapping a payload under `data`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DataResponse<T> {
    pub data: T,
    #[serde(default)]
    pub message: Option<String>,
}

/// Error body shape used by the backend.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}
