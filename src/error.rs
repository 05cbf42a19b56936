//! Error types shared by the session core.
//!
//! DESIGN
//! ======
//! Collaborator failures are narrowed into tagged enums at the boundary
//! (`ApiError` for the REST backend, `FederatedError` for the identity
//! provider). Session actions return `AuthError`, which wraps exactly one of
//! the two, so turning a failure into a user-facing message is a total match
//! instead of probing untyped payloads.

#[cfg(test)]
#[path = "error_test.rs"]
mod error_test;

// =============================================================================
// REST API
// =============================================================================

/// Errors produced by the REST API collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The configured base URL cannot be used.
    #[error("invalid API base URL: {0}")]
    InvalidBaseUrl(String),

    /// The request never produced an HTTP response.
    #[error("API request failed: {0}")]
    Transport(String),

    /// The backend rejected the bearer token (HTTP 401).
    #[error("unauthorized")]
    Unauthorized { message: Option<String> },

    /// The backend answered with a non-success status.
    #[error("API responded with status {status}")]
    Rejected { status: u16, message: Option<String> },

    /// A success response body could not be decoded.
    #[error("API response decode failed: {0}")]
    Decode(String),
}

impl ApiError {
    /// The `message` field the backend attached to its error body, if any.
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Unauthorized { message } | Self::Rejected { message, .. } => message.as_deref(),
            Self::InvalidBaseUrl(_) | Self::Transport(_) | Self::Decode(_) => None,
        }
    }
}

// =============================================================================
// FEDERATED IDENTITY
// =============================================================================

/// Error codes reported by the federated identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FederatedErrorCode {
    PopupClosedByUser,
    CancelledPopupRequest,
    AccountExistsWithDifferentCredential,
    NetworkRequestFailed,
    TooManyRequests,
    OperationNotAllowed,
    Other(String),
}

impl FederatedErrorCode {
    /// Parse a provider code such as `auth/popup-closed-by-user`.
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code {
            "auth/popup-closed-by-user" => Self::PopupClosedByUser,
            "auth/cancelled-popup-request" => Self::CancelledPopupRequest,
            "auth/account-exists-with-different-credential" => Self::AccountExistsWithDifferentCredential,
            "auth/network-request-failed" => Self::NetworkRequestFailed,
            "auth/too-many-requests" => Self::TooManyRequests,
            "auth/operation-not-allowed" => Self::OperationNotAllowed,
            other => Self::Other(other.to_owned()),
        }
    }

    /// The provider's wire form of this code.
    #[must_use]
    pub fn as_code(&self) -> &str {
        match self {
            Self::PopupClosedByUser => "auth/popup-closed-by-user",
            Self::CancelledPopupRequest => "auth/cancelled-popup-request",
            Self::AccountExistsWithDifferentCredential => "auth/account-exists-with-different-credential",
            Self::NetworkRequestFailed => "auth/network-request-failed",
            Self::TooManyRequests => "auth/too-many-requests",
            Self::OperationNotAllowed => "auth/operation-not-allowed",
            Self::Other(code) => code,
        }
    }

    /// Message shown to the user for this code.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::PopupClosedByUser => "Connection cancelled.",
            Self::CancelledPopupRequest => "Only one sign-in popup can be open at a time.",
            Self::AccountExistsWithDifferentCredential => "An account already exists with this email address.",
            Self::NetworkRequestFailed => "Network error. Check your connection.",
            Self::TooManyRequests => "Too many attempts. Please try again later.",
            Self::OperationNotAllowed => "This sign-in provider is not enabled.",
            Self::Other(_) => "Sign-in failed. Please try again.",
        }
    }
}

impl std::fmt::Display for FederatedErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_code())
    }
}

/// A failure reported by the federated identity provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("federated identity error ({code}): {detail}")]
pub struct FederatedError {
    pub code: FederatedErrorCode,
    pub detail: String,
}

impl FederatedError {
    #[must_use]
    pub fn new(code: FederatedErrorCode, detail: impl Into<String>) -> Self {
        Self { code, detail: detail.into() }
    }
}

// =============================================================================
// SESSION ACTIONS
// =============================================================================

/// Error returned by every Session Store action.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Federated(#[from] FederatedError),
}

impl AuthError {
    /// The message to show the user: the provider table entry for federated
    /// failures, otherwise the backend's message or `fallback`.
    #[must_use]
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Api(err) => err.server_message().unwrap_or(fallback).to_owned(),
            Self::Federated(err) => err.code.user_message().to_owned(),
        }
    }
}

// =============================================================================
// NAVIGATION
// =============================================================================

/// Errors produced while resolving or performing a route transition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NavigationError {
    #[error("unknown route: {0}")]
    UnknownRoute(String),

    #[error("route {route} requires parameter `{param}`")]
    MissingParam { route: String, param: String },

    #[error("no route matches path {0}")]
    NoMatch(String),

    #[error("redirect loop while navigating to {0}")]
    RedirectLoop(String),
}
