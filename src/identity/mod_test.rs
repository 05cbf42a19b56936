use super::*;

// =============================================================================
// OAuthProvider
// =============================================================================

#[test]
fn provider_parses_case_insensitively() {
    assert_eq!("google".parse::<OAuthProvider>().unwrap(), OAuthProvider::Google);
    assert_eq!(" Facebook ".parse::<OAuthProvider>().unwrap(), OAuthProvider::Facebook);
    assert_eq!("MICROSOFT".parse::<OAuthProvider>().unwrap(), OAuthProvider::Microsoft);
    assert_eq!("apple".parse::<OAuthProvider>().unwrap(), OAuthProvider::Apple);
}

#[test]
fn unknown_provider_is_operation_not_allowed() {
    let err = "github".parse::<OAuthProvider>().unwrap_err();
    assert_eq!(err.code, FederatedErrorCode::OperationNotAllowed);
    assert!(err.detail.contains("github"));
}

#[test]
fn provider_ids_and_scopes() {
    assert_eq!(OAuthProvider::Microsoft.provider_id(), "microsoft.com");
    assert_eq!(OAuthProvider::Apple.provider_id(), "apple.com");
    assert!(OAuthProvider::Facebook.scopes().contains(&"public_profile"));
    assert!(OAuthProvider::Google.scopes().contains(&"email"));
}

#[test]
fn provider_display_round_trips() {
    for provider in [OAuthProvider::Google, OAuthProvider::Facebook, OAuthProvider::Microsoft, OAuthProvider::Apple] {
        assert_eq!(provider.to_string().parse::<OAuthProvider>().unwrap(), provider);
    }
}

// =============================================================================
// DisabledIdentity
// =============================================================================

#[tokio::test]
async fn disabled_sign_in_reports_provider_not_enabled() {
    let identity = DisabledIdentity::new();
    let err = identity.sign_in(OAuthProvider::Google).await.unwrap_err();
    assert_eq!(err.code, FederatedErrorCode::OperationNotAllowed);
}

#[tokio::test]
async fn disabled_password_reset_fails() {
    let identity = DisabledIdentity::new();
    assert!(identity.send_password_reset("a@b.com").await.is_err());
    assert!(identity.confirm_password_reset("code", "pw").await.is_err());
}

#[tokio::test]
async fn disabled_has_no_session_and_terminates_cleanly() {
    let identity = DisabledIdentity::new();
    assert!(identity.current_session().is_none());
    assert!(identity.subscribe().borrow().is_none());
    assert!(identity.terminate().await.is_ok());
    assert!(!identity.check_email_verified().await.unwrap());
}

#[tokio::test]
async fn disabled_password_accounts_are_not_enabled() {
    let identity = DisabledIdentity::new();
    let err = identity.sign_in_with_password("a@b.com", "pw").await.unwrap_err();
    assert_eq!(err.code, FederatedErrorCode::OperationNotAllowed);
    assert!(identity.sign_up_with_password("a@b.com", "pw").await.is_err());
    assert!(identity.current_session().is_none());
}
