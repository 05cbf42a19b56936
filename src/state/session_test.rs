use std::sync::Arc;

use super::*;
use crate::storage::MemoryStore;
use crate::test_helpers::{federated_user, sample_user};

fn handle() -> (SessionHandle, Arc<MemoryStore>) {
    let storage = Arc::new(MemoryStore::new());
    (SessionHandle::new(storage.clone()), storage)
}

fn seed(storage: &MemoryStore, user: Option<&str>, token: Option<&str>) {
    if let Some(raw) = user {
        storage.set(keys::USER, raw);
    }
    if let Some(raw) = token {
        storage.set(keys::ACCESS_TOKEN, raw);
    }
}

const STORED_ADMIN: &str = r#"{"id":1,"name":"Ada","email":"ada@example.com","role":"admin"}"#;

// =============================================================================
// Session
// =============================================================================

#[test]
fn default_session_is_signed_out() {
    let session = Session::default();
    assert!(!session.is_authenticated());
    assert_eq!(session.role(), None);
    assert!(!session.email_verified());
}

#[test]
fn unknown_role_is_not_an_authenticated_role() {
    let mut user = sample_user(Role::Admin);
    user.role = None;
    let session = Session::authenticated(user, "tok");
    assert!(session.is_authenticated());
    assert_eq!(session.authenticated_role(), None);
}

// =============================================================================
// Rehydration
// =============================================================================

#[test]
fn rehydrates_persisted_session() {
    let (handle, storage) = handle();
    seed(&storage, Some(STORED_ADMIN), Some(r#""tok-9""#));
    storage.set(keys::EMAIL_VERIFIED, "true");

    let session = handle.rehydrate();

    assert!(session.is_authenticated());
    assert_eq!(session.role(), Some(Role::Admin));
    assert_eq!(session.credential_token(), Some("tok-9"));
    assert!(session.email_verified());
    assert_eq!(handle.snapshot(), session);
}

#[test]
fn rehydrate_treats_sentinel_strings_as_absent() {
    for raw in ["undefined", "null", ""] {
        let (handle, storage) = handle();
        seed(&storage, Some(raw), Some(raw));
        storage.set(keys::EMAIL_VERIFIED, raw);

        let session = handle.rehydrate();
        assert_eq!(session, Session::default(), "sentinel {raw:?}");
    }
}

#[test]
fn rehydrate_treats_blank_token_as_absent() {
    let (handle, storage) = handle();
    seed(&storage, Some(STORED_ADMIN), Some(r#""""#));

    let session = handle.rehydrate();
    assert!(!session.is_authenticated());
    assert_eq!(session.identity(), None);
    assert_eq!(session.credential_token(), None);
}

#[test]
fn commit_rejects_blank_token() {
    let (handle, storage) = handle();

    let err = handle.commit(sample_user(Role::Admin), "  ".into()).unwrap_err();

    assert!(matches!(err, ApiError::Decode(_)));
    assert_eq!(handle.snapshot(), Session::default());
    assert!(storage.get(keys::USER).is_none());
}

#[test]
fn blank_token_session_is_not_authenticated() {
    assert!(!Session::authenticated(sample_user(Role::Agent), "").is_authenticated());
}

#[test]
fn rehydrate_survives_malformed_json() {
    let (handle, storage) = handle();
    seed(&storage, Some("{not json"), Some(r#""tok""#));
    let session = handle.rehydrate();
    assert!(!session.is_authenticated());
    assert_eq!(session.credential_token(), None);
}

#[test]
fn half_persisted_session_restores_nothing() {
    let (handle, storage) = handle();
    seed(&storage, Some(STORED_ADMIN), None);
    assert_eq!(handle.rehydrate().identity(), None);

    let (handle, storage) = self::handle();
    seed(&storage, None, Some(r#""tok""#));
    assert_eq!(handle.rehydrate().credential_token(), None);
}

#[test]
fn rehydrate_never_restores_federated_reference() {
    let (handle, storage) = handle();
    seed(&storage, Some(STORED_ADMIN), Some(r#""tok""#));
    handle.set_federated(Some(federated_user()));
    assert_eq!(handle.rehydrate().federated(), None);
}

// =============================================================================
// Mutations
// =============================================================================

#[test]
fn commit_persists_identity_and_token() {
    let (handle, storage) = handle();
    handle.commit(sample_user(Role::Agent), "tok-2".into()).unwrap();

    assert_eq!(handle.token().as_deref(), Some("tok-2"));
    assert_eq!(storage.get(keys::ACCESS_TOKEN).as_deref(), Some(r#""tok-2""#));

    let restored = SessionHandle::new(storage.clone()).rehydrate();
    assert_eq!(restored.identity(), Some(&sample_user(Role::Agent)));
}

#[test]
fn email_verified_flag_is_persisted() {
    let (handle, storage) = handle();
    handle.set_email_verified(true);
    assert!(handle.snapshot().email_verified());
    assert_eq!(storage.get(keys::EMAIL_VERIFIED).as_deref(), Some("true"));
}

#[test]
fn federated_reference_is_memory_only() {
    let (handle, storage) = handle();
    handle.set_federated(Some(federated_user()));
    assert_eq!(handle.snapshot().federated(), Some(&federated_user()));
    assert!(storage.is_empty());
}

#[test]
fn reset_clears_session_and_feature_pointers() {
    let (handle, storage) = handle();
    handle.commit(sample_user(Role::Applicant), "tok".into()).unwrap();
    handle.set_email_verified(true);
    handle.set_federated(Some(federated_user()));
    for key in keys::FEATURE_POINTERS {
        storage.set(key, r#""42""#);
    }
    storage.set("theme", r#""dark""#);

    handle.reset();

    assert_eq!(handle.snapshot(), Session::default());
    for key in keys::SESSION.iter().chain(keys::FEATURE_POINTERS) {
        assert_eq!(storage.get(key), None, "{key} survived reset");
    }
    assert_eq!(storage.get("theme").as_deref(), Some(r#""dark""#));
}

#[test]
fn reset_is_idempotent() {
    let (handle, storage) = handle();
    handle.reset();
    handle.reset();
    assert_eq!(handle.snapshot(), Session::default());
    assert!(storage.is_empty());
}

// =============================================================================
// Observation
// =============================================================================

#[tokio::test]
async fn subscribers_observe_commit_and_reset() {
    let (handle, _) = handle();
    let mut rx = handle.subscribe();

    handle.commit(sample_user(Role::Admin), "tok".into()).unwrap();
    rx.changed().await.unwrap();
    assert!(rx.borrow_and_update().is_authenticated());

    handle.reset();
    rx.changed().await.unwrap();
    assert!(!rx.borrow_and_update().is_authenticated());
}

#[test]
fn clones_share_one_session() {
    let (handle, _) = handle();
    let other = handle.clone();
    handle.commit(sample_user(Role::Agent), "tok".into()).unwrap();
    assert_eq!(other.snapshot().role(), Some(Role::Agent));
}
