use std::sync::{Mutex, MutexGuard};

use super::*;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn env_lock() -> MutexGuard<'static, ()> {
    ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// # Safety
/// Callers hold `env_lock()` so no other test reads the environment meanwhile.
unsafe fn clear_portal_env() {
    unsafe {
        std::env::remove_var("VISA_API_BASE_URL");
        std::env::remove_var("VISA_SESSION_FILE");
        std::env::remove_var("FIREBASE_API_KEY");
    }
}

#[test]
fn from_env_defaults() {
    let _env = env_lock();
    unsafe { clear_portal_env() };

    let cfg = PortalConfig::from_env().unwrap();
    assert_eq!(cfg, PortalConfig::default());
    assert_eq!(cfg.api_base_url, "http://127.0.0.1:8001/api");
    assert_eq!(cfg.firebase_api_key, None);
}

#[test]
fn from_env_reads_overrides() {
    let _env = env_lock();
    unsafe {
        clear_portal_env();
        std::env::set_var("VISA_API_BASE_URL", "https://visa.example.test/api/");
        std::env::set_var("VISA_SESSION_FILE", "/tmp/portal.json");
        std::env::set_var("FIREBASE_API_KEY", " key-1 ");
    }

    let cfg = PortalConfig::from_env().unwrap();
    assert_eq!(cfg.api_base_url, "https://visa.example.test/api");
    assert_eq!(cfg.session_file, PathBuf::from("/tmp/portal.json"));
    assert_eq!(cfg.firebase_api_key.as_deref(), Some("key-1"));

    unsafe { clear_portal_env() };
}

#[test]
fn from_env_rejects_non_http_url() {
    let _env = env_lock();
    unsafe {
        clear_portal_env();
        std::env::set_var("VISA_API_BASE_URL", "visa.example.test");
    }

    let err = PortalConfig::from_env().unwrap_err();
    assert_eq!(err, ConfigError::InvalidUrl { var: "VISA_API_BASE_URL", value: "visa.example.test".into() });

    unsafe { clear_portal_env() };
}

#[test]
fn from_env_rejects_empty_session_file() {
    let _env = env_lock();
    unsafe {
        clear_portal_env();
        std::env::set_var("VISA_SESSION_FILE", "  ");
    }

    assert_eq!(PortalConfig::from_env().unwrap_err(), ConfigError::Empty("VISA_SESSION_FILE"));

    unsafe { clear_portal_env() };
}

#[test]
fn blank_firebase_key_disables_provider() {
    let _env = env_lock();
    unsafe {
        clear_portal_env();
        std::env::set_var("FIREBASE_API_KEY", "");
    }

    assert_eq!(PortalConfig::from_env().unwrap().firebase_api_key, None);

    unsafe { clear_portal_env() };
}

#[test]
fn with_api_base_url_validates() {
    let cfg = PortalConfig::default().with_api_base_url("http://localhost:9000/api//").unwrap();
    assert_eq!(cfg.api_base_url, "http://localhost:9000/api");
    assert!(PortalConfig::default().with_api_base_url("ftp://x").is_err());
}

// =============================================================================
// .env
// =============================================================================

#[test]
fn dotenv_missing_file_is_not_an_error() {
    let missing = dotenvy::Error::Io(std::io::Error::from(std::io::ErrorKind::NotFound));
    assert_eq!(DotenvStatus::from(Err(missing)), DotenvStatus::Missing);
}

#[test]
fn dotenv_malformed_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".env");
    std::fs::write(&path, "VISA_API_BASE_URL='unterminated\n").unwrap();

    let result = dotenvy::from_path_iter(&path).and_then(|iter| iter.collect::<Result<Vec<_>, _>>()).map(|_| path);

    assert!(matches!(DotenvStatus::from(result), DotenvStatus::Unreadable(_)));
}

#[test]
fn dotenv_loaded_keeps_path() {
    let path = PathBuf::from("/srv/portal/.env");
    assert_eq!(DotenvStatus::from(Ok(path.clone())), DotenvStatus::Loaded(path));
}
