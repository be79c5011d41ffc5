//! Session and password tests.

use giftlist::{auth, clear_all, init, test_lock, users, GiftlistError};
use std::sync::Once;
use tempfile::TempDir;

static INIT: Once = Once::new();
static mut TEST_DIR: Option<TempDir> = None;

fn setup() -> std::sync::MutexGuard<'static, ()> {
    let lock = test_lock();
    INIT.call_once(|| {
        let dir = TempDir::new().unwrap();
        init(dir.path().to_str().unwrap()).unwrap();
        unsafe {
            TEST_DIR = Some(dir);
        }
    });
    clear_all().unwrap();
    lock
}

#[test]
fn test_signup_creates_user_and_live_session() {
    let _lock = setup();
    let s = auth::signup("alice@example.com", "Alice", "hunter2").unwrap();
    assert_eq!(auth::validate_session(&s.token).unwrap(), s.user_id);
    assert_eq!(users::get_user(s.user_id).unwrap().email, "alice@example.com");
}

#[test]
fn test_login_round_trip() {
    let _lock = setup();
    let s = auth::signup("bob@example.com", "Bob", "secret").unwrap();
    let s2 = auth::login("bob@example.com", "secret").unwrap();
    assert_eq!(s2.user_id, s.user_id);
    // Both tokens are independently valid.
    assert!(auth::validate_session(&s.token).is_ok());
    assert!(auth::validate_session(&s2.token).is_ok());
    assert_ne!(s.token, s2.token);
}

#[test]
fn test_wrong_password_and_unknown_email_look_the_same() {
    let _lock = setup();
    auth::signup("carol@example.com", "Carol", "right").unwrap();
    let e1 = auth::login("carol@example.com", "wrong").unwrap_err();
    let e2 = auth::login("nobody@example.com", "whatever").unwrap_err();
    assert!(matches!(e1, GiftlistError::Unauthorized(_)));
    assert_eq!(e1.to_string(), e2.to_string());
}

#[test]
fn test_garbage_token_is_rejected() {
    let _lock = setup();
    assert!(matches!(
        auth::validate_session("not-a-token"),
        Err(GiftlistError::Unauthorized(_))
    ));
}

#[test]
fn test_revoke_session() {
    let _lock = setup();
    let s = auth::signup("dave@example.com", "Dave", "pw").unwrap();
    assert!(auth::revoke_session(&s.token).unwrap());
    assert!(matches!(
        auth::validate_session(&s.token),
        Err(GiftlistError::Unauthorized(_))
    ));
    // Second revoke reports that nothing was there.
    assert!(!auth::revoke_session(&s.token).unwrap());
}

#[test]
fn test_set_password_replaces_old_one() {
    let _lock = setup();
    let s = auth::signup("erin@example.com", "Erin", "old").unwrap();
    auth::set_password(s.user_id, "new").unwrap();
    assert!(auth::login("erin@example.com", "old").is_err());
    assert!(auth::login("erin@example.com", "new").is_ok());
}

#[test]
fn test_deleting_account_revokes_its_sessions() {
    let _lock = setup();
    let s = auth::signup("frank@example.com", "Frank", "pw").unwrap();
    let s2 = auth::login("frank@example.com", "pw").unwrap();
    let other = auth::signup("grace@example.com", "Grace", "pw").unwrap();

    users::delete_user(s.user_id, s.user_id).unwrap();

    assert!(auth::validate_session(&s.token).is_err());
    assert!(auth::validate_session(&s2.token).is_err());
    // Unrelated sessions survive.
    assert_eq!(auth::validate_session(&other.token).unwrap(), other.user_id);
}

#[test]
fn test_empty_password_rejected() {
    let _lock = setup();
    let err = auth::signup("henry@example.com", "Henry", "  ").unwrap_err();
    assert!(matches!(err, GiftlistError::Validation(_)));
}
