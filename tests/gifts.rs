//! Gift tests: booking authorization and atom-like conditional update,
//! owner redaction, hidden-gift filtering, owner-only flags.

use giftlist::model::{CreateGift, GiftPatch};
use giftlist::{clear_all, gifts, init, lists, sharing, test_lock, users, GiftlistError};
use std::sync::Once;
use tempfile::TempDir;
use uuid::Uuid;

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

fn mk_user(email: &str) -> Uuid {
    users::create_user(email, "Someone").unwrap()
}

fn gift_req(title: &str) -> CreateGift {
    CreateGift {
        title: title.into(),
        category: "misc".into(),
        price: None,
        link_url: None,
        brand: None,
        size: None,
        color: None,
        comments: None,
    }
}

/// Owner + granted member + one gift, ready for booking scenarios.
fn fixture() -> (Uuid, Uuid, Uuid, Uuid) {
    let owner = mk_user("owner@example.com");
    let friend = mk_user("friend@example.com");
    let list_id = lists::create_list(owner, "birthday", None).unwrap();
    sharing::share(owner, list_id).unwrap();
    let code = lists::get_list(Some(owner), list_id).unwrap().sharing_code;
    sharing::consume_invite(friend, code).unwrap();
    let gift_id = gifts::create_gift(owner, list_id, &gift_req("socks")).unwrap();
    (owner, friend, list_id, gift_id)
}

#[test]
fn test_create_gift_is_owner_only() {
    let _lock = setup();
    let (_owner, friend, list_id, _gift) = fixture();
    assert!(matches!(
        gifts::create_gift(friend, list_id, &gift_req("sneaky")),
        Err(GiftlistError::Unauthorized(_))
    ));
}

#[test]
fn test_granted_user_books_and_owner_cannot() {
    let _lock = setup();
    let (owner, friend, list_id, gift_id) = fixture();

    // Owner may never book on their own list.
    assert!(matches!(
        gifts::book(owner, list_id, gift_id),
        Err(GiftlistError::Unauthorized(_))
    ));

    gifts::book(friend, list_id, gift_id).unwrap();
    let seen = gifts::get_gift(Some(friend), list_id, gift_id).unwrap();
    assert_eq!(seen.is_booked, Some(true));
    assert_eq!(seen.booked_by, Some(friend));
}

#[test]
fn test_stranger_cannot_book_and_state_is_unchanged() {
    let _lock = setup();
    let (_owner, friend, list_id, gift_id) = fixture();
    let stranger = mk_user("stranger@example.com");

    assert!(matches!(
        gifts::book(stranger, list_id, gift_id),
        Err(GiftlistError::Unauthorized(_))
    ));
    let seen = gifts::get_gift(Some(friend), list_id, gift_id).unwrap();
    assert_eq!(seen.is_booked, Some(false));
    assert_eq!(seen.booked_by, None);
}

#[test]
fn test_double_booking_is_a_conflict() {
    let _lock = setup();
    let (owner, friend, list_id, gift_id) = fixture();
    let rival = mk_user("rival@example.com");
    let code = lists::get_list(Some(owner), list_id).unwrap().sharing_code;
    sharing::consume_invite(rival, code).unwrap();

    gifts::book(friend, list_id, gift_id).unwrap();
    assert!(matches!(
        gifts::book(rival, list_id, gift_id),
        Err(GiftlistError::Conflict(_))
    ));
    // Re-booking by the same user stays a success.
    gifts::book(friend, list_id, gift_id).unwrap();
    let seen = gifts::get_gift(Some(rival), list_id, gift_id).unwrap();
    assert_eq!(seen.booked_by, Some(friend));
}

#[test]
fn test_unbook_only_by_the_booker() {
    let _lock = setup();
    let (owner, friend, list_id, gift_id) = fixture();
    let rival = mk_user("rival@example.com");
    let code = lists::get_list(Some(owner), list_id).unwrap().sharing_code;
    sharing::consume_invite(rival, code).unwrap();

    gifts::book(friend, list_id, gift_id).unwrap();
    assert!(matches!(
        gifts::unbook(rival, list_id, gift_id),
        Err(GiftlistError::Conflict(_))
    ));
    gifts::unbook(friend, list_id, gift_id).unwrap();
    let seen = gifts::get_gift(Some(friend), list_id, gift_id).unwrap();
    assert_eq!(seen.is_booked, Some(false));
}

#[test]
fn test_owner_read_redacts_booking_fields() {
    let _lock = setup();
    let (owner, friend, list_id, gift_id) = fixture();
    gifts::book(friend, list_id, gift_id).unwrap();

    let owner_view = gifts::get_gift(Some(owner), list_id, gift_id).unwrap();
    assert_eq!(owner_view.is_booked, None);
    assert_eq!(owner_view.booked_by, None);

    let friend_view = gifts::get_gift(Some(friend), list_id, gift_id).unwrap();
    assert_eq!(friend_view.is_booked, Some(true));
    assert_eq!(friend_view.booked_by, Some(friend));
}

#[test]
fn test_granted_user_cannot_edit() {
    let _lock = setup();
    let (_owner, friend, list_id, gift_id) = fixture();
    let patch = GiftPatch {
        title: Some("renamed".into()),
        ..Default::default()
    };
    assert!(matches!(
        gifts::update_gift(friend, list_id, gift_id, &patch),
        Err(GiftlistError::Unauthorized(_))
    ));
}

#[test]
fn test_gift_addressed_through_wrong_list_is_denied() {
    let _lock = setup();
    let (owner, _friend, _list_id, gift_id) = fixture();
    let other_list = lists::create_list(owner, "other", None).unwrap();
    assert!(matches!(
        gifts::get_gift(Some(owner), other_list, gift_id),
        Err(GiftlistError::Unauthorized(_))
    ));
    assert!(matches!(
        gifts::delete_gift(owner, other_list, gift_id),
        Err(GiftlistError::Unauthorized(_))
    ));
}

#[test]
fn test_hidden_gift_invisible_to_non_owners() {
    let _lock = setup();
    let (owner, friend, list_id, gift_id) = fixture();
    gifts::hide(owner, list_id, gift_id).unwrap();

    // Owner still sees it, flagged.
    let owner_view = gifts::get_gift(Some(owner), list_id, gift_id).unwrap();
    assert!(owner_view.is_hidden);
    assert_eq!(gifts::gifts_of_list(Some(owner), list_id).unwrap().len(), 1);

    // For the granted user it does not exist.
    assert!(matches!(
        gifts::get_gift(Some(friend), list_id, gift_id),
        Err(GiftlistError::NotFound(_))
    ));
    assert!(gifts::gifts_of_list(Some(friend), list_id).unwrap().is_empty());

    gifts::unhide(owner, list_id, gift_id).unwrap();
    assert_eq!(gifts::gifts_of_list(Some(friend), list_id).unwrap().len(), 1);
}

#[test]
fn test_flags_are_owner_only_and_idempotent() {
    let _lock = setup();
    let (owner, friend, list_id, gift_id) = fixture();

    assert!(matches!(
        gifts::favorite(friend, list_id, gift_id),
        Err(GiftlistError::Unauthorized(_))
    ));

    gifts::favorite(owner, list_id, gift_id).unwrap();
    gifts::favorite(owner, list_id, gift_id).unwrap();
    assert!(gifts::get_gift(Some(owner), list_id, gift_id).unwrap().is_favorite);
    gifts::unfavorite(owner, list_id, gift_id).unwrap();
    assert!(!gifts::get_gift(Some(owner), list_id, gift_id).unwrap().is_favorite);
}

#[test]
fn test_update_patches_only_given_fields() {
    let _lock = setup();
    let (owner, _friend, list_id, gift_id) = fixture();
    let patch = GiftPatch {
        price: Some(19.9),
        brand: Some("acme".into()),
        ..Default::default()
    };
    gifts::update_gift(owner, list_id, gift_id, &patch).unwrap();
    let seen = gifts::get_gift(Some(owner), list_id, gift_id).unwrap();
    assert_eq!(seen.title, "socks");
    assert_eq!(seen.price, Some(19.9));
    assert_eq!(seen.brand.as_deref(), Some("acme"));
}

#[test]
fn test_anonymous_reader_sees_shared_list_gifts() {
    let _lock = setup();
    let (_owner, friend, list_id, gift_id) = fixture();
    gifts::book(friend, list_id, gift_id).unwrap();

    let all = gifts::gifts_of_list(None, list_id).unwrap();
    assert_eq!(all.len(), 1);
    // Anonymous viewers are not owners, so booking state is visible.
    assert_eq!(all[0].is_booked, Some(true));
}
