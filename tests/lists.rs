//! List lifecycle and read-access tests.

use giftlist::model::ListPatch;
use giftlist::{clear_all, init, lists, sharing, test_lock, users, GiftlistError};
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

#[test]
fn test_creator_becomes_sole_owner() {
    let _lock = setup();
    let alice = mk_user("alice@example.com");
    let list_id = lists::create_list(alice, "birthday", Some("wishes".into())).unwrap();
    let dto = lists::get_list(Some(alice), list_id).unwrap();
    assert_eq!(dto.owners_ids, vec![alice]);
    assert!(dto.granted_users_ids.is_empty());
    assert!(!dto.is_shared);
    assert_eq!(dto.description.as_deref(), Some("wishes"));
}

#[test]
fn test_create_list_requires_title() {
    let _lock = setup();
    let alice = mk_user("alice@example.com");
    let err = lists::create_list(alice, "   ", None).unwrap_err();
    assert!(matches!(err, GiftlistError::Validation(_)));
}

#[test]
fn test_create_list_for_unknown_user_fails() {
    let _lock = setup();
    let err = lists::create_list(giftlist::ids::new_id(), "ghost", None).unwrap_err();
    assert!(matches!(err, GiftlistError::NotFound(_)));
}

#[test]
fn test_private_list_hidden_from_strangers_and_anonymous() {
    let _lock = setup();
    let alice = mk_user("alice@example.com");
    let bob = mk_user("bob@example.com");
    let list_id = lists::create_list(alice, "secret", None).unwrap();

    assert!(lists::get_list(Some(alice), list_id).is_ok());
    assert!(matches!(
        lists::get_list(Some(bob), list_id),
        Err(GiftlistError::Unauthorized(_))
    ));
    assert!(matches!(
        lists::get_list(None, list_id),
        Err(GiftlistError::Unauthorized(_))
    ));
}

#[test]
fn test_shared_list_readable_by_anyone() {
    let _lock = setup();
    let alice = mk_user("alice@example.com");
    let list_id = lists::create_list(alice, "open", None).unwrap();
    sharing::share(alice, list_id).unwrap();
    assert!(lists::get_list(None, list_id).is_ok());
}

#[test]
fn test_update_is_owner_only() {
    let _lock = setup();
    let alice = mk_user("alice@example.com");
    let bob = mk_user("bob@example.com");
    let list_id = lists::create_list(alice, "before", None).unwrap();

    let patch = ListPatch {
        title: Some("after".into()),
        ..Default::default()
    };
    assert!(matches!(
        lists::update_list(bob, list_id, &patch),
        Err(GiftlistError::Unauthorized(_))
    ));
    lists::update_list(alice, list_id, &patch).unwrap();
    assert_eq!(lists::get_list(Some(alice), list_id).unwrap().title, "after");
}

#[test]
fn test_delete_cascades_gifts_and_code() {
    let _lock = setup();
    let alice = mk_user("alice@example.com");
    let list_id = lists::create_list(alice, "doomed", None).unwrap();
    let code = lists::get_list(Some(alice), list_id).unwrap().sharing_code;
    let gift_id = giftlist::gifts::create_gift(
        alice,
        list_id,
        &giftlist::model::CreateGift {
            title: "socks".into(),
            category: String::new(),
            price: None,
            link_url: None,
            brand: None,
            size: None,
            color: None,
            comments: None,
        },
    )
    .unwrap();

    lists::delete_list(alice, list_id).unwrap();

    assert!(matches!(
        lists::get_list(Some(alice), list_id),
        Err(GiftlistError::NotFound(_))
    ));
    assert!(matches!(
        giftlist::gifts::get_gift(Some(alice), list_id, gift_id),
        Err(GiftlistError::NotFound(_))
    ));
    assert!(matches!(
        sharing::resolve_by_code(Some(alice), code),
        Err(GiftlistError::NotFound(_))
    ));
}

#[test]
fn test_delete_is_owner_only() {
    let _lock = setup();
    let alice = mk_user("alice@example.com");
    let bob = mk_user("bob@example.com");
    let list_id = lists::create_list(alice, "mine", None).unwrap();
    assert!(matches!(
        lists::delete_list(bob, list_id),
        Err(GiftlistError::Unauthorized(_))
    ));
    assert!(lists::get_list(Some(alice), list_id).is_ok());
}

#[test]
fn test_list_all_sorted_by_creation() {
    let _lock = setup();
    let alice = mk_user("alice@example.com");
    let a = lists::create_list(alice, "first", None).unwrap();
    let b = lists::create_list(alice, "second", None).unwrap();
    let all = lists::list_all().unwrap();
    assert_eq!(all.len(), 2);
    let pos_a = all.iter().position(|l| l.id == a).unwrap();
    let pos_b = all.iter().position(|l| l.id == b).unwrap();
    assert!(pos_a <= pos_b || all[pos_a].created_date == all[pos_b].created_date);
}
