//! User lifecycle and per-user list queries.

use serde::Deserialize;
use uuid::Uuid;

use crate::db::read;
use crate::error::{GiftlistError, Result};
use crate::ids::{is_valid_email, new_id, require_field};
use crate::model::{User, UserPatch};
use crate::project::{list_dto, user_dto, ListDto, UserDto};
use crate::tx::{access_of, fetch_list, fetch_user, transact, user_by_email};

/// Filter for [`user_lists`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectKind {
    #[default]
    All,
    Owned,
    Granted,
}

/// Create a user. Email format is validated and uniqueness enforced via the
/// email index inside the same transaction as the insert.
pub fn create_user(email: &str, display_name: &str) -> Result<Uuid> {
    require_field("email", email)?;
    require_field("display_name", display_name)?;
    let email = email.trim().to_ascii_lowercase();
    if !is_valid_email(&email) {
        return Err(GiftlistError::Validation(format!(
            "'{}' is not a valid email",
            email
        )));
    }
    transact(|tx| {
        if tx.user_by_email(&email)?.is_some() {
            return Err(GiftlistError::Conflict(format!(
                "email '{}' is already used",
                email
            )));
        }
        let user = User {
            id: new_id(),
            email,
            display_name: display_name.trim().to_string(),
            created_date: tx.epoch(),
        };
        tx.put_user(&user)?;
        Ok(user.id)
    })
}

/// Full record; only handed out to the user themself by the HTTP layer.
pub fn get_user(id: Uuid) -> Result<User> {
    read(|d, tx| fetch_user(d, tx, id)?.ok_or(GiftlistError::NotFound("user")))
}

pub fn find_by_email(email: &str) -> Result<Option<Uuid>> {
    let email = email.trim().to_ascii_lowercase();
    read(|d, tx| user_by_email(d, tx, &email))
}

/// Resolve several users at once; unknown ids are a NotFound, not a gap.
pub fn get_many(ids: &[Uuid]) -> Result<Vec<User>> {
    read(|d, tx| {
        ids.iter()
            .map(|&id| fetch_user(d, tx, id)?.ok_or(GiftlistError::NotFound("user")))
            .collect()
    })
}

/// Projected listing: display name and email only.
pub fn list_users() -> Result<Vec<UserDto>> {
    read(|d, tx| {
        let mut out = Vec::new();
        for item in d.users.iter(tx)? {
            let (_k, user) = item?;
            out.push(user_dto(&user));
        }
        Ok(out)
    })
}

/// Edit a profile. Self-service only; an email change re-validates format,
/// re-checks uniqueness and moves the index entry.
pub fn edit_user(viewer: Uuid, user_id: Uuid, patch: &UserPatch) -> Result<()> {
    if viewer != user_id {
        return Err(GiftlistError::Unauthorized(
            "users may only edit themselves".into(),
        ));
    }
    transact(|tx| {
        let mut user = tx
            .get_user(user_id)?
            .ok_or(GiftlistError::NotFound("user"))?;
        if let Some(email) = &patch.email {
            let email = email.trim().to_ascii_lowercase();
            if !is_valid_email(&email) {
                return Err(GiftlistError::Validation(format!(
                    "'{}' is not a valid email",
                    email
                )));
            }
            if email != user.email {
                if tx.user_by_email(&email)?.is_some() {
                    return Err(GiftlistError::Conflict(format!(
                        "email '{}' is already used",
                        email
                    )));
                }
                tx.unindex_email(&user.email)?;
                user.email = email;
            }
        }
        if let Some(display_name) = &patch.display_name {
            require_field("display_name", display_name)?;
            user.display_name = display_name.trim().to_string();
        }
        tx.put_user(&user)
    })
}

/// Delete a user and every association. Lists where they were the sole owner
/// are cascade-deleted (the "at least one owner" invariant must hold for
/// every surviving list); co-owned lists merely lose them.
pub fn delete_user(viewer: Uuid, user_id: Uuid) -> Result<()> {
    if viewer != user_id {
        return Err(GiftlistError::Unauthorized(
            "users may only delete themselves".into(),
        ));
    }
    transact(|tx| {
        if tx.get_user(user_id)?.is_none() {
            return Err(GiftlistError::NotFound("user"));
        }
        let owned = tx.dbs().owners.list_fwd(tx.tx(), user_id)?;
        for list_id in owned {
            let access = tx.access_of(list_id)?;
            if access.owners == [user_id] {
                if let Some(list) = tx.get_list(list_id)? {
                    for gift_id in tx.gift_ids_of(list_id)? {
                        if let Some(gift) = tx.get_gift(gift_id)? {
                            tx.del_gift(&gift)?;
                        }
                    }
                    tx.del_list(&list, &access)?;
                }
            } else {
                tx.remove_owner(user_id, list_id)?;
            }
        }
        let granted = tx.dbs().granted.list_fwd(tx.tx(), user_id)?;
        for list_id in granted {
            tx.remove_granted(user_id, list_id)?;
        }
        crate::auth::revoke_user_sessions(tx, user_id)?;
        tx.del_user(user_id)?;
        Ok(())
    })
}

/// All lists a user owns and/or was granted, oldest first.
pub fn user_lists(viewer: Uuid, select: SelectKind) -> Result<Vec<ListDto>> {
    read(|d, tx| {
        let mut ids = Vec::new();
        if matches!(select, SelectKind::All | SelectKind::Owned) {
            ids.extend(d.owners.list_fwd(tx, viewer)?);
        }
        if matches!(select, SelectKind::All | SelectKind::Granted) {
            ids.extend(d.granted.list_fwd(tx, viewer)?);
        }
        let mut out = Vec::new();
        for list_id in ids {
            if let Some(list) = fetch_list(d, tx, list_id)? {
                let access = access_of(d, tx, list_id)?;
                out.push(list_dto(&list, &access));
            }
        }
        out.sort_by_key(|l| l.created_date);
        Ok(out)
    })
}
