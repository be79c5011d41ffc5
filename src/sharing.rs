//! Sharing-code manager.
//!
//! Each list carries a sharing code from the moment it is created; toggling
//! between PRIVATE and SHARED never regenerates it. The code only grants
//! access to non-owners while the list is SHARED.

use uuid::Uuid;

use crate::db::read;
use crate::error::{GiftlistError, Result};
use crate::policy::{authorize, classify, Action, Role};
use crate::project::{list_dto, ListDto};
use crate::tx::{access_of, fetch_list, list_by_code, transact};

/// Make a list shared. Owner-only, idempotent.
pub fn share(viewer: Uuid, list_id: Uuid) -> Result<()> {
    set_shared(viewer, list_id, true)
}

/// Make a list private again. Owner-only, idempotent.
pub fn unshare(viewer: Uuid, list_id: Uuid) -> Result<()> {
    set_shared(viewer, list_id, false)
}

fn set_shared(viewer: Uuid, list_id: Uuid, shared: bool) -> Result<()> {
    transact(|tx| {
        let mut list = tx
            .get_list(list_id)?
            .ok_or(GiftlistError::NotFound("list"))?;
        let access = tx.access_of(list_id)?;
        authorize(Some(viewer), &list, &access, Action::ToggleShare)?;
        if list.is_shared == shared {
            // Already in the desired state: success, and the code stays put.
            return Ok(());
        }
        list.is_shared = shared;
        list.updated_date = tx.epoch();
        tx.put_list(&list)
    })
}

/// Resolve a list from its sharing code.
///
/// Owners may preview their own link even while the list is private; anyone
/// else needs the list to be SHARED.
pub fn resolve_by_code(viewer: Option<Uuid>, code: Uuid) -> Result<ListDto> {
    read(|d, tx| {
        let list_id = list_by_code(d, tx, code)?.ok_or(GiftlistError::NotFound("list"))?;
        let list = fetch_list(d, tx, list_id)?.ok_or(GiftlistError::NotFound("list"))?;
        let access = access_of(d, tx, list_id)?;
        let role = match viewer {
            Some(v) => classify(v, &access),
            None => Role::Stranger,
        };
        if role != Role::Owner && !list.is_shared {
            return Err(GiftlistError::Unauthorized("list is not shared".into()));
        }
        Ok(list_dto(&list, &access))
    })
}

/// Accept an invite: add the viewer to the list's granted set.
///
/// Idempotent set semantics, and a no-op success for owners so that an owner
/// visiting their own share link never ends up "granted" on their own list.
pub fn consume_invite(viewer: Uuid, code: Uuid) -> Result<()> {
    transact(|tx| {
        let list_id = tx.list_by_code(code)?.ok_or(GiftlistError::NotFound("list"))?;
        let list = tx
            .get_list(list_id)?
            .ok_or(GiftlistError::NotFound("list"))?;
        let access = tx.access_of(list_id)?;
        match classify(viewer, &access) {
            Role::Owner => Ok(()),
            _ => {
                if !list.is_shared {
                    return Err(GiftlistError::Unauthorized("list is not shared".into()));
                }
                if tx.get_user(viewer)?.is_none() {
                    return Err(GiftlistError::NotFound("user"));
                }
                tx.add_granted(viewer, list_id)
            }
        }
    })
}
