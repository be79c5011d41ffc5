//! List lifecycle: create, read, update, delete.
//!
//! Every mutation takes the acting viewer first and goes through the policy
//! engine before touching storage.

use uuid::Uuid;

use crate::db::read;
use crate::error::{GiftlistError, Result};
use crate::ids::{new_id, require_field};
use crate::model::{List, ListPatch};
use crate::policy::{authorize, Action};
use crate::project::{list_dto, ListDto};
use crate::tx::{access_of, fetch_list, transact};

/// Create a list; the creator becomes its sole owner and the sharing code is
/// generated here, once.
pub fn create_list(owner: Uuid, title: &str, description: Option<String>) -> Result<Uuid> {
    require_field("title", title)?;
    transact(|tx| {
        if tx.get_user(owner)?.is_none() {
            return Err(GiftlistError::NotFound("user"));
        }
        let list = List {
            id: new_id(),
            title: title.trim().to_string(),
            description,
            is_shared: false,
            sharing_code: new_id(),
            created_date: tx.epoch(),
            updated_date: tx.epoch(),
        };
        tx.put_list(&list)?;
        tx.index_code(&list)?;
        tx.add_owner(owner, list.id)?;
        Ok(list.id)
    })
}

/// Read one list. Members always may; anyone may while it is shared.
pub fn get_list(viewer: Option<Uuid>, list_id: Uuid) -> Result<ListDto> {
    read(|d, tx| {
        let list = fetch_list(d, tx, list_id)?.ok_or(GiftlistError::NotFound("list"))?;
        let access = access_of(d, tx, list_id)?;
        authorize(viewer, &list, &access, Action::ReadList)?;
        Ok(list_dto(&list, &access))
    })
}

/// All lists, oldest first. No per-viewer filtering at the list level.
pub fn list_all() -> Result<Vec<ListDto>> {
    read(|d, tx| {
        let mut out = Vec::new();
        for item in d.lists.iter(tx)? {
            let (_k, list) = item?;
            let access = access_of(d, tx, list.id)?;
            out.push(list_dto(&list, &access));
        }
        out.sort_by_key(|l| l.created_date);
        Ok(out)
    })
}

/// Update title/description. Owner-only.
pub fn update_list(viewer: Uuid, list_id: Uuid, patch: &ListPatch) -> Result<()> {
    transact(|tx| {
        let mut list = tx
            .get_list(list_id)?
            .ok_or(GiftlistError::NotFound("list"))?;
        let access = tx.access_of(list_id)?;
        authorize(Some(viewer), &list, &access, Action::UpdateList)?;
        if let Some(title) = &patch.title {
            require_field("title", title)?;
            list.title = title.trim().to_string();
        }
        if let Some(description) = &patch.description {
            list.description = Some(description.clone());
        }
        list.updated_date = tx.epoch();
        tx.put_list(&list)
    })
}

/// Delete a list and cascade its gifts, join rows and code index. Owner-only.
pub fn delete_list(viewer: Uuid, list_id: Uuid) -> Result<()> {
    transact(|tx| {
        let list = tx
            .get_list(list_id)?
            .ok_or(GiftlistError::NotFound("list"))?;
        let access = tx.access_of(list_id)?;
        authorize(Some(viewer), &list, &access, Action::DeleteList)?;
        for gift_id in tx.gift_ids_of(list_id)? {
            if let Some(gift) = tx.get_gift(gift_id)? {
                tx.del_gift(&gift)?;
            }
        }
        tx.del_list(&list, &access)?;
        Ok(())
    })
}
