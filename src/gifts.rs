//! Gift lifecycle, booking and owner-side flags.
//!
//! Booking is the privacy-critical path: only granted users may book, and
//! the conditional update runs inside one write transaction so two
//! concurrent bookings cannot both succeed.

use uuid::Uuid;

use crate::db::read;
use crate::error::{GiftlistError, Result};
use crate::ids::{new_id, require_field};
use crate::model::{CreateGift, Gift, GiftPatch, List, ListAccess};
use crate::policy::{authorize, Action, Role};
use crate::project::{gift_dto, GiftDto};
use crate::tx::{access_of, fetch_gift, fetch_list, gift_ids_of, transact, Tx};

fn load_list(tx: &mut Tx, list_id: Uuid) -> Result<(List, ListAccess)> {
    let list = tx
        .get_list(list_id)?
        .ok_or(GiftlistError::NotFound("list"))?;
    let access = tx.access_of(list_id)?;
    Ok((list, access))
}

/// Fetch a gift and check it actually belongs to the addressed list. A gift
/// reached through the wrong list is a denial, not a miss.
fn gift_in_list(tx: &mut Tx, list_id: Uuid, gift_id: Uuid) -> Result<Gift> {
    let gift = tx
        .get_gift(gift_id)?
        .ok_or(GiftlistError::NotFound("gift"))?;
    if gift.list_id != list_id {
        return Err(GiftlistError::Unauthorized(
            "gift does not belong to this list".into(),
        ));
    }
    Ok(gift)
}

/// Create a gift in a list. Owner-only.
pub fn create_gift(viewer: Uuid, list_id: Uuid, req: &CreateGift) -> Result<Uuid> {
    require_field("title", &req.title)?;
    transact(|tx| {
        let (list, access) = load_list(tx, list_id)?;
        authorize(Some(viewer), &list, &access, Action::CreateGift)?;
        let gift = Gift {
            id: new_id(),
            list_id,
            title: req.title.trim().to_string(),
            category: req.category.clone(),
            price: req.price,
            link_url: req.link_url.clone(),
            brand: req.brand.clone(),
            size: req.size.clone(),
            color: req.color.clone(),
            comments: req.comments.clone(),
            is_booked: false,
            booked_by: None,
            is_favorite: false,
            is_hidden: false,
            created_date: tx.epoch(),
            updated_date: tx.epoch(),
        };
        tx.put_gift(&gift)?;
        Ok(gift.id)
    })
}

/// Edit descriptive fields. Owner-only; booking/favorite/hidden are gated by
/// their own operations and cannot be reached from here.
pub fn update_gift(viewer: Uuid, list_id: Uuid, gift_id: Uuid, patch: &GiftPatch) -> Result<()> {
    transact(|tx| {
        let (list, access) = load_list(tx, list_id)?;
        authorize(Some(viewer), &list, &access, Action::EditGift)?;
        let mut gift = gift_in_list(tx, list_id, gift_id)?;
        if let Some(title) = &patch.title {
            require_field("title", title)?;
            gift.title = title.trim().to_string();
        }
        if let Some(category) = &patch.category {
            gift.category = category.clone();
        }
        if patch.price.is_some() {
            gift.price = patch.price;
        }
        if patch.link_url.is_some() {
            gift.link_url = patch.link_url.clone();
        }
        if patch.brand.is_some() {
            gift.brand = patch.brand.clone();
        }
        if patch.size.is_some() {
            gift.size = patch.size.clone();
        }
        if patch.color.is_some() {
            gift.color = patch.color.clone();
        }
        if patch.comments.is_some() {
            gift.comments = patch.comments.clone();
        }
        gift.updated_date = tx.epoch();
        tx.put_gift(&gift)
    })
}

/// Remove a gift. Owner-only.
pub fn delete_gift(viewer: Uuid, list_id: Uuid, gift_id: Uuid) -> Result<()> {
    transact(|tx| {
        let (list, access) = load_list(tx, list_id)?;
        authorize(Some(viewer), &list, &access, Action::EditGift)?;
        let gift = gift_in_list(tx, list_id, gift_id)?;
        tx.del_gift(&gift)?;
        Ok(())
    })
}

/// Read one gift, projected for the viewer. Hidden gifts are only visible to
/// owners; for anyone else they do not exist.
pub fn get_gift(viewer: Option<Uuid>, list_id: Uuid, gift_id: Uuid) -> Result<GiftDto> {
    read(|d, tx| {
        let list = fetch_list(d, tx, list_id)?.ok_or(GiftlistError::NotFound("list"))?;
        let access = access_of(d, tx, list_id)?;
        let role = authorize(viewer, &list, &access, Action::ReadList)?;
        let gift = fetch_gift(d, tx, gift_id)?.ok_or(GiftlistError::NotFound("gift"))?;
        if gift.list_id != list_id {
            return Err(GiftlistError::Unauthorized(
                "gift does not belong to this list".into(),
            ));
        }
        if gift.is_hidden && role != Role::Owner {
            return Err(GiftlistError::NotFound("gift"));
        }
        Ok(gift_dto(&gift, role))
    })
}

/// All visible gifts of a list, projected for the viewer.
pub fn gifts_of_list(viewer: Option<Uuid>, list_id: Uuid) -> Result<Vec<GiftDto>> {
    read(|d, tx| {
        let list = fetch_list(d, tx, list_id)?.ok_or(GiftlistError::NotFound("list"))?;
        let access = access_of(d, tx, list_id)?;
        let role = authorize(viewer, &list, &access, Action::ReadList)?;
        let mut out = Vec::new();
        for gift_id in gift_ids_of(d, tx, list_id)? {
            if let Some(gift) = fetch_gift(d, tx, gift_id)? {
                if gift.is_hidden && role != Role::Owner {
                    continue;
                }
                out.push(gift_dto(&gift, role));
            }
        }
        out.sort_by_key(|g| g.created_date);
        Ok(out)
    })
}

/// Book a gift for the viewer. Granted-only; owners are denied outright.
///
/// The update is conditional on `is_booked == false` within the transaction,
/// so a second booker gets a conflict instead of silently overwriting.
/// Re-booking by the same user is a no-op success.
pub fn book(viewer: Uuid, list_id: Uuid, gift_id: Uuid) -> Result<()> {
    transact(|tx| {
        let (list, access) = load_list(tx, list_id)?;
        authorize(Some(viewer), &list, &access, Action::BookGift)?;
        let mut gift = gift_in_list(tx, list_id, gift_id)?;
        if gift.is_booked {
            return if gift.booked_by == Some(viewer) {
                Ok(())
            } else {
                Err(GiftlistError::Conflict("gift is already booked".into()))
            };
        }
        gift.is_booked = true;
        gift.booked_by = Some(viewer);
        gift.updated_date = tx.epoch();
        tx.put_gift(&gift)
    })
}

/// Release a booking. Only the user who booked may release it.
pub fn unbook(viewer: Uuid, list_id: Uuid, gift_id: Uuid) -> Result<()> {
    transact(|tx| {
        let (list, access) = load_list(tx, list_id)?;
        authorize(Some(viewer), &list, &access, Action::BookGift)?;
        let mut gift = gift_in_list(tx, list_id, gift_id)?;
        if !gift.is_booked {
            return Ok(());
        }
        if gift.booked_by != Some(viewer) {
            return Err(GiftlistError::Conflict(
                "gift was booked by someone else".into(),
            ));
        }
        gift.is_booked = false;
        gift.booked_by = None;
        gift.updated_date = tx.epoch();
        tx.put_gift(&gift)
    })
}

/// Owner-only boolean flags, stored globally on the record (matches the
/// observed product behavior; see DESIGN.md).
fn set_flag(
    viewer: Uuid,
    list_id: Uuid,
    gift_id: Uuid,
    f: impl FnOnce(&mut Gift),
) -> Result<()> {
    transact(|tx| {
        let (list, access) = load_list(tx, list_id)?;
        authorize(Some(viewer), &list, &access, Action::EditGift)?;
        let mut gift = gift_in_list(tx, list_id, gift_id)?;
        f(&mut gift);
        gift.updated_date = tx.epoch();
        tx.put_gift(&gift)
    })
}

pub fn favorite(viewer: Uuid, list_id: Uuid, gift_id: Uuid) -> Result<()> {
    set_flag(viewer, list_id, gift_id, |g| g.is_favorite = true)
}

pub fn unfavorite(viewer: Uuid, list_id: Uuid, gift_id: Uuid) -> Result<()> {
    set_flag(viewer, list_id, gift_id, |g| g.is_favorite = false)
}

pub fn hide(viewer: Uuid, list_id: Uuid, gift_id: Uuid) -> Result<()> {
    set_flag(viewer, list_id, gift_id, |g| g.is_hidden = true)
}

pub fn unhide(viewer: Uuid, list_id: Uuid, gift_id: Uuid) -> Result<()> {
    set_flag(viewer, list_id, gift_id, |g| g.is_hidden = false)
}
