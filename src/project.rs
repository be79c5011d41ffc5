//! Viewer-scoped response shapes.
//!
//! Booking is stored as a plain global fact on the gift record; whether a
//! viewer may see it is policy. The projection step redacts booking fields
//! from owners so they can never learn who booked (or that anything was
//! booked) on their own list.

use serde::Serialize;
use uuid::Uuid;

use crate::model::{Gift, List, ListAccess, User};
use crate::policy::Role;

/// Full list shape, including membership ids loaded from the join indexes
#[derive(Debug, Clone, Serialize)]
pub struct ListDto {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub is_shared: bool,
    pub sharing_code: Uuid,
    pub owners_ids: Vec<Uuid>,
    pub granted_users_ids: Vec<Uuid>,
    pub created_date: u64,
    pub updated_date: u64,
}

/// Public user shape for listings; the full record is only returned to the
/// user themself.
#[derive(Debug, Clone, Serialize)]
pub struct UserDto {
    pub display_name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GiftDto {
    pub id: Uuid,
    pub list_id: Uuid,
    pub title: String,
    pub category: String,
    pub price: Option<f64>,
    pub link_url: Option<String>,
    pub brand: Option<String>,
    pub size: Option<String>,
    pub color: Option<String>,
    pub comments: Option<String>,
    pub is_favorite: bool,
    pub is_hidden: bool,
    /// Absent for owner viewers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_booked: Option<bool>,
    /// Absent for owner viewers and for unbooked gifts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booked_by: Option<Uuid>,
    pub created_date: u64,
    pub updated_date: u64,
}

pub fn list_dto(list: &List, access: &ListAccess) -> ListDto {
    ListDto {
        id: list.id,
        title: list.title.clone(),
        description: list.description.clone(),
        is_shared: list.is_shared,
        sharing_code: list.sharing_code,
        owners_ids: access.owners.clone(),
        granted_users_ids: access.granted.clone(),
        created_date: list.created_date,
        updated_date: list.updated_date,
    }
}

pub fn user_dto(user: &User) -> UserDto {
    UserDto {
        display_name: user.display_name.clone(),
        email: user.email.clone(),
    }
}

/// Shape a gift for a viewer with the given role on its list
pub fn gift_dto(gift: &Gift, role: Role) -> GiftDto {
    let (is_booked, booked_by) = match role {
        Role::Owner => (None, None),
        _ => (Some(gift.is_booked), gift.booked_by),
    };
    GiftDto {
        id: gift.id,
        list_id: gift.list_id,
        title: gift.title.clone(),
        category: gift.category.clone(),
        price: gift.price,
        link_url: gift.link_url.clone(),
        brand: gift.brand.clone(),
        size: gift.size.clone(),
        color: gift.color.clone(),
        comments: gift.comments.clone(),
        is_favorite: gift.is_favorite,
        is_hidden: gift.is_hidden,
        is_booked,
        booked_by,
        created_date: gift.created_date,
        updated_date: gift.updated_date,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::new_id;

    fn booked_gift(booker: Uuid) -> Gift {
        Gift {
            id: new_id(),
            list_id: new_id(),
            title: "socks".into(),
            category: "clothing".into(),
            price: Some(9.5),
            link_url: None,
            brand: None,
            size: None,
            color: None,
            comments: None,
            is_booked: true,
            booked_by: Some(booker),
            is_favorite: false,
            is_hidden: false,
            created_date: 1,
            updated_date: 2,
        }
    }

    #[test]
    fn test_owner_sees_no_booking_fields() {
        let dto = gift_dto(&booked_gift(new_id()), Role::Owner);
        assert_eq!(dto.is_booked, None);
        assert_eq!(dto.booked_by, None);
    }

    #[test]
    fn test_granted_sees_booking_state() {
        let booker = new_id();
        let dto = gift_dto(&booked_gift(booker), Role::Granted);
        assert_eq!(dto.is_booked, Some(true));
        assert_eq!(dto.booked_by, Some(booker));
    }
}
