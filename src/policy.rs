//! Access policy engine.
//!
//! Pure decisions over (viewer, list) pairs: no storage access, no state.
//! Every denial is an explicit error surfaced to the caller; the engine
//! never silently filters.

use uuid::Uuid;

use crate::error::{GiftlistError, Result};
use crate::model::{List, ListAccess};

/// A viewer's relationship to a list. Owner wins over Granted when a user
/// appears in both join sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Owner,
    Granted,
    Stranger,
}

/// Operations the engine gates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ReadList,
    UpdateList,
    DeleteList,
    ToggleShare,
    CreateGift,
    EditGift,
    BookGift,
    AcceptInvite,
}

/// Classify a viewer against a list's membership
pub fn classify(viewer: Uuid, access: &ListAccess) -> Role {
    if access.owners.contains(&viewer) {
        Role::Owner
    } else if access.granted.contains(&viewer) {
        Role::Granted
    } else {
        Role::Stranger
    }
}

/// Gate an action. Returns the viewer's role on success so callers can reuse
/// it for projection without a second classification pass.
pub fn authorize(
    viewer: Option<Uuid>,
    list: &List,
    access: &ListAccess,
    action: Action,
) -> Result<Role> {
    let role = match viewer {
        Some(v) => classify(v, access),
        None => Role::Stranger,
    };
    let allowed = match action {
        // A shared list is readable by anyone; a private one only by members.
        Action::ReadList => list.is_shared || matches!(role, Role::Owner | Role::Granted),
        Action::UpdateList
        | Action::DeleteList
        | Action::ToggleShare
        | Action::CreateGift
        | Action::EditGift => role == Role::Owner,
        // Owners must never book on their own list; this is the privacy core
        // of the whole application.
        Action::BookGift => role == Role::Granted,
        Action::AcceptInvite => viewer.is_some(),
    };
    if allowed {
        Ok(role)
    } else {
        Err(GiftlistError::Unauthorized(format!(
            "{:?} may not {:?} on list {}",
            role, action, list.id
        )))
    }
}
