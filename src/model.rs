//! Record types stored in LMDB.
//!
//! Ownership and grants are NOT embedded in `List`; they live in the
//! bidirectional join indexes (`db::Dbs::owners` / `db::Dbs::granted`) and
//! are loaded into a [`ListAccess`] view when a policy decision needs them.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity record. Authentication is handled by the session layer; this is
/// the profile the rest of the system references by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    /// Globally unique, format-validated at creation.
    pub email: String,
    pub display_name: String,
    /// Epoch milliseconds.
    pub created_date: u64,
}

/// A named collection of gifts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct List {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    /// PRIVATE (false) / SHARED (true). Toggling never touches the code.
    pub is_shared: bool,
    /// Generated once at creation, immutable and unique across lists.
    pub sharing_code: Uuid,
    pub created_date: u64,
    pub updated_date: u64,
}

/// Join-table view of a list's membership. Invariant: `owners` is non-empty
/// for every persisted list.
#[derive(Debug, Clone, Default)]
pub struct ListAccess {
    pub owners: Vec<Uuid>,
    pub granted: Vec<Uuid>,
}

/// An item within exactly one list. `list_id` never changes after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gift {
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
    /// Invariant: `is_booked == booked_by.is_some()`.
    pub is_booked: bool,
    pub booked_by: Option<Uuid>,
    pub is_favorite: bool,
    pub is_hidden: bool,
    pub created_date: u64,
    pub updated_date: u64,
}

/// Patchable list fields. Sharing goes through the sharing-code manager.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListPatch {
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Fields for creating a gift.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateGift {
    pub title: String,
    #[serde(default)]
    pub category: String,
    pub price: Option<f64>,
    pub link_url: Option<String>,
    pub brand: Option<String>,
    pub size: Option<String>,
    pub color: Option<String>,
    pub comments: Option<String>,
}

/// Patchable gift fields. Booking/favorite/hidden have dedicated operations
/// so their authorization rules cannot be bypassed through an edit.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GiftPatch {
    pub title: Option<String>,
    pub category: Option<String>,
    pub price: Option<f64>,
    pub link_url: Option<String>,
    pub brand: Option<String>,
    pub size: Option<String>,
    pub color: Option<String>,
    pub comments: Option<String>,
}

/// Patchable user fields (self-service only).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPatch {
    pub email: Option<String>,
    pub display_name: Option<String>,
}
