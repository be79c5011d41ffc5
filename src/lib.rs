//! Giftlist - access-controlled gift list sharing.
//!
//! A list has owners and granted users; sharing is a toggle plus an opaque
//! code that lets invitees join the granted set. Owners manage lists and
//! gifts but never see booking state; granted users see bookings and may
//! book, but cannot edit. Everything is stored in one LMDB environment,
//! initialized once per process with [`init`].

pub mod auth;
pub mod db;
pub mod error;
pub mod gifts;
pub mod ids;
pub mod lists;
pub mod model;
pub mod policy;
pub mod project;
pub mod sharing;
pub mod users;

mod tx;

pub use db::{clear_all, init, test_lock};
pub use error::{GiftlistError, Result};
