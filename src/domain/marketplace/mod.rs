//! Marketplace module - the read-side view of listings and accounts.
//!
//! Product CRUD and account management live outside this crate; chat only
//! needs to know who owns a listing and how to present a participant.

mod product;
mod user;

pub use product::{ParticipantRole, Product};
pub use user::UserProfile;
