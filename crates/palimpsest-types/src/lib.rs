//! Palimpsest domain types.
//!
//! Shared between the store (palimpsest-db) and its callers. Nothing here
//! touches SQLite; row mapping lives in the db crate.

pub mod ids;
pub mod models;

pub use ids::{EditRecordId, MessageId};
pub use models::*;
