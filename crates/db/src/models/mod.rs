//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` create DTO for inserts
//! - A `Deserialize` update DTO (all `Option` fields) for patches

pub mod api_key;
pub mod bookmark;
pub mod chapter;
pub mod character;
pub mod chat;
pub mod comment;
pub mod dialogue;
pub mod favorite;
pub mod notification;
pub mod outline;
pub mod payment;
pub mod session;
pub mod story;
pub mod user;
