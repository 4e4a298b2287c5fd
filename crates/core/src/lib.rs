//! Domain types and pure rules for the ChatStory platform.
//!
//! Nothing in this crate touches the database or the network, so it can be
//! shared by the repository layer, the HTTP server and the integration
//! clients alike.

pub mod api_keys;
pub mod chat_command;
pub mod error;
pub mod hashing;
pub mod pagination;
pub mod payment;
pub mod prompts;
pub mod roles;
pub mod story;
pub mod types;
