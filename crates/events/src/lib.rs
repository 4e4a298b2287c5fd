//! ChatStory event bus and notification delivery.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`StoryEvent`]: the domain event envelope (comments, favourites,
//!   chapter releases, badges).
//! - [`delivery`]: outbound channels (SMTP email).

pub mod bus;
pub mod delivery;

pub use bus::{EventBus, StoryEvent};
pub use delivery::email::{EmailConfig, EmailDelivery, EmailError};
