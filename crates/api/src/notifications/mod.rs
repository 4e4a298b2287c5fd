//! Notification routing infrastructure.
//!
//! The [`NotificationRouter`] subscribes to the event bus, writes in-app
//! notifications for the affected users and emails the ones who opted in.

pub mod router;

pub use router::NotificationRouter;
