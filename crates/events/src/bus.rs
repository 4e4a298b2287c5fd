//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub for [`StoryEvent`]s. Handlers
//! publish after their database writes commit; the notification router in
//! the API crate subscribes and turns events into notification rows.

use chatstory_core::types::{DbId, Timestamp};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

pub const STORY_COMMENTED: &str = "story.commented";
pub const STORY_FAVORITED: &str = "story.favorited";
pub const STORY_PUBLISHED: &str = "story.published";
pub const CHAPTER_PUBLISHED: &str = "chapter.published";
pub const BADGE_GRANTED: &str = "badge.granted";

// ---------------------------------------------------------------------------
// StoryEvent
// ---------------------------------------------------------------------------

/// A domain event that occurred on the platform.
///
/// Built with [`StoryEvent::new`] plus the `with_*` methods.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryEvent {
    /// Dot-separated event name, e.g. `"story.commented"`.
    pub event_type: String,

    /// Story the event concerns, if any.
    pub story_id: Option<DbId>,

    /// User who caused the event.
    pub actor_user_id: Option<DbId>,

    /// Event-specific data (titles, excerpts, ids).
    pub payload: serde_json::Value,

    pub timestamp: Timestamp,
}

impl StoryEvent {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            story_id: None,
            actor_user_id: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    pub fn with_story(mut self, story_id: DbId) -> Self {
        self.story_id = Some(story_id);
        self
    }

    pub fn with_actor(mut self, user_id: DbId) -> Self {
        self.actor_user_id = Some(user_id);
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    /// Read a string field from the payload.
    pub fn payload_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(|v| v.as_str())
    }

    /// Read an id field from the payload.
    pub fn payload_id(&self, key: &str) -> Option<DbId> {
        self.payload.get(key).and_then(|v| v.as_i64())
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// When the buffer is full the oldest un-consumed events are dropped and
/// slow receivers observe `RecvError::Lagged`.
pub struct EventBus {
    sender: broadcast::Sender<StoryEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// Without subscribers the event is dropped.
    pub fn publish(&self, event: StoryEvent) {
        tracing::debug!(event_type = %event.event_type, story_id = ?event.story_id, "Event published");
        // SendError only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoryEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_and_receive_single_subscriber() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.publish(
            StoryEvent::new(STORY_COMMENTED)
                .with_story(42)
                .with_actor(7)
                .with_payload(serde_json::json!({"story_title": "Bóng đêm", "comment_id": 9})),
        );

        let received = rx.recv().await.expect("should receive the event");
        assert_eq!(received.event_type, STORY_COMMENTED);
        assert_eq!(received.story_id, Some(42));
        assert_eq!(received.actor_user_id, Some(7));
        assert_eq!(received.payload_str("story_title"), Some("Bóng đêm"));
        assert_eq!(received.payload_id("comment_id"), Some(9));
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(StoryEvent::new(CHAPTER_PUBLISHED));

        assert_eq!(rx1.recv().await.unwrap().event_type, CHAPTER_PUBLISHED);
        assert_eq!(rx2.recv().await.unwrap().event_type, CHAPTER_PUBLISHED);
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::default();
        bus.publish(StoryEvent::new("orphan.event"));
    }

    #[test]
    fn missing_payload_fields_read_as_none() {
        let event = StoryEvent::new(STORY_FAVORITED);
        assert!(event.story_id.is_none());
        assert!(event.payload.is_object());
        assert!(event.payload_str("story_title").is_none());
        assert!(event.payload_id("chapter_id").is_none());
    }
}
