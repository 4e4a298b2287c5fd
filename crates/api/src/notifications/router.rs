//! Event-to-notification routing engine.
//!
//! [`NotificationRouter`] subscribes to the story event bus and, for each
//! event, stores an in-app notification for every affected user. Users with
//! `email_notifications` enabled also get an email when SMTP is configured.

use std::sync::Arc;

use chatstory_core::types::DbId;
use chatstory_db::models::notification::{CreateNotification, NotificationRecipient};
use chatstory_db::repositories::{NotificationRepo, UserRepo};
use chatstory_db::DbPool;
use chatstory_events::bus::{
    BADGE_GRANTED, CHAPTER_PUBLISHED, STORY_COMMENTED, STORY_FAVORITED, STORY_PUBLISHED,
};
use chatstory_events::{EmailDelivery, StoryEvent};
use tokio::sync::broadcast;

/// Name used when the acting user cannot be resolved.
const SOMEONE: &str = "Someone";

/// Title and text of a notification, before it is addressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composed {
    pub title: String,
    pub message: String,
}

/// Routes story events to user notifications.
pub struct NotificationRouter {
    pool: DbPool,
    email: Option<Arc<EmailDelivery>>,
}

impl NotificationRouter {
    /// Create a new router. Without `email` only in-app notifications are written.
    pub fn new(pool: DbPool, email: Option<Arc<EmailDelivery>>) -> Self {
        Self { pool, email }
    }

    /// Run the main routing loop.
    ///
    /// The loop exits when the channel is closed (i.e. the
    /// [`EventBus`](chatstory_events::EventBus) is dropped).
    pub async fn run(self, mut receiver: broadcast::Receiver<StoryEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if let Err(e) = self.route_event(&event).await {
                        tracing::error!(
                            error = %e,
                            event_type = %event.event_type,
                            "Failed to route event"
                        );
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Notification router lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, notification router shutting down");
                    break;
                }
            }
        }
    }

    /// Route a single event to all affected users.
    async fn route_event(&self, event: &StoryEvent) -> Result<(), sqlx::Error> {
        let recipients = self.determine_recipients(event).await?;
        if recipients.is_empty() {
            return Ok(());
        }

        let actor_name = match event.actor_user_id {
            Some(id) => UserRepo::find_by_id(&self.pool, id).await?.map(|u| u.username),
            None => None,
        };
        let Some(composed) = compose(event, actor_name.as_deref()) else {
            tracing::debug!(event_type = %event.event_type, "No notification for event type");
            return Ok(());
        };

        for recipient in &recipients {
            self.deliver(recipient, event, &composed).await?;
        }

        tracing::debug!(
            event_type = %event.event_type,
            recipients = recipients.len(),
            "Event routed"
        );
        Ok(())
    }

    /// Store the notification and email it when the user opted in.
    async fn deliver(
        &self,
        recipient: &NotificationRecipient,
        event: &StoryEvent,
        composed: &Composed,
    ) -> Result<(), sqlx::Error> {
        NotificationRepo::create(
            &self.pool,
            &CreateNotification {
                user_id: recipient.user_id,
                kind: event.event_type.clone(),
                title: composed.title.clone(),
                message: composed.message.clone(),
                story_id: event.story_id,
            },
        )
        .await?;

        if !recipient.email_notifications {
            return Ok(());
        }
        if let Some(email) = &self.email {
            if let Err(e) = email
                .send_notification(&recipient.email, &composed.title, &composed.message)
                .await
            {
                tracing::warn!(
                    error = %e,
                    user_id = recipient.user_id,
                    "Failed to email notification"
                );
            }
        }
        Ok(())
    }

    /// Determine which users should receive a notification for the event.
    async fn determine_recipients(
        &self,
        event: &StoryEvent,
    ) -> Result<Vec<NotificationRecipient>, sqlx::Error> {
        match event.event_type.as_str() {
            // Interactions: notify the story owner, unless they acted themselves.
            STORY_COMMENTED | STORY_FAVORITED => {
                let Some(owner_id) = event.payload_id("owner_id") else {
                    return Ok(vec![]);
                };
                if event.actor_user_id == Some(owner_id) {
                    return Ok(vec![]);
                }
                self.single(owner_id).await
            }

            // Releases: notify readers who favourited or bookmarked the story.
            STORY_PUBLISHED | CHAPTER_PUBLISHED => match event.story_id {
                Some(story_id) => {
                    let author = event.actor_user_id.unwrap_or_default();
                    NotificationRepo::story_followers(&self.pool, story_id, author).await
                }
                None => Ok(vec![]),
            },

            // Badges: notify the new supporter.
            BADGE_GRANTED => match event.actor_user_id {
                Some(user_id) => self.single(user_id).await,
                None => Ok(vec![]),
            },

            _ => Ok(vec![]),
        }
    }

    async fn single(&self, user_id: DbId) -> Result<Vec<NotificationRecipient>, sqlx::Error> {
        Ok(NotificationRepo::find_recipient(&self.pool, user_id)
            .await?
            .into_iter()
            .collect())
    }
}

/// Build the notification text for an event. `None` for unknown event types.
pub fn compose(event: &StoryEvent, actor_name: Option<&str>) -> Option<Composed> {
    let actor = actor_name.unwrap_or(SOMEONE);
    let story = event.payload_str("story_title").unwrap_or("your story");

    let (title, message) = match event.event_type.as_str() {
        STORY_COMMENTED => (
            format!("New comment on \"{story}\""),
            match event.payload_str("excerpt") {
                Some(excerpt) => format!("{actor} commented: {excerpt}"),
                None => format!("{actor} commented on your story."),
            },
        ),
        STORY_FAVORITED => (
            format!("\"{story}\" has a new fan"),
            format!("{actor} added \"{story}\" to their favourites."),
        ),
        STORY_PUBLISHED => (
            format!("\"{story}\" is published"),
            format!("{actor} published \"{story}\". Start reading now."),
        ),
        CHAPTER_PUBLISHED => {
            let chapter = event.payload_str("chapter_title").unwrap_or("A new chapter");
            (
                format!("New chapter in \"{story}\""),
                format!("{chapter} is now available."),
            )
        }
        BADGE_GRANTED => (
            "Supporter badge granted".to_string(),
            "Thank you for supporting ChatStory! Your badge now shows next to your name."
                .to_string(),
        ),
        _ => return None,
    };

    Some(Composed { title, message })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_quotes_excerpt() {
        let event = StoryEvent::new(STORY_COMMENTED)
            .with_story(3)
            .with_actor(9)
            .with_payload(serde_json::json!({
                "story_title": "Bóng đêm",
                "owner_id": 1,
                "excerpt": "Hay quá!",
            }));
        let composed = compose(&event, Some("lan")).unwrap();
        assert_eq!(composed.title, "New comment on \"Bóng đêm\"");
        assert_eq!(composed.message, "lan commented: Hay quá!");
    }

    #[test]
    fn unknown_actor_is_someone() {
        let event = StoryEvent::new(STORY_FAVORITED)
            .with_payload(serde_json::json!({ "story_title": "Gió" }));
        let composed = compose(&event, None).unwrap();
        assert!(composed.message.starts_with("Someone added \"Gió\""));
    }

    #[test]
    fn chapter_release_names_chapter() {
        let event = StoryEvent::new(CHAPTER_PUBLISHED).with_payload(serde_json::json!({
            "story_title": "Gió",
            "chapter_id": 12,
            "chapter_title": "Chương 3",
        }));
        let composed = compose(&event, Some("author")).unwrap();
        assert_eq!(composed.title, "New chapter in \"Gió\"");
        assert_eq!(composed.message, "Chương 3 is now available.");
    }

    #[test]
    fn badge_needs_no_payload() {
        let event = StoryEvent::new(BADGE_GRANTED).with_actor(5);
        assert_eq!(
            compose(&event, Some("lan")).unwrap().title,
            "Supporter badge granted"
        );
    }

    #[test]
    fn unknown_event_types_are_ignored() {
        assert!(compose(&StoryEvent::new("story.viewed"), Some("lan")).is_none());
    }
}
