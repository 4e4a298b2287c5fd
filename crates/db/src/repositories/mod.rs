//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument. Multi-row writes open their own
//! transaction.

pub mod api_key_repo;
pub mod bookmark_repo;
pub mod chapter_repo;
pub mod character_repo;
pub mod chat_repo;
pub mod comment_repo;
pub mod dialogue_repo;
pub mod favorite_repo;
pub mod notification_repo;
pub mod outline_repo;
pub mod payment_repo;
pub mod session_repo;
pub mod story_repo;
pub mod user_repo;

pub use api_key_repo::ApiKeyRepo;
pub use bookmark_repo::BookmarkRepo;
pub use chapter_repo::ChapterRepo;
pub use character_repo::CharacterRepo;
pub use chat_repo::ChatRepo;
pub use comment_repo::CommentRepo;
pub use dialogue_repo::DialogueRepo;
pub use favorite_repo::FavoriteRepo;
pub use notification_repo::NotificationRepo;
pub use outline_repo::OutlineRepo;
pub use payment_repo::PaymentRepo;
pub use session_repo::SessionRepo;
pub use story_repo::StoryRepo;
pub use user_repo::UserRepo;
