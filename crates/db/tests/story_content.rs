//! Integration tests for story content ordering and story deletion.
//!
//! Exercises the repository layer against a real database:
//! - Global publish order across stories, kept through archive/republish
//! - Per-story chapter order and per-parent positions (MAX + 1)
//! - Deleting a story removes everything that hangs off it

use chatstory_db::models::chapter::CreateChapter;
use chatstory_db::models::character::CreateCharacter;
use chatstory_db::models::dialogue::CreateDialogue;
use chatstory_db::models::notification::CreateNotification;
use chatstory_db::models::outline::CreateOutline;
use chatstory_db::models::story::CreateStory;
use chatstory_db::models::user::CreateUser;
use chatstory_db::repositories::{
    BookmarkRepo, ChapterRepo, CharacterRepo, ChatRepo, CommentRepo, DialogueRepo, FavoriteRepo,
    NotificationRepo, OutlineRepo, StoryRepo, UserRepo,
};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn new_user(pool: &PgPool, username: &str) -> i64 {
    UserRepo::create(
        pool,
        &CreateUser {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password_hash: "not-a-real-hash".to_string(),
        },
    )
    .await
    .unwrap()
    .id
}

async fn new_story(pool: &PgPool, user_id: i64, title: &str) -> i64 {
    StoryRepo::create(
        pool,
        user_id,
        &CreateStory {
            title: title.to_string(),
            description: None,
            genre: None,
        },
    )
    .await
    .unwrap()
    .id
}

fn chapter(title: &str) -> CreateChapter {
    CreateChapter {
        title: title.to_string(),
        summary: None,
    }
}

fn narration(content: &str) -> CreateDialogue {
    CreateDialogue {
        character_id: None,
        kind: Some("narration".to_string()),
        content: content.to_string(),
    }
}

async fn count(pool: &PgPool, table: &str, story_id: i64) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table} WHERE story_id = $1"))
        .bind(story_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

// ---------------------------------------------------------------------------
// Publish order
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn publish_order_increases_across_stories(pool: PgPool) {
    let user = new_user(&pool, "author").await;
    let first = new_story(&pool, user, "First").await;
    let second = new_story(&pool, user, "Second").await;

    let a = StoryRepo::publish(&pool, second).await.unwrap().unwrap();
    let b = StoryRepo::publish(&pool, first).await.unwrap().unwrap();

    assert_eq!(a.status, "published");
    assert_eq!(a.publish_order, Some(1));
    assert_eq!(b.publish_order, Some(2));
    assert!(a.published_at.is_some());
}

#[sqlx::test(migrations = "./migrations")]
async fn publishing_twice_changes_nothing(pool: PgPool) {
    let user = new_user(&pool, "author").await;
    let story = new_story(&pool, user, "Once").await;

    StoryRepo::publish(&pool, story).await.unwrap().unwrap();
    assert!(StoryRepo::publish(&pool, story).await.unwrap().is_none());

    let stored = StoryRepo::find_by_id(&pool, story).await.unwrap().unwrap();
    assert_eq!(stored.publish_order, Some(1));
}

#[sqlx::test(migrations = "./migrations")]
async fn archived_story_keeps_its_order_when_republished(pool: PgPool) {
    let user = new_user(&pool, "author").await;
    let early = new_story(&pool, user, "Early").await;
    let late = new_story(&pool, user, "Late").await;

    StoryRepo::publish(&pool, early).await.unwrap().unwrap();
    StoryRepo::publish(&pool, late).await.unwrap().unwrap();

    let archived = StoryRepo::unpublish(&pool, early).await.unwrap().unwrap();
    assert_eq!(archived.status, "archived");
    assert_eq!(archived.publish_order, Some(1));

    let again = StoryRepo::publish(&pool, early).await.unwrap().unwrap();
    assert_eq!(again.status, "published");
    assert_eq!(again.publish_order, Some(1));
}

#[sqlx::test(migrations = "./migrations")]
async fn unpublishing_a_draft_is_refused(pool: PgPool) {
    let user = new_user(&pool, "author").await;
    let story = new_story(&pool, user, "Draft").await;

    assert!(StoryRepo::unpublish(&pool, story).await.unwrap().is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn publishing_a_missing_story_returns_none(pool: PgPool) {
    assert!(StoryRepo::publish(&pool, 999_999).await.unwrap().is_none());
}

// ---------------------------------------------------------------------------
// Chapter order and positions
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn chapter_order_is_per_story(pool: PgPool) {
    let user = new_user(&pool, "author").await;
    let one = new_story(&pool, user, "One").await;
    let two = new_story(&pool, user, "Two").await;

    let c1 = ChapterRepo::create(&pool, one, &chapter("1")).await.unwrap();
    let c2 = ChapterRepo::create(&pool, one, &chapter("2")).await.unwrap();
    let other = ChapterRepo::create(&pool, two, &chapter("1")).await.unwrap();

    assert_eq!(c1.chapter_order, 1);
    assert_eq!(c2.chapter_order, 2);
    assert_eq!(other.chapter_order, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn chapter_order_follows_the_highest_not_the_count(pool: PgPool) {
    let user = new_user(&pool, "author").await;
    let story = new_story(&pool, user, "Gaps").await;

    let first = ChapterRepo::create(&pool, story, &chapter("1")).await.unwrap();
    ChapterRepo::create(&pool, story, &chapter("2")).await.unwrap();
    ChapterRepo::create(&pool, story, &chapter("3")).await.unwrap();
    assert!(ChapterRepo::delete(&pool, first.id).await.unwrap());

    let next = ChapterRepo::create(&pool, story, &chapter("4")).await.unwrap();
    assert_eq!(next.chapter_order, 4);
}

#[sqlx::test(migrations = "./migrations")]
async fn outline_positions_append(pool: PgPool) {
    let user = new_user(&pool, "author").await;
    let story = new_story(&pool, user, "Plan").await;

    let mut positions = Vec::new();
    for title in ["Setup", "Conflict", "Resolution"] {
        let outline = OutlineRepo::create(
            &pool,
            story,
            &CreateOutline {
                title: title.to_string(),
                content: None,
            },
        )
        .await
        .unwrap();
        positions.push(outline.position);
    }

    assert_eq!(positions, vec![1, 2, 3]);
}

#[sqlx::test(migrations = "./migrations")]
async fn dialogue_positions_are_per_chapter(pool: PgPool) {
    let user = new_user(&pool, "author").await;
    let story = new_story(&pool, user, "Talk").await;
    let first = ChapterRepo::create(&pool, story, &chapter("1")).await.unwrap();
    let second = ChapterRepo::create(&pool, story, &chapter("2")).await.unwrap();

    let a = DialogueRepo::create(&pool, first.id, &narration("Night fell.")).await.unwrap();
    let b = DialogueRepo::create(&pool, first.id, &narration("Rain.")).await.unwrap();
    let c = DialogueRepo::create(&pool, second.id, &narration("Morning.")).await.unwrap();

    assert_eq!((a.position, b.position, c.position), (1, 2, 1));
    assert_eq!(a.kind, "narration");

    let listed = DialogueRepo::list_by_chapter(&pool, first.id).await.unwrap();
    let contents: Vec<_> = listed.iter().map(|d| d.content.as_str()).collect();
    assert_eq!(contents, vec!["Night fell.", "Rain."]);
}

// ---------------------------------------------------------------------------
// Deletion
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn deleting_a_story_removes_its_content(pool: PgPool) {
    let author = new_user(&pool, "author").await;
    let reader = new_user(&pool, "reader").await;
    let story = new_story(&pool, author, "Doomed").await;
    let keeper = new_story(&pool, author, "Keeper").await;

    let ch = ChapterRepo::create(&pool, story, &chapter("1")).await.unwrap();
    let kept_ch = ChapterRepo::create(&pool, keeper, &chapter("1")).await.unwrap();
    let hero = CharacterRepo::create(
        &pool,
        story,
        &CreateCharacter {
            name: "Lan".to_string(),
            role: Some("main".to_string()),
            description: None,
            gender: None,
            personality: None,
            appearance: None,
            background: None,
            avatar_url: None,
        },
    )
    .await
    .unwrap();
    DialogueRepo::create(
        &pool,
        ch.id,
        &CreateDialogue {
            character_id: Some(hero.id),
            kind: None,
            content: "Hello".to_string(),
        },
    )
    .await
    .unwrap();
    DialogueRepo::create(&pool, kept_ch.id, &narration("Still here.")).await.unwrap();
    OutlineRepo::create(
        &pool,
        story,
        &CreateOutline {
            title: "Arc".to_string(),
            content: None,
        },
    )
    .await
    .unwrap();
    StoryRepo::publish(&pool, story).await.unwrap().unwrap();
    CommentRepo::create(&pool, story, reader, "Nice").await.unwrap();
    assert!(FavoriteRepo::toggle(&pool, reader, story).await.unwrap());
    BookmarkRepo::upsert(&pool, reader, story, Some(ch.id)).await.unwrap();
    NotificationRepo::create(
        &pool,
        &CreateNotification {
            user_id: author,
            kind: "comment".to_string(),
            title: "New comment".to_string(),
            message: "reader commented".to_string(),
            story_id: Some(story),
        },
    )
    .await
    .unwrap();
    let chat = ChatRepo::create_session(&pool, author, Some(story), "Brainstorm").await.unwrap();

    assert!(StoryRepo::delete(&pool, story).await.unwrap());

    assert!(StoryRepo::find_by_id(&pool, story).await.unwrap().is_none());
    for table in [
        "chapters",
        "outlines",
        "characters",
        "comments",
        "favorites",
        "bookmarks",
        "notifications",
    ] {
        assert_eq!(count(&pool, table, story).await, 0, "{table} should be empty");
    }
    let orphan_dialogues: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM dialogues WHERE chapter_id = $1")
            .bind(ch.id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(orphan_dialogues, 0);

    // The chat survives without its story; the other story is untouched.
    let chat = ChatRepo::find_session(&pool, chat.id).await.unwrap().unwrap();
    assert_eq!(chat.story_id, None);
    assert_eq!(DialogueRepo::list_by_chapter(&pool, kept_ch.id).await.unwrap().len(), 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn deleting_a_missing_story_returns_false(pool: PgPool) {
    assert!(!StoryRepo::delete(&pool, 424_242).await.unwrap());
}
