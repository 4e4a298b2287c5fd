//! HTTP-level tests for cover and avatar uploads against an in-memory
//! storage provider.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::http::StatusCode;
use chatstory_cloud::{StorageError, StorageProvider, StoredFile};
use chatstory_db::repositories::{StoryRepo, UserRepo};
use common::{body_json, post_file_auth, post_json_auth, user_with_token};
use sqlx::PgPool;

const PNG: &[u8] = b"\x89PNG\r\n\x1a\nnot really a png";

/// Something that happens while a file is being uploaded.
enum DuringUpload {
    Nothing,
    DeleteStory(i64),
    ClosePool,
}

/// Hands out `file-1`, `file-2`, ... and remembers what was deleted.
struct MemoryStorage {
    pool: PgPool,
    during_upload: DuringUpload,
    uploads: AtomicUsize,
    deleted: Mutex<Vec<String>>,
}

impl MemoryStorage {
    fn new(pool: &PgPool, during_upload: DuringUpload) -> Arc<Self> {
        Arc::new(Self {
            pool: pool.clone(),
            during_upload,
            uploads: AtomicUsize::new(0),
            deleted: Mutex::new(Vec::new()),
        })
    }

    fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl StorageProvider for MemoryStorage {
    async fn upload(
        &self,
        name: &str,
        _content_type: &str,
        _bytes: Vec<u8>,
    ) -> Result<StoredFile, StorageError> {
        let n = self.uploads.fetch_add(1, Ordering::SeqCst) + 1;
        match self.during_upload {
            DuringUpload::Nothing => {}
            DuringUpload::DeleteStory(id) => {
                StoryRepo::delete(&self.pool, id).await.unwrap();
            }
            DuringUpload::ClosePool => self.pool.close().await,
        }
        Ok(StoredFile {
            file_id: format!("file-{n}"),
            url: format!("https://files.example.com/{name}"),
        })
    }

    async fn delete(&self, file_id: &str) -> Result<(), StorageError> {
        self.deleted.lock().unwrap().push(file_id.to_string());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

async fn create_story(pool: &PgPool, token: &str) -> i64 {
    let app = common::build_test_app(pool.clone());
    let response = post_json_auth(
        app,
        "/api/v1/stories",
        serde_json::json!({ "title": "Covered" }),
        token,
    )
    .await;
    body_json(response).await["data"]["id"].as_i64().unwrap()
}

#[sqlx::test(migrations = "../db/migrations")]
async fn replacing_a_cover_deletes_the_old_file(pool: PgPool) {
    let (_, token) = user_with_token(&pool, "author").await;
    let story_id = create_story(&pool, &token).await;
    let storage = MemoryStorage::new(&pool, DuringUpload::Nothing);
    let uri = format!("/api/v1/stories/{story_id}/cover");

    let app = common::build_app_with_storage(pool.clone(), storage.clone());
    let response = post_file_auth(app, &uri, "cover.png", "image/png", PNG, &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json["data"]["cover_url"]
        .as_str()
        .unwrap()
        .starts_with("https://files.example.com/cover-"));
    assert!(storage.deleted().is_empty());

    let app = common::build_app_with_storage(pool.clone(), storage.clone());
    let response = post_file_auth(app, &uri, "cover.jpg", "image/jpeg", PNG, &token).await;
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(storage.deleted(), vec!["file-1".to_string()]);
    let story = StoryRepo::find_by_id(&pool, story_id).await.unwrap().unwrap();
    assert_eq!(story.cover_file_id.as_deref(), Some("file-2"));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn cover_for_a_story_deleted_mid_upload_is_discarded(pool: PgPool) {
    let (_, token) = user_with_token(&pool, "author").await;
    let story_id = create_story(&pool, &token).await;
    let storage = MemoryStorage::new(&pool, DuringUpload::DeleteStory(story_id));

    let app = common::build_app_with_storage(pool.clone(), storage.clone());
    let response = post_file_auth(
        app,
        &format!("/api/v1/stories/{story_id}/cover"),
        "cover.png",
        "image/png",
        PNG,
        &token,
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(storage.deleted(), vec!["file-1".to_string()]);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn avatar_is_discarded_when_it_cannot_be_saved(pool: PgPool) {
    let (_, token) = user_with_token(&pool, "face").await;
    let storage = MemoryStorage::new(&pool, DuringUpload::ClosePool);

    let app = common::build_app_with_storage(pool.clone(), storage.clone());
    let response =
        post_file_auth(app, "/api/v1/users/me/avatar", "me.png", "image/png", PNG, &token).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(storage.deleted(), vec!["file-1".to_string()]);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn new_avatar_replaces_the_old_file(pool: PgPool) {
    let (user_id, token) = user_with_token(&pool, "face").await;
    let storage = MemoryStorage::new(&pool, DuringUpload::Nothing);

    for _ in 0..2 {
        let app = common::build_app_with_storage(pool.clone(), storage.clone());
        let response =
            post_file_auth(app, "/api/v1/users/me/avatar", "me.png", "image/png", PNG, &token)
                .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    assert_eq!(storage.deleted(), vec!["file-1".to_string()]);
    let user = UserRepo::find_by_id(&pool, user_id).await.unwrap().unwrap();
    assert_eq!(user.avatar_file_id.as_deref(), Some("file-2"));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn non_image_upload_is_rejected_before_storage(pool: PgPool) {
    let (_, token) = user_with_token(&pool, "author").await;
    let story_id = create_story(&pool, &token).await;
    let storage = MemoryStorage::new(&pool, DuringUpload::Nothing);

    let app = common::build_app_with_storage(pool.clone(), storage.clone());
    let response = post_file_auth(
        app,
        &format!("/api/v1/stories/{story_id}/cover"),
        "notes.txt",
        "text/plain",
        b"hello",
        &token,
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(storage.uploads.load(Ordering::SeqCst), 0);
}
