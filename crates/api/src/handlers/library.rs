//! Public library: browsing and reading published stories.
//!
//! No authentication is required. Endpoints that accept [`OptionalAuth`]
//! add per-reader state (favourite, bookmark) when a valid credential is
//! presented.

use axum::extract::{Path, Query, State};
use axum::Json;
use chatstory_core::story::validate_genre;
use chatstory_core::types::DbId;
use chatstory_db::models::chapter::Chapter;
use chatstory_db::models::dialogue::DialogueWithCharacter;
use chatstory_db::models::story::{LibraryFilter, LibrarySort, LibraryStory};
use chatstory_db::repositories::{BookmarkRepo, ChapterRepo, DialogueRepo, FavoriteRepo, StoryRepo};
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::handlers::not_found;
use crate::middleware::auth::OptionalAuth;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// Query parameters for `GET /library/stories`.
#[derive(Debug, Default, Deserialize)]
pub struct LibraryParams {
    /// Case-insensitive title search.
    pub q: Option<String>,
    pub genre: Option<String>,
    #[serde(default)]
    pub sort: LibrarySort,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl LibraryParams {
    fn into_filter(self) -> LibraryFilter {
        let (limit, offset) = PaginationParams {
            limit: self.limit,
            offset: self.offset,
        }
        .resolve();
        LibraryFilter {
            search: self.q.map(|q| q.trim().to_string()).filter(|q| !q.is_empty()),
            genre: self.genre.filter(|g| !g.is_empty()),
            sort: self.sort,
            limit,
            offset,
        }
    }
}

/// Story detail as shown to readers.
#[derive(Debug, Serialize)]
pub struct LibraryStoryDetail {
    #[serde(flatten)]
    pub story: LibraryStory,
    pub chapters: Vec<Chapter>,
    pub is_favorited: bool,
    /// Last chapter the caller bookmarked, if any.
    pub bookmark_chapter_id: Option<DbId>,
}

/// A chapter opened for reading, with navigation to its neighbours.
#[derive(Debug, Serialize)]
pub struct ChapterReading {
    pub story_id: DbId,
    pub story_title: String,
    pub chapter: Chapter,
    pub dialogues: Vec<DialogueWithCharacter>,
    pub prev_chapter_id: Option<DbId>,
    pub next_chapter_id: Option<DbId>,
}

/// GET /api/v1/library/stories
pub async fn list_stories(
    State(state): State<AppState>,
    Query(params): Query<LibraryParams>,
) -> AppResult<Json<DataResponse<Vec<LibraryStory>>>> {
    if let Some(genre) = params.genre.as_deref().filter(|g| !g.is_empty()) {
        validate_genre(genre)?;
    }
    let filter = params.into_filter();
    let stories = StoryRepo::list_library(&state.pool, &filter).await?;
    Ok(Json(DataResponse { data: stories }))
}

/// GET /api/v1/library/stories/{id}
///
/// Counts a view and lists the published chapters in reading order.
pub async fn get_story(
    OptionalAuth(viewer): OptionalAuth,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<LibraryStoryDetail>>> {
    StoryRepo::increment_views(&state.pool, id).await?;
    let story = StoryRepo::find_published(&state.pool, id)
        .await?
        .ok_or_else(|| not_found("Story", id))?;
    let chapters = ChapterRepo::list_published_by_story(&state.pool, id).await?;

    let (is_favorited, bookmark_chapter_id) = match &viewer {
        Some(user) => {
            let favorited = FavoriteRepo::is_favorited(&state.pool, user.user_id, id).await?;
            let bookmark = BookmarkRepo::find(&state.pool, user.user_id, id).await?;
            (favorited, bookmark.and_then(|b| b.chapter_id))
        }
        None => (false, None),
    };

    Ok(Json(DataResponse {
        data: LibraryStoryDetail {
            story,
            chapters,
            is_favorited,
            bookmark_chapter_id,
        },
    }))
}

/// GET /api/v1/library/stories/{id}/chapters/{chapter_id}
pub async fn read_chapter(
    State(state): State<AppState>,
    Path((story_id, chapter_id)): Path<(DbId, DbId)>,
) -> AppResult<Json<DataResponse<ChapterReading>>> {
    let story = StoryRepo::find_published(&state.pool, story_id)
        .await?
        .ok_or_else(|| not_found("Story", story_id))?;
    let chapter = ChapterRepo::find_readable(&state.pool, story_id, chapter_id)
        .await?
        .ok_or_else(|| not_found("Chapter", chapter_id))?;

    let published = ChapterRepo::list_published_by_story(&state.pool, story_id).await?;
    let (prev_chapter_id, next_chapter_id) = neighbours(&published, chapter_id);
    let dialogues = DialogueRepo::list_by_chapter(&state.pool, chapter_id).await?;

    Ok(Json(DataResponse {
        data: ChapterReading {
            story_id,
            story_title: story.title,
            chapter,
            dialogues,
            prev_chapter_id,
            next_chapter_id,
        },
    }))
}

/// Ids of the chapters before and after `chapter_id` in reading order.
fn neighbours(chapters: &[Chapter], chapter_id: DbId) -> (Option<DbId>, Option<DbId>) {
    let Some(index) = chapters.iter().position(|c| c.id == chapter_id) else {
        return (None, None);
    };
    let prev = index.checked_sub(1).map(|i| chapters[i].id);
    let next = chapters.get(index + 1).map(|c| c.id);
    (prev, next)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn chapter(id: DbId, order: i32) -> Chapter {
        Chapter {
            id,
            story_id: 1,
            title: format!("Chapter {order}"),
            summary: None,
            status: "published".into(),
            chapter_order: order,
            publish_order: Some(order),
            published_at: Some(Utc::now()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn neighbours_in_reading_order() {
        let chapters = vec![chapter(10, 1), chapter(7, 2), chapter(12, 3)];
        assert_eq!(neighbours(&chapters, 10), (None, Some(7)));
        assert_eq!(neighbours(&chapters, 7), (Some(10), Some(12)));
        assert_eq!(neighbours(&chapters, 12), (Some(7), None));
        assert_eq!(neighbours(&chapters, 99), (None, None));
    }

    #[test]
    fn filter_trims_search_and_clamps_paging() {
        let params = LibraryParams {
            q: Some("  rồng  ".into()),
            genre: Some(String::new()),
            sort: LibrarySort::Popular,
            limit: Some(500),
            offset: None,
        };
        let filter = params.into_filter();
        assert_eq!(filter.search.as_deref(), Some("rồng"));
        assert_eq!(filter.genre, None);
        assert_eq!(filter.sort, LibrarySort::Popular);
        assert_eq!(filter.limit, 100);
        assert_eq!(filter.offset, 0);
    }
}
