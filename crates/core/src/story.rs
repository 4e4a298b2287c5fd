//! Story-domain constants and validation rules.
//!
//! Covers stories, chapters, outlines, characters, dialogues and comments.
//! Handlers call these before touching the database so invalid input is
//! rejected with a 400 regardless of storage state.

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Status constants
// ---------------------------------------------------------------------------

pub const STORY_DRAFT: &str = "draft";
pub const STORY_PUBLISHED: &str = "published";
pub const STORY_ARCHIVED: &str = "archived";

/// All valid story statuses.
pub const STORY_STATUSES: &[&str] = &[STORY_DRAFT, STORY_PUBLISHED, STORY_ARCHIVED];

pub const CHAPTER_DRAFT: &str = "draft";
pub const CHAPTER_PUBLISHED: &str = "published";

// ---------------------------------------------------------------------------
// Genres
// ---------------------------------------------------------------------------

/// Genres a story may be filed under.
pub const GENRES: &[&str] = &[
    "fantasy",
    "romance",
    "mystery",
    "horror",
    "science-fiction",
    "adventure",
    "drama",
    "comedy",
    "historical",
    "slice-of-life",
    "action",
    "other",
];

// ---------------------------------------------------------------------------
// Characters / dialogues
// ---------------------------------------------------------------------------

pub const CHARACTER_MAIN: &str = "main";
pub const CHARACTER_SUPPORTING: &str = "supporting";

/// All valid character roles.
pub const CHARACTER_ROLES: &[&str] = &[CHARACTER_MAIN, CHARACTER_SUPPORTING];

pub const DIALOGUE_SPEECH: &str = "dialogue";
pub const DIALOGUE_NARRATION: &str = "narration";

/// All valid dialogue kinds.
pub const DIALOGUE_KINDS: &[&str] = &[DIALOGUE_SPEECH, DIALOGUE_NARRATION];

// ---------------------------------------------------------------------------
// Length limits
// ---------------------------------------------------------------------------

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_DESCRIPTION_LEN: usize = 5000;
pub const MAX_OUTLINE_LEN: usize = 20_000;
pub const MAX_DIALOGUE_LEN: usize = 10_000;
pub const MAX_COMMENT_LEN: usize = 2000;
pub const MAX_CHARACTER_FIELD_LEN: usize = 2000;

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a required, length-bounded text field.
///
/// Length is measured in characters, so Vietnamese diacritics count once.
pub fn validate_required(field: &str, value: &str, max: usize) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::Validation(format!("{field} must not be empty")));
    }
    validate_max_len(field, value, max)
}

/// Validate an optional field's maximum length.
pub fn validate_max_len(field: &str, value: &str, max: usize) -> Result<(), CoreError> {
    if value.chars().count() > max {
        return Err(CoreError::Validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}

/// Validate a story or chapter title.
pub fn validate_title(title: &str) -> Result<(), CoreError> {
    validate_required("title", title, MAX_TITLE_LEN)
}

/// Validate an optional description.
pub fn validate_description(description: Option<&str>) -> Result<(), CoreError> {
    match description {
        Some(d) => validate_max_len("description", d, MAX_DESCRIPTION_LEN),
        None => Ok(()),
    }
}

/// Validate a genre against [`GENRES`].
pub fn validate_genre(genre: &str) -> Result<(), CoreError> {
    validate_one_of("genre", genre, GENRES)
}

/// Validate a story status filter against [`STORY_STATUSES`].
pub fn validate_story_status(status: &str) -> Result<(), CoreError> {
    validate_one_of("status", status, STORY_STATUSES)
}

/// Validate a character role against [`CHARACTER_ROLES`].
pub fn validate_character_role(role: &str) -> Result<(), CoreError> {
    validate_one_of("role", role, CHARACTER_ROLES)
}

/// Validate a dialogue kind against [`DIALOGUE_KINDS`].
pub fn validate_dialogue_kind(kind: &str) -> Result<(), CoreError> {
    validate_one_of("kind", kind, DIALOGUE_KINDS)
}

/// Validate a comment body.
pub fn validate_comment(content: &str) -> Result<(), CoreError> {
    validate_required("content", content, MAX_COMMENT_LEN)
}

fn validate_one_of(field: &str, value: &str, allowed: &[&str]) -> Result<(), CoreError> {
    if !allowed.contains(&value) {
        return Err(CoreError::Validation(format!(
            "Invalid {field} '{value}'. Valid values: {}",
            allowed.join(", ")
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Lifecycle rules
// ---------------------------------------------------------------------------

/// Check that a story in `status` may be published.
///
/// Drafts and archived stories may be (re)published; an already published
/// story is a conflict.
pub fn ensure_story_publishable(status: &str) -> Result<(), CoreError> {
    if status == STORY_PUBLISHED {
        return Err(CoreError::Conflict("Story is already published".into()));
    }
    Ok(())
}

/// Check that a story in `status` may be unpublished.
pub fn ensure_story_unpublishable(status: &str) -> Result<(), CoreError> {
    if status != STORY_PUBLISHED {
        return Err(CoreError::Conflict("Story is not published".into()));
    }
    Ok(())
}

/// Check that a chapter in `status` may be published.
pub fn ensure_chapter_publishable(status: &str) -> Result<(), CoreError> {
    if status == CHAPTER_PUBLISHED {
        return Err(CoreError::Conflict("Chapter is already published".into()));
    }
    Ok(())
}

/// Readers only see published chapters of published stories.
pub fn is_publicly_readable(story_status: &str, chapter_status: &str) -> bool {
    story_status == STORY_PUBLISHED && chapter_status == CHAPTER_PUBLISHED
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn title_rules() {
        assert!(validate_title("Chuyện tình mùa thu").is_ok());
        assert_matches!(validate_title("  "), Err(CoreError::Validation(_)));
        assert!(validate_title(&"a".repeat(MAX_TITLE_LEN)).is_ok());
        assert!(validate_title(&"a".repeat(MAX_TITLE_LEN + 1)).is_err());
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        // 200 multi-byte characters are still within the limit.
        let title = "ệ".repeat(MAX_TITLE_LEN);
        assert!(title.len() > MAX_TITLE_LEN);
        assert!(validate_title(&title).is_ok());
    }

    #[test]
    fn genre_must_be_known() {
        assert!(validate_genre("fantasy").is_ok());
        let err = validate_genre("cooking").unwrap_err();
        assert!(err.to_string().contains("Invalid genre"));
    }

    #[test]
    fn character_and_dialogue_enums() {
        assert!(validate_character_role(CHARACTER_MAIN).is_ok());
        assert!(validate_character_role("villain").is_err());
        assert!(validate_dialogue_kind(DIALOGUE_NARRATION).is_ok());
        assert!(validate_dialogue_kind("monologue").is_err());
    }

    #[test]
    fn description_is_optional() {
        assert!(validate_description(None).is_ok());
        assert!(validate_description(Some("")).is_ok());
        assert!(validate_description(Some(&"x".repeat(MAX_DESCRIPTION_LEN + 1))).is_err());
    }

    #[test]
    fn publish_transitions() {
        assert!(ensure_story_publishable(STORY_DRAFT).is_ok());
        assert!(ensure_story_publishable(STORY_ARCHIVED).is_ok());
        assert_matches!(
            ensure_story_publishable(STORY_PUBLISHED),
            Err(CoreError::Conflict(_))
        );
        assert!(ensure_story_unpublishable(STORY_PUBLISHED).is_ok());
        assert!(ensure_story_unpublishable(STORY_DRAFT).is_err());
        assert!(ensure_chapter_publishable(CHAPTER_DRAFT).is_ok());
        assert!(ensure_chapter_publishable(CHAPTER_PUBLISHED).is_err());
    }

    #[test]
    fn readability_requires_both_published() {
        assert!(is_publicly_readable(STORY_PUBLISHED, CHAPTER_PUBLISHED));
        assert!(!is_publicly_readable(STORY_DRAFT, CHAPTER_PUBLISHED));
        assert!(!is_publicly_readable(STORY_PUBLISHED, CHAPTER_DRAFT));
        assert!(!is_publicly_readable(STORY_ARCHIVED, CHAPTER_PUBLISHED));
    }

    #[test]
    fn comment_rules() {
        assert!(validate_comment("Hay quá!").is_ok());
        assert!(validate_comment("").is_err());
        assert!(validate_comment(&"c".repeat(MAX_COMMENT_LEN + 1)).is_err());
    }
}
