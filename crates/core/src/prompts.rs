//! Prompt construction for the writing assistant and cover generation.
//!
//! The system prompt tells the model who it is, what the current story looks
//! like, and how to emit a command (see [`crate::chat_command`]).

use std::fmt::Write;

use crate::chat_command::{
    CMD_CREATE_CHAPTER, CMD_CREATE_CHARACTER, CMD_CREATE_DIALOGUE, CMD_CREATE_OUTLINE,
    CMD_CREATE_STORY, CMD_UPDATE_STORY,
};
use crate::types::DbId;

/// Number of most recent messages replayed to the model on each turn.
pub const HISTORY_WINDOW: usize = 20;

/// Maximum characters of a description/outline quoted into the prompt.
const EXCERPT_LEN: usize = 300;

const IDENTITY: &str = "You are ChatStory, a creative writing assistant that helps authors \
plan and write stories. Reply in the language the user writes in (Vietnamese by default). \
Be concise, concrete and encouraging. Never invent story ids: use only the ids listed below.";

// ---------------------------------------------------------------------------
// Story context
// ---------------------------------------------------------------------------

/// Snapshot of a story handed to the assistant as context.
#[derive(Debug, Clone, Default)]
pub struct StoryContext {
    pub id: DbId,
    pub title: String,
    pub genre: Option<String>,
    pub description: Option<String>,
    pub status: String,
    pub characters: Vec<CharacterSummary>,
    pub outlines: Vec<OutlineSummary>,
    pub chapters: Vec<ChapterSummary>,
}

#[derive(Debug, Clone)]
pub struct CharacterSummary {
    pub id: DbId,
    pub name: String,
    pub role: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OutlineSummary {
    pub title: String,
    pub content: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ChapterSummary {
    pub id: DbId,
    pub title: String,
    pub status: String,
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// Build the full system prompt for a chat turn.
pub fn build_system_prompt(story: Option<&StoryContext>) -> String {
    let mut prompt = String::with_capacity(2048);
    prompt.push_str(IDENTITY);
    prompt.push_str("\n\n");

    match story {
        Some(story) => prompt.push_str(&describe_story(story)),
        None => prompt.push_str(
            "## Current story\nNo story is selected. Help the user brainstorm, and offer \
             to create a story when the idea is clear.\n",
        ),
    }
    prompt.push('\n');
    prompt.push_str(&command_instructions());
    prompt
}

fn describe_story(story: &StoryContext) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "## Current story (id {})", story.id);
    let _ = writeln!(out, "Title: {}", story.title);
    let _ = writeln!(out, "Status: {}", story.status);
    if let Some(genre) = &story.genre {
        let _ = writeln!(out, "Genre: {genre}");
    }
    if let Some(description) = story.description.as_deref().filter(|d| !d.is_empty()) {
        let _ = writeln!(out, "Description: {}", excerpt(description));
    }

    if !story.characters.is_empty() {
        out.push_str("\n### Characters\n");
        for c in &story.characters {
            let _ = write!(out, "- [{}] {} ({})", c.id, c.name, c.role);
            if let Some(d) = c.description.as_deref().filter(|d| !d.is_empty()) {
                let _ = write!(out, ": {}", excerpt(d));
            }
            out.push('\n');
        }
    }

    if !story.outlines.is_empty() {
        out.push_str("\n### Outline\n");
        for (i, o) in story.outlines.iter().enumerate() {
            let _ = write!(out, "{}. {}", i + 1, o.title);
            if let Some(content) = o.content.as_deref().filter(|c| !c.is_empty()) {
                let _ = write!(out, " - {}", excerpt(content));
            }
            out.push('\n');
        }
    }

    if !story.chapters.is_empty() {
        out.push_str("\n### Chapters\n");
        for ch in &story.chapters {
            let _ = writeln!(out, "- [{}] {} ({})", ch.id, ch.title, ch.status);
        }
    }
    out
}

/// Instructions describing the slash-command convention.
pub fn command_instructions() -> String {
    format!(
        "## Commands\n\
         When the user asks you to create or change something, finish your reply with \
         exactly one command line: a slash command followed by a single JSON object, and \
         nothing after it. Available commands:\n\
         /{CMD_CREATE_STORY} {{\"title\": string, \"description\"?: string, \"genre\"?: string}}\n\
         /{CMD_UPDATE_STORY} {{\"story_id\"?: number, \"title\"?: string, \"description\"?: string, \"genre\"?: string}}\n\
         /{CMD_CREATE_CHAPTER} {{\"story_id\"?: number, \"title\": string, \"summary\"?: string}}\n\
         /{CMD_CREATE_OUTLINE} {{\"story_id\"?: number, \"title\": string, \"content\"?: string}}\n\
         /{CMD_CREATE_CHARACTER} {{\"story_id\"?: number, \"name\": string, \"role\"?: \"main\"|\"supporting\", \
         \"description\"?: string, \"gender\"?: string, \"personality\"?: string, \"appearance\"?: string, \
         \"background\"?: string}}\n\
         /{CMD_CREATE_DIALOGUE} {{\"chapter_id\": number, \"character_name\"?: string, \
         \"kind\"?: \"dialogue\"|\"narration\", \"content\": string}}\n\
         Omit story_id to target the current story. Genres: {}.\n",
        crate::story::GENRES.join(", ")
    )
}

/// Build a cover-art prompt from story metadata.
pub fn cover_image_prompt(title: &str, description: Option<&str>, genre: Option<&str>) -> String {
    let mut prompt = format!("Book cover illustration for a story titled \"{title}\"");
    if let Some(genre) = genre {
        let _ = write!(prompt, ", {genre} genre");
    }
    if let Some(description) = description.filter(|d| !d.trim().is_empty()) {
        let _ = write!(prompt, ". Story: {}", excerpt(description));
    }
    prompt.push_str(". Vivid colours, cinematic lighting, no text or lettering.");
    prompt
}

/// Truncate to [`EXCERPT_LEN`] characters, appending an ellipsis when cut.
fn excerpt(text: &str) -> String {
    let text = text.trim();
    if text.chars().count() <= EXCERPT_LEN {
        return text.to_string();
    }
    let cut: String = text.chars().take(EXCERPT_LEN).collect();
    format!("{cut}…")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_story() -> StoryContext {
        StoryContext {
            id: 42,
            title: "Hoa nở mùa đông".into(),
            genre: Some("romance".into()),
            description: Some("Hai người gặp nhau ở Đà Lạt.".into()),
            status: "draft".into(),
            characters: vec![CharacterSummary {
                id: 5,
                name: "Minh".into(),
                role: "main".into(),
                description: Some("Nhiếp ảnh gia".into()),
            }],
            outlines: vec![OutlineSummary {
                title: "Gặp gỡ".into(),
                content: None,
            }],
            chapters: vec![ChapterSummary {
                id: 9,
                title: "Chương 1".into(),
                status: "published".into(),
            }],
        }
    }

    #[test]
    fn prompt_without_story_mentions_no_selection() {
        let prompt = build_system_prompt(None);
        assert!(prompt.contains("No story is selected"));
        assert!(prompt.contains("/create-story"));
    }

    #[test]
    fn prompt_lists_story_entities_with_ids() {
        let prompt = build_system_prompt(Some(&sample_story()));
        assert!(prompt.contains("Current story (id 42)"));
        assert!(prompt.contains("[5] Minh (main): Nhiếp ảnh gia"));
        assert!(prompt.contains("1. Gặp gỡ"));
        assert!(prompt.contains("[9] Chương 1 (published)"));
    }

    #[test]
    fn command_catalogue_covers_every_command() {
        let text = command_instructions();
        for name in crate::chat_command::COMMAND_NAMES {
            assert!(text.contains(&format!("/{name} ")), "missing {name}");
        }
    }

    #[test]
    fn long_descriptions_are_excerpted() {
        let mut story = sample_story();
        story.description = Some("x".repeat(1000));
        let prompt = build_system_prompt(Some(&story));
        assert!(prompt.contains('…'));
        assert!(!prompt.contains(&"x".repeat(301)));
    }

    #[test]
    fn cover_prompt_includes_metadata() {
        let prompt = cover_image_prompt("Bóng đêm", Some("Một ngôi làng bị nguyền"), Some("horror"));
        assert!(prompt.contains("\"Bóng đêm\""));
        assert!(prompt.contains("horror genre"));
        assert!(prompt.contains("ngôi làng"));
        assert!(prompt.ends_with("no text or lettering."));
    }
}
