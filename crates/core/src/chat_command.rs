//! Slash-command convention used by the writing assistant.
//!
//! The assistant may finish a reply with a single command line such as
//!
//! ```text
//! /create-chapter {"title": "Chương 1: Khởi đầu", "summary": "..."}
//! ```
//!
//! The JSON object may sit on the command line itself or on the following
//! lines, optionally wrapped in a ```json fence. [`parse_reply`] splits such
//! a reply into the human-visible message and a typed [`ChatCommand`].
//! Anything that does not match exactly (unknown command, malformed JSON,
//! trailing prose after the JSON) leaves the reply untouched.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::types::DbId;

// ---------------------------------------------------------------------------
// Command names
// ---------------------------------------------------------------------------

pub const CMD_CREATE_STORY: &str = "create-story";
pub const CMD_UPDATE_STORY: &str = "update-story";
pub const CMD_CREATE_CHAPTER: &str = "create-chapter";
pub const CMD_CREATE_OUTLINE: &str = "create-outline";
pub const CMD_CREATE_CHARACTER: &str = "create-character";
pub const CMD_CREATE_DIALOGUE: &str = "create-dialogue";

/// Every command the assistant is allowed to emit.
pub const COMMAND_NAMES: &[&str] = &[
    CMD_CREATE_STORY,
    CMD_UPDATE_STORY,
    CMD_CREATE_CHAPTER,
    CMD_CREATE_OUTLINE,
    CMD_CREATE_CHARACTER,
    CMD_CREATE_DIALOGUE,
];

static COMMAND_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/([a-z][a-z-]*)\s*(.*)$").expect("valid regex"));

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateStoryPayload {
    pub title: String,
    pub description: Option<String>,
    pub genre: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateStoryPayload {
    /// Defaults to the chat session's story when omitted.
    pub story_id: Option<DbId>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub genre: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateChapterPayload {
    pub story_id: Option<DbId>,
    pub title: String,
    pub summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateOutlinePayload {
    pub story_id: Option<DbId>,
    pub title: String,
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateCharacterPayload {
    pub story_id: Option<DbId>,
    pub name: String,
    pub role: Option<String>,
    pub description: Option<String>,
    pub gender: Option<String>,
    pub personality: Option<String>,
    pub appearance: Option<String>,
    pub background: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateDialoguePayload {
    pub chapter_id: DbId,
    /// Speaking character; resolved by name when `character_id` is absent.
    pub character_id: Option<DbId>,
    pub character_name: Option<String>,
    pub kind: Option<String>,
    pub content: String,
}

/// A typed mutation request emitted by the assistant.
///
/// Serialised as `{"command": "create-story", "payload": {...}}` so clients
/// can echo it back to the execute endpoint unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", content = "payload", rename_all = "kebab-case")]
pub enum ChatCommand {
    CreateStory(CreateStoryPayload),
    UpdateStory(UpdateStoryPayload),
    CreateChapter(CreateChapterPayload),
    CreateOutline(CreateOutlinePayload),
    CreateCharacter(CreateCharacterPayload),
    CreateDialogue(CreateDialoguePayload),
}

impl ChatCommand {
    /// The slash-command name (without the leading `/`).
    pub fn name(&self) -> &'static str {
        match self {
            ChatCommand::CreateStory(_) => CMD_CREATE_STORY,
            ChatCommand::UpdateStory(_) => CMD_UPDATE_STORY,
            ChatCommand::CreateChapter(_) => CMD_CREATE_CHAPTER,
            ChatCommand::CreateOutline(_) => CMD_CREATE_OUTLINE,
            ChatCommand::CreateCharacter(_) => CMD_CREATE_CHARACTER,
            ChatCommand::CreateDialogue(_) => CMD_CREATE_DIALOGUE,
        }
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// An assistant reply split into its visible text and optional command.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedReply {
    /// Reply text with the command block removed.
    pub message: String,
    pub command: Option<ChatCommand>,
}

impl ParsedReply {
    fn plain(text: &str) -> Self {
        Self {
            message: text.trim().to_string(),
            command: None,
        }
    }
}

/// Split an assistant reply into visible text and a trailing command.
pub fn parse_reply(text: &str) -> ParsedReply {
    let lines: Vec<&str> = text.lines().collect();

    let Some((index, name, inline)) = find_command_line(&lines) else {
        return ParsedReply::plain(text);
    };

    let mut json_text = String::from(inline);
    for line in &lines[index + 1..] {
        json_text.push('\n');
        json_text.push_str(line);
    }

    let Some(command) = decode_command(name, &json_text) else {
        return ParsedReply::plain(text);
    };

    ParsedReply {
        message: without_open_fence(&lines[..index]).join("\n").trim().to_string(),
        command: Some(command),
    }
}

fn is_fence(line: &str) -> bool {
    line.trim_start().starts_with("```")
}

/// Drop a code fence that opens right before the command line.
///
/// An even number of fences means the last one closes an earlier block and
/// belongs to the message.
fn without_open_fence<'l, 's>(lines: &'l [&'s str]) -> &'l [&'s str] {
    let fences = lines.iter().filter(|line| is_fence(line)).count();
    match lines.split_last() {
        Some((last, rest)) if fences % 2 == 1 && is_fence(last) => rest,
        _ => lines,
    }
}

/// Locate the last line that starts with a known `/command`.
fn find_command_line<'a>(lines: &[&'a str]) -> Option<(usize, &'a str, &'a str)> {
    lines.iter().enumerate().rev().find_map(|(i, line)| {
        let caps = COMMAND_LINE_RE.captures(line.trim())?;
        let name = caps.get(1)?.as_str();
        if !COMMAND_NAMES.contains(&name) {
            return None;
        }
        let rest = caps.get(2).map_or("", |m| m.as_str());
        Some((i, name, rest))
    })
}

/// Decode the JSON body for `name`. The body must be exactly one JSON object.
fn decode_command(name: &str, body: &str) -> Option<ChatCommand> {
    let payload: serde_json::Value = serde_json::from_str(strip_fence(body)).ok()?;
    if !payload.is_object() {
        return None;
    }
    serde_json::from_value(serde_json::json!({ "command": name, "payload": payload })).ok()
}

/// Remove Markdown fence markers around the JSON body.
///
/// Either side may be missing: the opening fence can sit above the command
/// line, leaving only the closing one here.
fn strip_fence(body: &str) -> &str {
    let mut body = body.trim();
    if let Some(rest) = body.strip_prefix("```") {
        body = rest.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    }
    body.strip_suffix("```").unwrap_or(body).trim()
}
