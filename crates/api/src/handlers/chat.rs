//! AI-assisted authoring: chat sessions, assistant turns and execution of
//! the commands the assistant proposes.
//!
//! Commands are never executed automatically. A reply carries its parsed
//! [`ChatCommand`]; the client shows it to the author and posts it back to
//! `POST /chat/commands/execute` once confirmed. Execution goes through the
//! same shared mutations as the REST endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chatstory_cloud::ChatTurn;
use chatstory_core::chat_command::{parse_reply, ChatCommand};
use chatstory_core::error::CoreError;
use chatstory_core::prompts::{
    build_system_prompt, ChapterSummary, CharacterSummary, OutlineSummary, StoryContext,
    HISTORY_WINDOW,
};
use chatstory_core::story::{validate_max_len, validate_required, MAX_DIALOGUE_LEN, MAX_TITLE_LEN};
use chatstory_core::types::DbId;
use chatstory_db::models::chapter::{Chapter, CreateChapter};
use chatstory_db::models::character::{Character, CreateCharacter};
use chatstory_db::models::chat::{
    ChatMessage, ChatSession, CreateChatSession, ROLE_ASSISTANT, ROLE_USER,
};
use chatstory_db::models::dialogue::{CreateDialogue, Dialogue};
use chatstory_db::models::outline::{CreateOutline, Outline};
use chatstory_db::models::story::{CreateStory, Story, UpdateStory};
use chatstory_db::repositories::{
    ChapterRepo, CharacterRepo, ChatRepo, OutlineRepo, StoryRepo,
};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::handlers::chapters::create_chapter;
use crate::handlers::characters::create_character;
use crate::handlers::dialogues::create_dialogue;
use crate::handlers::outlines::create_outline;
use crate::handlers::stories::{create_story, update_owned_story};
use crate::handlers::{not_found, owned_chapter, owned_story};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

const DEFAULT_SESSION_TITLE: &str = "New conversation";

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

/// Both sides of one assistant turn.
#[derive(Debug, Serialize)]
pub struct ChatExchange {
    pub user_message: ChatMessage,
    pub assistant_message: ChatMessage,
}

/// Request body for `POST /chat/commands/execute`.
///
/// `command` is the `{command, payload}` object returned on the assistant
/// message, optionally edited by the author.
#[derive(Debug, Deserialize)]
pub struct ExecuteCommandRequest {
    /// Session whose story is the default target.
    pub session_id: Option<DbId>,
    pub command: ChatCommand,
}

/// Whatever the executed command created or changed.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum CommandOutput {
    Story(Story),
    Chapter(Chapter),
    Outline(Outline),
    Character(Character),
    Dialogue(Dialogue),
}

#[derive(Debug, Serialize)]
pub struct CommandResult {
    pub command: &'static str,
    pub result: CommandOutput,
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

async fn owned_session(state: &AppState, user_id: DbId, id: DbId) -> AppResult<ChatSession> {
    let session = ChatRepo::find_session(&state.pool, id)
        .await?
        .ok_or_else(|| not_found("ChatSession", id))?;
    if session.user_id != user_id {
        return Err(AppError::Core(CoreError::Forbidden(
            "You do not own this conversation".into(),
        )));
    }
    Ok(session)
}

/// POST /api/v1/chat/sessions
///
/// The title defaults to the story's title, or a generic one without story.
pub async fn create_session(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateChatSession>,
) -> AppResult<(StatusCode, Json<DataResponse<ChatSession>>)> {
    let story = match input.story_id {
        Some(story_id) => Some(owned_story(&state, auth_user.user_id, story_id).await?),
        None => None,
    };

    let title = match input.title.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        Some(title) => {
            validate_max_len("title", title, MAX_TITLE_LEN)?;
            title.to_string()
        }
        None => story
            .as_ref()
            .map_or_else(|| DEFAULT_SESSION_TITLE.to_string(), |s| s.title.clone()),
    };

    let session =
        ChatRepo::create_session(&state.pool, auth_user.user_id, input.story_id, &title).await?;
    tracing::debug!(session_id = session.id, story_id = ?session.story_id, "Chat session created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: session })))
}

/// GET /api/v1/chat/sessions
pub async fn list_sessions(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<ChatSession>>>> {
    let sessions = ChatRepo::list_sessions(&state.pool, auth_user.user_id).await?;
    Ok(Json(DataResponse { data: sessions }))
}

/// GET /api/v1/chat/sessions/{id}/messages
pub async fn list_messages(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<ChatMessage>>>> {
    owned_session(&state, auth_user.user_id, id).await?;
    let messages = ChatRepo::list_messages(&state.pool, id).await?;
    Ok(Json(DataResponse { data: messages }))
}

/// DELETE /api/v1/chat/sessions/{id}
pub async fn delete_session(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    owned_session(&state, auth_user.user_id, id).await?;
    if !ChatRepo::delete_session(&state.pool, id).await? {
        return Err(not_found("ChatSession", id));
    }
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Assistant turns
// ---------------------------------------------------------------------------

/// POST /api/v1/chat/sessions/{id}/messages
///
/// Persist the author's message, ask the model with the story context and
/// the recent history, and persist the reply with its parsed command.
pub async fn send_message(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<SendMessageRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<ChatExchange>>)> {
    validate_required("content", &input.content, MAX_DIALOGUE_LEN)?;
    let session = owned_session(&state, auth_user.user_id, id).await?;
    let ai = state.ai()?.clone();

    let user_message =
        ChatRepo::add_message(&state.pool, session.id, ROLE_USER, input.content.trim(), None)
            .await?;

    let context = match session.story_id {
        Some(story_id) => load_story_context(&state, story_id).await?,
        None => None,
    };
    let history = ChatRepo::recent_messages(&state.pool, session.id, HISTORY_WINDOW as i64).await?;

    let mut turns = Vec::with_capacity(history.len() + 1);
    turns.push(ChatTurn::system(build_system_prompt(context.as_ref())));
    turns.extend(history.iter().map(history_turn));

    let reply = ai.chat(&turns).await?;
    let parsed = parse_reply(&reply);
    let command = parsed
        .command
        .as_ref()
        .map(serde_json::to_value)
        .transpose()
        .map_err(|e| AppError::InternalError(format!("Command serialisation error: {e}")))?;

    tracing::info!(
        session_id = session.id,
        history = history.len(),
        command = parsed.command.as_ref().map(ChatCommand::name),
        "Assistant replied"
    );

    let assistant_message = ChatRepo::add_message(
        &state.pool,
        session.id,
        ROLE_ASSISTANT,
        &parsed.message,
        command.as_ref(),
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: ChatExchange {
                user_message,
                assistant_message,
            },
        }),
    ))
}

/// Snapshot of a story for the system prompt. `None` if it was deleted.
async fn load_story_context(state: &AppState, story_id: DbId) -> AppResult<Option<StoryContext>> {
    let Some(story) = StoryRepo::find_by_id(&state.pool, story_id).await? else {
        return Ok(None);
    };
    let characters = CharacterRepo::list_by_story(&state.pool, story_id).await?;
    let outlines = OutlineRepo::list_by_story(&state.pool, story_id).await?;
    let chapters = ChapterRepo::list_by_story(&state.pool, story_id).await?;

    Ok(Some(StoryContext {
        id: story.id,
        title: story.title,
        genre: story.genre,
        description: story.description,
        status: story.status,
        characters: characters
            .into_iter()
            .map(|c| CharacterSummary {
                id: c.id,
                name: c.name,
                role: c.role,
                description: c.description,
            })
            .collect(),
        outlines: outlines
            .into_iter()
            .map(|o| OutlineSummary {
                title: o.title,
                content: o.content,
            })
            .collect(),
        chapters: chapters
            .into_iter()
            .map(|ch| ChapterSummary {
                id: ch.id,
                title: ch.title,
                status: ch.status,
            })
            .collect(),
    }))
}

/// Replay a stored message to the model.
///
/// Assistant replies get their command line back so the model sees what it
/// proposed earlier.
fn history_turn(message: &ChatMessage) -> ChatTurn {
    if message.role != ROLE_ASSISTANT {
        return ChatTurn::user(message.content.clone());
    }
    match message.command.as_ref().and_then(command_line) {
        Some(line) if message.content.is_empty() => ChatTurn::assistant(line),
        Some(line) => ChatTurn::assistant(format!("{}\n{line}", message.content)),
        None => ChatTurn::assistant(message.content.clone()),
    }
}

/// Render a stored `{command, payload}` value as `/<command> <json>`.
fn command_line(value: &serde_json::Value) -> Option<String> {
    let name = value.get("command")?.as_str()?;
    let payload = value.get("payload")?;
    Some(format!("/{name} {payload}"))
}

// ---------------------------------------------------------------------------
// Command execution
// ---------------------------------------------------------------------------

/// POST /api/v1/chat/commands/execute
pub async fn execute_command(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<ExecuteCommandRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<CommandResult>>)> {
    let session_story = match input.session_id {
        Some(session_id) => {
            owned_session(&state, auth_user.user_id, session_id)
                .await?
                .story_id
        }
        None => None,
    };

    let name = input.command.name();
    let user_id = auth_user.user_id;
    let target = |story_id: Option<DbId>| {
        story_id.or(session_story).ok_or_else(|| {
            AppError::BadRequest(format!(
                "Command {name} needs a story_id or a conversation about a story"
            ))
        })
    };

    let result = match input.command {
        ChatCommand::CreateStory(p) => {
            let input = CreateStory {
                title: p.title,
                description: p.description,
                genre: p.genre,
            };
            CommandOutput::Story(create_story(&state, user_id, &input).await?)
        }
        ChatCommand::UpdateStory(p) => {
            let story_id = target(p.story_id)?;
            let input = UpdateStory {
                title: p.title,
                description: p.description,
                genre: p.genre,
            };
            CommandOutput::Story(update_owned_story(&state, user_id, story_id, &input).await?)
        }
        ChatCommand::CreateChapter(p) => {
            let story_id = target(p.story_id)?;
            let input = CreateChapter {
                title: p.title,
                summary: p.summary,
            };
            CommandOutput::Chapter(create_chapter(&state, user_id, story_id, &input).await?)
        }
        ChatCommand::CreateOutline(p) => {
            let story_id = target(p.story_id)?;
            let input = CreateOutline {
                title: p.title,
                content: p.content,
            };
            CommandOutput::Outline(create_outline(&state, user_id, story_id, &input).await?)
        }
        ChatCommand::CreateCharacter(p) => {
            let story_id = target(p.story_id)?;
            let input = CreateCharacter {
                name: p.name,
                role: p.role,
                description: p.description,
                gender: p.gender,
                personality: p.personality,
                appearance: p.appearance,
                background: p.background,
                avatar_url: None,
            };
            CommandOutput::Character(create_character(&state, user_id, story_id, &input).await?)
        }
        ChatCommand::CreateDialogue(p) => {
            let character_id = match (p.character_id, p.character_name.as_deref()) {
                (Some(id), _) => Some(id),
                (None, Some(name)) if !name.trim().is_empty() => {
                    let (story, _) = owned_chapter(&state, user_id, p.chapter_id).await?;
                    let character = CharacterRepo::find_by_name(&state.pool, story.id, name)
                        .await?
                        .ok_or_else(|| {
                            AppError::BadRequest(format!(
                                "No character named '{}' in this story",
                                name.trim()
                            ))
                        })?;
                    Some(character.id)
                }
                _ => None,
            };
            let input = CreateDialogue {
                character_id,
                kind: p.kind,
                content: p.content,
            };
            CommandOutput::Dialogue(create_dialogue(&state, user_id, p.chapter_id, &input).await?)
        }
    };

    tracing::info!(user_id, command = name, "Chat command executed");
    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: CommandResult {
                command: name,
                result,
            },
        }),
    ))
}

#[cfg(test)]
mod tests {
    use chatstory_core::chat_command::CreateChapterPayload;
    use chrono::Utc;

    use super::*;

    fn message(role: &str, content: &str, command: Option<serde_json::Value>) -> ChatMessage {
        ChatMessage {
            id: 1,
            session_id: 1,
            role: role.into(),
            content: content.into(),
            command,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn user_messages_replay_verbatim() {
        let turn = history_turn(&message(ROLE_USER, "Viết giúp mình chương 1", None));
        assert_eq!(turn, ChatTurn::user("Viết giúp mình chương 1"));
    }

    #[test]
    fn assistant_commands_are_reattached() {
        let command = ChatCommand::CreateChapter(CreateChapterPayload {
            story_id: Some(3),
            title: "Chương 1".into(),
            summary: None,
        });
        let value = serde_json::to_value(&command).unwrap();
        let turn = history_turn(&message(ROLE_ASSISTANT, "Đây là chương đầu.", Some(value)));

        assert_eq!(turn.role, "assistant");
        assert!(turn.content.starts_with("Đây là chương đầu.\n/create-chapter {"));
        // The replayed text parses back to the same command.
        assert_eq!(parse_reply(&turn.content).command, Some(command));
    }

    #[test]
    fn command_only_reply_replays_command_line() {
        let value = serde_json::json!({ "command": "create-story", "payload": { "title": "A" } });
        let turn = history_turn(&message(ROLE_ASSISTANT, "", Some(value)));
        assert_eq!(turn.content, r#"/create-story {"title":"A"}"#);
    }

    #[test]
    fn execute_request_accepts_echoed_command() {
        let body = serde_json::json!({
            "session_id": 4,
            "command": { "command": "create-outline", "payload": { "title": "Mở đầu" } }
        });
        let request: ExecuteCommandRequest = serde_json::from_value(body).unwrap();
        assert_eq!(request.session_id, Some(4));
        assert_eq!(request.command.name(), "create-outline");
    }
}
