//! Coaching chat log.
//!
//! The log is append-only for the lifetime of the process and at most one
//! coach request is in flight at a time.

use parking_lot::Mutex;
use serde::Serialize;

use crate::clients::gemini::CoachReply;

pub const GREETING: &str = "Hello! I'm your AI Grandmaster coach. Ask me about your position, strategy, or for a move suggestion!";
pub const EMPTY_REPLY: &str = "I'm sorry, I couldn't generate a strategy at this moment.";
pub const ERROR_REPLY: &str = "Error communicating with the coach. Please try again.";
pub const SYSTEM_INSTRUCTION: &str = "You are a high-level chess grandmaster coach. Analyze the user position deeply. Use your thinking budget to evaluate tactical and strategic nuances. Provide clear, educational, and inspiring advice.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking: Option<String>,
}

impl ChatMessage {
    fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            thinking: None,
        }
    }

    fn model(content: impl Into<String>, thinking: Option<String>) -> Self {
        Self {
            role: Role::Model,
            content: content.into(),
            thinking,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatSnapshot {
    pub messages: Vec<ChatMessage>,
    pub loading: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ChatError {
    #[error("Message must not be empty")]
    EmptyMessage,
    #[error("The coach is still answering the previous message")]
    Busy,
}

struct ChatLog {
    messages: Vec<ChatMessage>,
    loading: bool,
}

pub struct CoachChat {
    log: Mutex<ChatLog>,
}

impl Default for CoachChat {
    fn default() -> Self {
        Self {
            log: Mutex::new(ChatLog {
                messages: vec![ChatMessage::model(GREETING, None)],
                loading: false,
            }),
        }
    }
}

impl CoachChat {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the user's message and mark the chat as loading. Returns the
    /// trimmed text to send to the coach.
    pub fn begin(&self, message: &str) -> Result<String, ChatError> {
        let text = message.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        let mut log = self.log.lock();
        if log.loading {
            return Err(ChatError::Busy);
        }
        log.messages.push(ChatMessage::user(text));
        log.loading = true;
        Ok(text.to_string())
    }

    /// Record the outcome of the in-flight request and clear the loading flag.
    pub fn finish(&self, outcome: Result<CoachReply, String>) {
        let reply = match outcome {
            Ok(reply) if reply.text.trim().is_empty() => {
                ChatMessage::model(EMPTY_REPLY, reply.thinking)
            }
            Ok(reply) => ChatMessage::model(reply.text, reply.thinking),
            Err(e) => {
                tracing::warn!("Coach request failed: {e}");
                ChatMessage::model(ERROR_REPLY, None)
            }
        };
        let mut log = self.log.lock();
        log.messages.push(reply);
        log.loading = false;
    }

    pub fn snapshot(&self) -> ChatSnapshot {
        let log = self.log.lock();
        ChatSnapshot {
            messages: log.messages.clone(),
            loading: log.loading,
        }
    }
}

/// Prompt for one coach request: the board as it stands and the user's text.
pub fn build_prompt(board_context: &str, message: &str) -> String {
    format!("Current Chess Game State:\n{board_context}\n\nUser Message: {message}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_core::{Game, MoveInput};

    #[test]
    fn starts_with_the_greeting() {
        let chat = CoachChat::new();
        let snap = chat.snapshot();
        assert!(!snap.loading);
        assert_eq!(snap.messages, vec![ChatMessage::model(GREETING, None)]);
    }

    #[test]
    fn blank_messages_are_rejected() {
        let chat = CoachChat::new();
        assert_eq!(chat.begin("   \n"), Err(ChatError::EmptyMessage));
        assert_eq!(chat.snapshot().messages.len(), 1);
    }

    #[test]
    fn second_send_is_refused_while_loading() {
        let chat = CoachChat::new();
        assert_eq!(chat.begin("  What now? ").unwrap(), "What now?");
        assert_eq!(chat.begin("And now?"), Err(ChatError::Busy));

        let snap = chat.snapshot();
        assert!(snap.loading);
        assert_eq!(snap.messages.last().unwrap(), &ChatMessage::user("What now?"));
    }

    #[test]
    fn reply_with_thinking_clears_loading() {
        let chat = CoachChat::new();
        chat.begin("Plan?").unwrap();
        chat.finish(Ok(CoachReply {
            text: "Castle early.".to_string(),
            thinking: Some("King safety first".to_string()),
        }));

        let snap = chat.snapshot();
        assert!(!snap.loading);
        let last = snap.messages.last().unwrap();
        assert_eq!(last.role, Role::Model);
        assert_eq!(last.content, "Castle early.");
        assert_eq!(last.thinking.as_deref(), Some("King safety first"));
    }

    #[test]
    fn empty_reply_and_failure_use_placeholders() {
        let chat = CoachChat::new();
        chat.begin("one").unwrap();
        chat.finish(Ok(CoachReply::default()));
        chat.begin("two").unwrap();
        chat.finish(Err("boom".to_string()));

        let snap = chat.snapshot();
        assert!(!snap.loading);
        let contents: Vec<_> = snap.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec![GREETING, "one", EMPTY_REPLY, "two", ERROR_REPLY]);
    }

    #[test]
    fn prompt_includes_board_and_message() {
        let mut game = Game::new();
        game.apply(&MoveInput::notation("e4")).unwrap();
        game.apply(&MoveInput::notation("e5")).unwrap();

        let prompt = build_prompt(&game.describe_for_prompt(), "Best plan?");
        assert_eq!(
            prompt,
            "Current Chess Game State:\n\
             FEN: rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2\n\
             History: e4, e5\n\
             Turn: White\n\n\
             User Message: Best plan?"
        );
    }
}
