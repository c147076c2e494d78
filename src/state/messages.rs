//! Conversation transcript: welcome turn, user and assistant turns, and the
//! transient "thinking" placeholder shown while a chat request is in flight.
//!
//! History from the server is hydrated into the same log. Only the primary
//! agent's assistant turns are kept.

use crate::api::types::HistoryTurn;

pub const WELCOME_MARKUP: &str =
    "<p>Hi! Tell me what you ate, send a photo of your meal, or ask me for a recipe.</p>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// Turn body: plain user text, or markup already rendered by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnBody {
    Text(String),
    Markup(String),
}

impl TurnBody {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text(s) | Self::Markup(s) => s,
        }
    }
}

/// Reference to media sent alongside a user turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentRef {
    pub file_name: String,
    pub mime: String,
}

/// A single chat turn. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub id: String,
    pub role: Role,
    pub body: TurnBody,
    pub attachment: Option<AttachmentRef>,
    /// Transient "thinking" placeholder; the only kind of turn that is ever
    /// removed individually.
    pub pending: bool,
}

/// Append-only conversation transcript.
///
/// The first turn is the welcome message; clearing history keeps it.
#[derive(Clone, Debug)]
pub struct MessageLog {
    turns: Vec<ChatTurn>,
}

impl Default for MessageLog {
    fn default() -> Self {
        Self::with_welcome(WELCOME_MARKUP)
    }
}

impl MessageLog {
    #[must_use]
    pub fn with_welcome(markup: &str) -> Self {
        let mut log = Self { turns: Vec::new() };
        log.push_assistant_markup(markup);
        log
    }

    #[must_use]
    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.turns.iter().any(|t| t.pending)
    }

    pub fn push_user(&mut self, text: &str, attachment: Option<AttachmentRef>) -> String {
        self.push(Role::User, TurnBody::Text(text.to_owned()), attachment, false)
    }

    pub fn push_assistant_markup(&mut self, markup: &str) -> String {
        self.push(Role::Assistant, TurnBody::Markup(markup.to_owned()), None, false)
    }

    pub fn push_assistant_text(&mut self, text: &str) -> String {
        self.push(Role::Assistant, TurnBody::Text(text.to_owned()), None, false)
    }

    pub fn push_pending(&mut self) -> String {
        self.push(Role::Assistant, TurnBody::Text("Thinking...".to_owned()), None, true)
    }

    /// Remove a pending turn by id. Non-pending turns are never removed.
    pub fn remove_pending(&mut self, id: &str) -> bool {
        let before = self.turns.len();
        self.turns.retain(|t| !(t.pending && t.id == id));
        before != self.turns.len()
    }

    /// Drop every turn except the welcome message.
    pub fn retain_welcome(&mut self) {
        self.turns.truncate(1);
    }

    /// Replace everything after the welcome message with server history.
    ///
    /// User turns are always shown. Assistant turns are shown only when they
    /// are attributed to `primary_agent`; internal agents stay hidden.
    pub fn hydrate(&mut self, history: &[HistoryTurn], primary_agent: &str) -> usize {
        self.retain_welcome();
        let mut shown = 0;
        for turn in history {
            let role = match turn.role.as_str() {
                "user" => Role::User,
                "assistant" if turn.name.as_deref() == Some(primary_agent) => Role::Assistant,
                _ => continue,
            };
            let body = match role {
                Role::User => TurnBody::Text(turn.content.clone()),
                Role::Assistant => TurnBody::Markup(turn.content.clone()),
            };
            self.push(role, body, None, false);
            shown += 1;
        }
        shown
    }

    fn push(&mut self, role: Role, body: TurnBody, attachment: Option<AttachmentRef>, pending: bool) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        self.turns.push(ChatTurn { id: id.clone(), role, body, attachment, pending });
        id
    }
}

#[cfg(test)]
#[path = "messages_test.rs"]
mod tests;
