use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Client-generated, stable identifier of a transcript message.
pub type MessageId = Uuid;

/// One entry in a conversation transcript.
///
/// `full_content` is fixed at construction. `displayed_content` is the prefix
/// currently rendered and only ever grows towards `full_content`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    full_content: String,
    displayed_content: String,
    revealing: bool,
    pub created_at: jiff::Timestamp,
}

/// Author of a transcript message. Synthesized error replies are `Assistant`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Role {
    User,
    Assistant,
}

impl Message {
    /// A user message, fully displayed from the start.
    pub fn user(content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            id: Uuid::new_v4(),
            role: Role::User,
            displayed_content: content.clone(),
            full_content: content,
            revealing: false,
            created_at: jiff::Timestamp::now(),
        }
    }

    /// An assistant message whose text has arrived but not yet been revealed.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::Assistant,
            full_content: content.into(),
            displayed_content: String::new(),
            revealing: true,
            created_at: jiff::Timestamp::now(),
        }
    }

    pub fn full_content(&self) -> &str {
        &self.full_content
    }

    pub fn displayed_content(&self) -> &str {
        &self.displayed_content
    }

    pub fn is_revealing(&self) -> bool {
        self.revealing
    }

    /// Extend the displayed prefix to `len` bytes of the full content.
    ///
    /// Returns `false` without touching the message when `len` would shrink
    /// the prefix, overrun the content, or split a character.
    pub fn reveal_to(&mut self, len: usize) -> bool {
        if !self.revealing
            || len <= self.displayed_content.len()
            || len > self.full_content.len()
            || !self.full_content.is_char_boundary(len)
        {
            return false;
        }
        self.displayed_content = self.full_content[..len].to_string();
        true
    }

    /// Snap the displayed prefix to the full content and stop revealing.
    ///
    /// Returns `true` only on the call that actually ends the reveal.
    pub fn finish_reveal(&mut self) -> bool {
        if !self.revealing {
            return false;
        }
        self.displayed_content = self.full_content.clone();
        self.revealing = false;
        true
    }
}
