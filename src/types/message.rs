use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Who authored a transcript entry.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// The person typing into the chat.
    User,

    /// The conversational backend, or the session speaking on its behalf.
    Bot,
}

/// One transcript entry.
///
/// Messages are immutable once created; the transcript only ever appends them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    text: String,
    sender: Sender,
    is_error: bool,
    #[serde(with = "crate::utils::time")]
    sent_at: OffsetDateTime,
}

impl Message {
    /// Create a new message stamped with the current time.
    pub fn new(text: impl Into<String>, sender: Sender, is_error: bool) -> Self {
        Self {
            text: text.into(),
            sender,
            is_error,
            sent_at: OffsetDateTime::now_utc(),
        }
    }

    /// Create a message typed by the user.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(text, Sender::User, false)
    }

    /// Create a genuine reply from the bot.
    pub fn bot(text: impl Into<String>) -> Self {
        Self::new(text, Sender::Bot, false)
    }

    /// Create a failure notice shown on the bot's side of the conversation.
    pub fn bot_error(text: impl Into<String>) -> Self {
        Self::new(text, Sender::Bot, true)
    }

    /// The content shown in the transcript.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Who authored the message.
    pub fn sender(&self) -> Sender {
        self.sender
    }

    /// True if this entry is a failure notice rather than a genuine reply.
    pub fn is_error(&self) -> bool {
        self.is_error
    }

    /// When the message entered the transcript.
    pub fn sent_at(&self) -> OffsetDateTime {
        self.sent_at
    }
}
