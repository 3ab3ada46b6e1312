use serde::{Deserialize, Serialize};

use crate::models::{Message, MessageId};

/// Events pushed to a user's live stream connections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Event {
    /// A message was stored for one of the user's applications
    MessageCreate { message: Message },

    /// Messages were removed in one operation (single, per application, or all)
    MessageDelete { messages: Vec<Message> },
}

impl Event {
    pub fn created(message: Message) -> Self {
        Self::MessageCreate { message }
    }

    /// Builds a deletion event from the messages as they were before the delete.
    pub fn deleted(messages: Vec<Message>) -> Self {
        Self::MessageDelete { messages }
    }

    /// Short name used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MessageCreate { .. } => "message_create",
            Self::MessageDelete { .. } => "message_delete",
        }
    }

    /// Ids of every message the event refers to.
    pub fn message_ids(&self) -> Vec<MessageId> {
        match self {
            Self::MessageCreate { message } => vec![message.id],
            Self::MessageDelete { messages } => messages.iter().map(|m| m.id).collect(),
        }
    }
}
