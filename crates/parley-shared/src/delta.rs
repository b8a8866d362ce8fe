use chrono::{DateTime, Utc};

use crate::models::{ChatMetadata, Message};
use crate::types::{ChatId, MessageId};

/// One timestamped change to one chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatDelta {
    Created {
        chat_id: ChatId,
        metadata: ChatMetadata,
        initial_messages: Vec<Message>,
        timestamp: DateTime<Utc>,
    },
    Updated {
        chat_id: ChatId,
        metadata: ChatMetadata,
        messages_to_add: Vec<Message>,
        messages_to_delete: Vec<MessageId>,
        timestamp: DateTime<Utc>,
    },
    Deleted {
        chat_id: ChatId,
        timestamp: DateTime<Utc>,
    },
}

impl ChatDelta {
    pub fn chat_id(&self) -> ChatId {
        match self {
            Self::Created { chat_id, .. }
            | Self::Updated { chat_id, .. }
            | Self::Deleted { chat_id, .. } => *chat_id,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::Created { timestamp, .. }
            | Self::Updated { timestamp, .. }
            | Self::Deleted { timestamp, .. } => *timestamp,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Created { .. } => "created",
            Self::Updated { .. } => "updated",
            Self::Deleted { .. } => "deleted",
        }
    }
}

/// A page of chat changes returned by the remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatListDelta {
    pub changes: Vec<ChatDelta>,
    /// `None` means the batch is a full resync.
    pub from_timestamp: Option<DateTime<Utc>>,
    pub to_timestamp: DateTime<Utc>,
    pub has_more_changes: bool,
}

impl ChatListDelta {
    pub fn is_full_resync(&self) -> bool {
        self.from_timestamp.is_none()
    }

    /// Changes in ascending timestamp order. Ties keep arrival order.
    pub fn ordered_changes(&self) -> Vec<&ChatDelta> {
        let mut changes: Vec<&ChatDelta> = self.changes.iter().collect();
        changes.sort_by_key(|d| d.timestamp());
        changes
    }
}
