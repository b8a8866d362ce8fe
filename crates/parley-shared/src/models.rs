//! Domain entities held in the local chat cache.
//!
//! A [`Chat`] owns its messages and participant snapshots by value.
//! Entities refer to each other only through ids.

use chrono::{DateTime, Utc};

use crate::rules::RuleSet;
use crate::types::{ChatId, MessageId, ParticipantId};

// ---------------------------------------------------------------------------
// Participant
// ---------------------------------------------------------------------------

/// A member of a chat as seen from inside that chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    pub picture_url: Option<String>,
    /// When this participant joined the chat.
    pub joined_at: DateTime<Utc>,
    /// Last time the participant was seen online, if known.
    pub online_at: Option<DateTime<Utc>>,
    pub is_admin: bool,
    pub is_moderator: bool,
}

impl Participant {
    pub fn new(id: ParticipantId, name: impl Into<String>, joined_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name: name.into(),
            picture_url: None,
            joined_at,
            online_at: None,
            is_admin: false,
            is_moderator: false,
        }
    }

    pub fn admin(mut self) -> Self {
        self.is_admin = true;
        self
    }

    pub fn moderator(mut self) -> Self {
        self.is_moderator = true;
        self
    }

    pub fn is_privileged(&self) -> bool {
        self.is_admin || self.is_moderator
    }
}

// ---------------------------------------------------------------------------
// Delivery status
// ---------------------------------------------------------------------------

/// Why an outgoing message could not be delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryFailure {
    NetworkUnavailable,
    ServerUnreachable,
    MessageTooLarge,
    MessageExpired,
    RecipientBlocked,
    RecipientNotFound,
    RateLimitExceeded,
    Unknown(String),
}

/// Lifecycle stage of an outgoing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryStatus {
    /// Upload in progress, 0..=100.
    Sending(u8),
    Sent,
    Delivered,
    Read,
    Failed(DeliveryFailure),
}

impl DeliveryStatus {
    /// Short name of the variant, without payload.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Sending(_) => "Sending",
            Self::Sent => "Sent",
            Self::Delivered => "Delivered",
            Self::Read => "Read",
            Self::Failed(_) => "Failed",
        }
    }
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sending(progress) => write!(f, "Sending({progress})"),
            Self::Failed(reason) => write!(f, "Failed({reason:?})"),
            other => f.write_str(other.kind()),
        }
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A text message addressed to a chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub parent_id: Option<MessageId>,
    /// Snapshot of the sender at the time the message was written.
    pub sender: Participant,
    pub recipient: ChatId,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub edited_at: Option<DateTime<Utc>>,
    pub delivery_status: Option<DeliveryStatus>,
    pub text: String,
}

impl Message {
    /// A fresh outgoing message with no delivery status yet.
    pub fn new(
        sender: Participant,
        recipient: ChatId,
        text: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MessageId::new(),
            parent_id: None,
            sender,
            recipient,
            created_at,
            sent_at: None,
            delivered_at: None,
            edited_at: None,
            delivery_status: None,
            text: text.into(),
        }
    }

    pub fn with_status(mut self, status: DeliveryStatus) -> Self {
        self.delivery_status = Some(status);
        self
    }
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

/// Outcome of a read-cursor move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadCursorMove {
    /// The cursor moved forward.
    Advanced,
    /// The cursor already pointed at this message; unread-count was refreshed.
    Unchanged,
    /// The target is older than the current cursor; nothing changed.
    Backward,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chat {
    pub id: ChatId,
    pub name: String,
    pub picture_url: Option<String>,
    pub participants: Vec<Participant>,
    pub rules: RuleSet,
    /// Chronological order, oldest first.
    pub messages: Vec<Message>,
    pub unread_messages_count: u32,
    pub last_read_message_id: Option<MessageId>,
    pub is_closed: bool,
    pub is_archived: bool,
    pub is_one_to_one: bool,
}

impl Chat {
    /// An empty chat, as submitted to `create_chat`.
    pub fn new(name: impl Into<String>, participants: Vec<Participant>, rules: RuleSet) -> Self {
        Self {
            id: ChatId::new(),
            name: name.into(),
            picture_url: None,
            participants,
            rules,
            messages: Vec::new(),
            unread_messages_count: 0,
            last_read_message_id: None,
            is_closed: false,
            is_archived: false,
            is_one_to_one: false,
        }
    }

    /// Build a chat from delta metadata plus its messages.
    pub fn from_metadata(id: ChatId, metadata: ChatMetadata, messages: Vec<Message>) -> Self {
        let mut chat = Self {
            id,
            name: String::new(),
            picture_url: None,
            participants: Vec::new(),
            rules: RuleSet::default(),
            messages,
            unread_messages_count: 0,
            last_read_message_id: None,
            is_closed: false,
            is_archived: false,
            is_one_to_one: false,
        };
        chat.apply_metadata(metadata);
        chat.sort_messages();
        chat
    }

    /// Replace every metadata field, leaving messages untouched.
    pub fn apply_metadata(&mut self, metadata: ChatMetadata) {
        self.name = metadata.name;
        self.picture_url = metadata.picture_url;
        self.participants = metadata.participants;
        self.rules = metadata.rules;
        self.unread_messages_count = metadata.unread_messages_count;
        self.last_read_message_id = metadata.last_read_message_id;
        self.is_closed = metadata.is_closed;
        self.is_archived = metadata.is_archived;
        self.is_one_to_one = metadata.is_one_to_one;
    }

    pub fn participant(&self, id: ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == id)
    }

    pub fn message(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// The most recent message written by `participant`.
    pub fn last_message_by(&self, participant: ParticipantId) -> Option<&Message> {
        self.messages
            .iter()
            .filter(|m| m.sender.id == participant)
            .max_by_key(|m| m.created_at)
    }

    /// Insert a message or replace the one with the same id.
    ///
    /// Returns `true` if the id was new.
    pub fn upsert_message(&mut self, message: Message) -> bool {
        let inserted = match self.messages.iter_mut().find(|m| m.id == message.id) {
            Some(existing) => {
                *existing = message;
                false
            }
            None => {
                self.messages.push(message);
                true
            }
        };
        self.sort_messages();
        inserted
    }

    pub fn remove_message(&mut self, id: MessageId) -> bool {
        let before = self.messages.len();
        self.messages.retain(|m| m.id != id);
        let removed = self.messages.len() != before;
        if removed && self.last_read_message_id == Some(id) {
            self.last_read_message_id = None;
        }
        removed
    }

    /// Move the read cursor to `up_to`, never backward.
    ///
    /// Returns `None` if `up_to` is not a message of this chat. The
    /// unread-count becomes the number of messages strictly after `up_to`.
    pub fn mark_read_up_to(&mut self, up_to: MessageId) -> Option<ReadCursorMove> {
        let target = self.position(up_to)?;
        let current = self.last_read_message_id.and_then(|id| self.position(id));

        let outcome = match current {
            Some(current) if target < current => return Some(ReadCursorMove::Backward),
            Some(current) if target == current => ReadCursorMove::Unchanged,
            _ => ReadCursorMove::Advanced,
        };

        self.last_read_message_id = Some(up_to);
        self.unread_messages_count = (self.messages.len() - target - 1) as u32;
        Some(outcome)
    }

    fn position(&self, id: MessageId) -> Option<usize> {
        self.messages.iter().position(|m| m.id == id)
    }

    fn sort_messages(&mut self) {
        // stable: equal timestamps keep arrival order
        self.messages.sort_by_key(|m| m.created_at);
    }
}

// ---------------------------------------------------------------------------
// Metadata / preview
// ---------------------------------------------------------------------------

/// Everything about a chat except its messages. Always synced whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMetadata {
    pub name: String,
    pub picture_url: Option<String>,
    pub participants: Vec<Participant>,
    pub rules: RuleSet,
    pub unread_messages_count: u32,
    pub last_read_message_id: Option<MessageId>,
    pub last_activity_at: Option<DateTime<Utc>>,
    pub is_closed: bool,
    pub is_archived: bool,
    pub is_one_to_one: bool,
}

impl ChatMetadata {
    pub fn from_chat(chat: &Chat) -> Self {
        Self {
            name: chat.name.clone(),
            picture_url: chat.picture_url.clone(),
            participants: chat.participants.clone(),
            rules: chat.rules.clone(),
            unread_messages_count: chat.unread_messages_count,
            last_read_message_id: chat.last_read_message_id,
            last_activity_at: chat.last_message().map(|m| m.created_at),
            is_closed: chat.is_closed,
            is_archived: chat.is_archived,
            is_one_to_one: chat.is_one_to_one,
        }
    }
}

/// Row of the chat list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatPreview {
    pub id: ChatId,
    pub name: String,
    pub picture_url: Option<String>,
    pub participants: Vec<Participant>,
    pub rules: RuleSet,
    pub unread_messages_count: u32,
    pub last_read_message_id: Option<MessageId>,
    pub last_message: Option<Message>,
    pub last_activity_at: Option<DateTime<Utc>>,
}

impl From<&Chat> for ChatPreview {
    fn from(chat: &Chat) -> Self {
        let last_message = chat.last_message().cloned();
        Self {
            id: chat.id,
            name: chat.name.clone(),
            picture_url: chat.picture_url.clone(),
            participants: chat.participants.clone(),
            rules: chat.rules.clone(),
            unread_messages_count: chat.unread_messages_count,
            last_read_message_id: chat.last_read_message_id,
            last_activity_at: last_message.as_ref().map(|m| m.created_at),
            last_message,
        }
    }
}
