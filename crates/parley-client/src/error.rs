use chrono::Duration;
use parley_shared::validation::{ChatValidationError, TextValidationError};
use parley_shared::{ChatId, DeliveryStatus, InvalidTransition, MessageId, RuleViolation};
use parley_store::{ApplyBatchError, LocalStorageError, StoreError};
use thiserror::Error;

/// Failures reported by a [`RemoteSource`](crate::remote::RemoteSource).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("Chat {0} not found on the server")]
    ChatNotFound(ChatId),

    #[error("Message {0} not found on the server")]
    MessageNotFound(MessageId),

    #[error("Invite link is invalid")]
    InvalidInviteLink,

    #[error("Invite link has expired")]
    ExpiredInviteLink,

    #[error("Chat is closed")]
    ChatClosed,

    #[error("Already a member of this chat")]
    AlreadyJoined,

    #[error("Chat is full")]
    ChatFull,

    #[error("User is blocked in this chat")]
    UserBlocked,

    #[error("Not a participant of this chat")]
    NotParticipant,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Network is not available")]
    NetworkUnavailable,

    #[error("Server is unreachable")]
    ServerUnreachable,

    #[error("Request timed out")]
    Timeout,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Cooldown active for another {0}")]
    CooldownActive(Duration),

    #[error("Unknown remote error: {0}")]
    Unknown(String),
}

/// The single error type surfaced by the coordinator.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Chat {0} not found")]
    ChatNotFound(ChatId),

    #[error("Message {0} not found")]
    MessageNotFound(MessageId),

    #[error("Rule violated: {0}")]
    Rule(#[from] RuleViolation),

    #[error("Invalid chat: {0}")]
    InvalidChat(#[from] ChatValidationError),

    #[error("Invalid message: {0}")]
    InvalidMessage(#[from] TextValidationError),

    #[error("Delivery status is already set to {0}")]
    DeliveryStatusAlreadySet(DeliveryStatus),

    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),

    #[error("Invite link is invalid")]
    InvalidInviteLink,

    #[error("Invite link has expired")]
    ExpiredInviteLink,

    #[error("Chat is closed")]
    ChatClosed,

    #[error("Already a member of this chat")]
    AlreadyJoined,

    #[error("Chat is full")]
    ChatFull,

    #[error("User is blocked in this chat")]
    UserBlocked,

    #[error("Not a participant of this chat")]
    NotParticipant,

    #[error("Sync failed: {0}")]
    Sync(#[from] ApplyBatchError),

    #[error("Remote error: {0}")]
    Remote(RemoteError),

    #[error("Local storage error: {0}")]
    Local(LocalStorageError),
}

impl ClientError {
    /// Network-level failure worth retrying later.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Remote(
                RemoteError::NetworkUnavailable
                    | RemoteError::ServerUnreachable
                    | RemoteError::Timeout
                    | RemoteError::RateLimitExceeded
                    | RemoteError::CooldownActive(_)
            ) | Self::Local(LocalStorageError::TemporarilyUnavailable)
        )
    }
}

impl From<RemoteError> for ClientError {
    fn from(e: RemoteError) -> Self {
        match e {
            RemoteError::ChatNotFound(id) => Self::ChatNotFound(id),
            RemoteError::MessageNotFound(id) => Self::MessageNotFound(id),
            RemoteError::InvalidInviteLink => Self::InvalidInviteLink,
            RemoteError::ExpiredInviteLink => Self::ExpiredInviteLink,
            RemoteError::ChatClosed => Self::ChatClosed,
            RemoteError::AlreadyJoined => Self::AlreadyJoined,
            RemoteError::ChatFull => Self::ChatFull,
            RemoteError::UserBlocked => Self::UserBlocked,
            RemoteError::NotParticipant => Self::NotParticipant,
            other => Self::Remote(other),
        }
    }
}

impl From<StoreError> for ClientError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::ChatNotFound(id) => Self::ChatNotFound(id),
            StoreError::MessageNotFound(id) => Self::MessageNotFound(id),
            other => Self::Local(other.kind()),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ClientError>;
