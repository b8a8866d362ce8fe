//! Structural checks on chats and message text.

use thiserror::Error;

use crate::constants::MAX_TEXT_LENGTH;
use crate::models::Chat;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatValidationError {
    #[error("chat has no participants")]
    NoParticipants,
    #[error("chat name is blank")]
    EmptyName,
    #[error("new chat already has messages")]
    NonEmptyMessages,
    #[error("new chat has a non-zero unread count")]
    NonZeroUnreadCount,
    #[error("new chat already has a read cursor")]
    NonNullLastReadMessageId,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TextValidationError {
    #[error("text is empty")]
    Empty,
    #[error("text is {length} characters, limit is {max}")]
    TooLong { length: usize, max: usize },
}

pub fn validate_chat(chat: &Chat) -> Result<(), ChatValidationError> {
    if chat.participants.is_empty() {
        return Err(ChatValidationError::NoParticipants);
    }
    if chat.name.trim().is_empty() {
        return Err(ChatValidationError::EmptyName);
    }
    Ok(())
}

/// Stricter check for a chat that has not been created remotely yet.
pub fn validate_chat_on_creation(chat: &Chat) -> Result<(), ChatValidationError> {
    validate_chat(chat)?;
    if !chat.messages.is_empty() {
        return Err(ChatValidationError::NonEmptyMessages);
    }
    if chat.unread_messages_count != 0 {
        return Err(ChatValidationError::NonZeroUnreadCount);
    }
    if chat.last_read_message_id.is_some() {
        return Err(ChatValidationError::NonNullLastReadMessageId);
    }
    Ok(())
}

pub fn validate_text(text: &str) -> Result<(), TextValidationError> {
    if text.trim().is_empty() {
        return Err(TextValidationError::Empty);
    }
    let length = text.chars().count();
    if length > MAX_TEXT_LENGTH {
        return Err(TextValidationError::TooLong {
            length,
            max: MAX_TEXT_LENGTH,
        });
    }
    Ok(())
}
