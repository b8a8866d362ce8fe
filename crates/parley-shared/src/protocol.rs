//! JSON wire types exchanged with the remote, and their domain mappers.
//!
//! Timestamps travel as RFC 3339 strings and durations as whole
//! milliseconds. Decoding is fallible (`TryFrom`), encoding is not.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::delta::{ChatDelta, ChatListDelta};
use crate::error::ProtocolError;
use crate::models::{Chat, ChatMetadata, DeliveryFailure, DeliveryStatus, Message, Participant};
use crate::rules::{ChatDeleteRule, CreateRule, DeleteRule, EditRule, Rule, RuleSet};
use crate::types::{ChatId, DeleteMode, MessageId, ParticipantId};

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantDto {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub picture_url: Option<String>,
    pub joined_at: String,
    #[serde(default)]
    pub online_at: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub is_moderator: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RuleDto {
    #[serde(rename_all = "camelCase")]
    CanNotWriteAfterJoining { duration_millis: i64 },
    #[serde(rename_all = "camelCase")]
    Debounce { delay_millis: i64 },
    #[serde(rename_all = "camelCase")]
    EditWindow { duration_millis: i64 },
    SenderIdCanNotChange,
    RecipientCanNotChange,
    CreationTimeCanNotChange,
    #[serde(rename_all = "camelCase")]
    DeleteWindow { duration_millis: i64 },
    SenderCanDeleteOwn,
    AdminCanDeleteAny,
    ModeratorCanDeleteAny,
    NoDeleteAfterDelivered,
    #[serde(rename_all = "camelCase")]
    DeleteForEveryoneWindow { duration_millis: i64 },
    OnlyAdminCanDelete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DeliveryStatusDto {
    Sending { progress: i32 },
    Sent,
    Delivered,
    Read,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDto {
    pub id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    pub sender: ParticipantDto,
    pub recipient: String,
    pub created_at: String,
    #[serde(default)]
    pub sent_at: Option<String>,
    #[serde(default)]
    pub delivered_at: Option<String>,
    #[serde(default)]
    pub edited_at: Option<String>,
    #[serde(default)]
    pub delivery_status: Option<DeliveryStatusDto>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatDto {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub picture_url: Option<String>,
    #[serde(default)]
    pub messages: Vec<MessageDto>,
    #[serde(default)]
    pub participants: Vec<ParticipantDto>,
    #[serde(default)]
    pub rules: Vec<RuleDto>,
    #[serde(default)]
    pub unread_messages_count: u32,
    #[serde(default)]
    pub last_read_message_id: Option<String>,
    #[serde(default)]
    pub is_closed: bool,
    #[serde(default)]
    pub is_archived: bool,
    #[serde(default)]
    pub is_one_to_one: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMetadataDto {
    pub name: String,
    #[serde(default)]
    pub participants: Vec<ParticipantDto>,
    #[serde(default)]
    pub picture_url: Option<String>,
    #[serde(default)]
    pub rules: Vec<RuleDto>,
    #[serde(default)]
    pub unread_messages_count: u32,
    #[serde(default)]
    pub last_read_message_id: Option<String>,
    #[serde(default)]
    pub last_activity_at: Option<String>,
    #[serde(default)]
    pub is_closed: bool,
    #[serde(default)]
    pub is_archived: bool,
    #[serde(default)]
    pub is_one_to_one: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum ChatDeltaDto {
    Created {
        chat_id: String,
        chat_metadata: ChatMetadataDto,
        #[serde(default)]
        initial_messages: Vec<MessageDto>,
        timestamp: String,
    },
    Updated {
        chat_id: String,
        chat_metadata: ChatMetadataDto,
        #[serde(default)]
        messages_to_add: Vec<MessageDto>,
        #[serde(default)]
        messages_to_delete: Vec<String>,
        timestamp: String,
    },
    Deleted {
        chat_id: String,
        timestamp: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatListDeltaDto {
    pub changes: Vec<ChatDeltaDto>,
    #[serde(default)]
    pub from_timestamp: Option<String>,
    pub to_timestamp: String,
    #[serde(default)]
    pub has_more_changes: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteMessageRequestDto {
    pub message_id: String,
    pub delete_mode: DeleteMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkMessagesAsReadRequestDto {
    pub chat_id: String,
    pub up_to_message_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinChatRequestDto {
    #[serde(default)]
    pub invite_link: Option<String>,
}

// ---------------------------------------------------------------------------
// Scalars
// ---------------------------------------------------------------------------

/// RFC 3339 in UTC, with as many fractional digits as the value needs so
/// that decoding gives back the same instant.
pub fn encode_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

pub fn decode_timestamp(s: &str) -> Result<DateTime<Utc>, ProtocolError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| ProtocolError::InvalidTimestamp(s.to_string()))
}

fn decode_optional_timestamp(s: Option<&str>) -> Result<Option<DateTime<Utc>>, ProtocolError> {
    s.map(|s| decode_timestamp(s)).transpose()
}

/// Parse one of the two delete-mode literals.
pub fn decode_delete_mode(s: &str) -> Result<DeleteMode, ProtocolError> {
    DeleteMode::from_literal(s).ok_or_else(|| ProtocolError::UnknownLiteral {
        field: "deleteMode",
        value: s.to_string(),
    })
}

fn decode_uuid(s: &str) -> Result<uuid::Uuid, ProtocolError> {
    uuid::Uuid::parse_str(s).map_err(|e| ProtocolError::InvalidId {
        value: s.to_string(),
        reason: e.to_string(),
    })
}

fn decode_duration(field: &'static str, millis: i64) -> Result<Duration, ProtocolError> {
    if millis < 0 {
        return Err(ProtocolError::InvalidValue {
            field,
            reason: format!("negative duration {millis}ms"),
        });
    }
    Ok(Duration::milliseconds(millis))
}

// ---------------------------------------------------------------------------
// Participant
// ---------------------------------------------------------------------------

impl From<&Participant> for ParticipantDto {
    fn from(p: &Participant) -> Self {
        Self {
            id: p.id.to_string(),
            name: p.name.clone(),
            picture_url: p.picture_url.clone(),
            joined_at: encode_timestamp(p.joined_at),
            online_at: p.online_at.map(encode_timestamp),
            is_admin: p.is_admin,
            is_moderator: p.is_moderator,
        }
    }
}

impl TryFrom<&ParticipantDto> for Participant {
    type Error = ProtocolError;

    fn try_from(dto: &ParticipantDto) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ParticipantId(decode_uuid(&dto.id)?),
            name: dto.name.clone(),
            picture_url: dto.picture_url.clone(),
            joined_at: decode_timestamp(&dto.joined_at)?,
            online_at: decode_optional_timestamp(dto.online_at.as_deref())?,
            is_admin: dto.is_admin,
            is_moderator: dto.is_moderator,
        })
    }
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

impl From<&Rule> for RuleDto {
    fn from(rule: &Rule) -> Self {
        match *rule {
            Rule::Create(CreateRule::CanNotWriteAfterJoining(d)) => Self::CanNotWriteAfterJoining {
                duration_millis: d.num_milliseconds(),
            },
            Rule::Create(CreateRule::Debounce(d)) => Self::Debounce {
                delay_millis: d.num_milliseconds(),
            },
            Rule::Edit(EditRule::EditWindow(d)) => Self::EditWindow {
                duration_millis: d.num_milliseconds(),
            },
            Rule::Edit(EditRule::SenderIdCanNotChange) => Self::SenderIdCanNotChange,
            Rule::Edit(EditRule::RecipientCanNotChange) => Self::RecipientCanNotChange,
            Rule::Edit(EditRule::CreationTimeCanNotChange) => Self::CreationTimeCanNotChange,
            Rule::Delete(DeleteRule::DeleteWindow(d)) => Self::DeleteWindow {
                duration_millis: d.num_milliseconds(),
            },
            Rule::Delete(DeleteRule::SenderCanDeleteOwn) => Self::SenderCanDeleteOwn,
            Rule::Delete(DeleteRule::AdminCanDeleteAny) => Self::AdminCanDeleteAny,
            Rule::Delete(DeleteRule::ModeratorCanDeleteAny) => Self::ModeratorCanDeleteAny,
            Rule::Delete(DeleteRule::NoDeleteAfterDelivered) => Self::NoDeleteAfterDelivered,
            Rule::Delete(DeleteRule::DeleteForEveryoneWindow(d)) => {
                Self::DeleteForEveryoneWindow {
                    duration_millis: d.num_milliseconds(),
                }
            }
            Rule::ChatDelete(ChatDeleteRule::OnlyAdminCanDelete) => Self::OnlyAdminCanDelete,
        }
    }
}

impl TryFrom<&RuleDto> for Rule {
    type Error = ProtocolError;

    fn try_from(dto: &RuleDto) -> Result<Self, Self::Error> {
        Ok(match *dto {
            RuleDto::CanNotWriteAfterJoining { duration_millis } => Rule::Create(
                CreateRule::CanNotWriteAfterJoining(decode_duration("durationMillis", duration_millis)?),
            ),
            RuleDto::Debounce { delay_millis } => {
                Rule::Create(CreateRule::Debounce(decode_duration("delayMillis", delay_millis)?))
            }
            RuleDto::EditWindow { duration_millis } => Rule::Edit(EditRule::EditWindow(
                decode_duration("durationMillis", duration_millis)?,
            )),
            RuleDto::SenderIdCanNotChange => Rule::Edit(EditRule::SenderIdCanNotChange),
            RuleDto::RecipientCanNotChange => Rule::Edit(EditRule::RecipientCanNotChange),
            RuleDto::CreationTimeCanNotChange => Rule::Edit(EditRule::CreationTimeCanNotChange),
            RuleDto::DeleteWindow { duration_millis } => Rule::Delete(DeleteRule::DeleteWindow(
                decode_duration("durationMillis", duration_millis)?,
            )),
            RuleDto::SenderCanDeleteOwn => Rule::Delete(DeleteRule::SenderCanDeleteOwn),
            RuleDto::AdminCanDeleteAny => Rule::Delete(DeleteRule::AdminCanDeleteAny),
            RuleDto::ModeratorCanDeleteAny => Rule::Delete(DeleteRule::ModeratorCanDeleteAny),
            RuleDto::NoDeleteAfterDelivered => Rule::Delete(DeleteRule::NoDeleteAfterDelivered),
            RuleDto::DeleteForEveryoneWindow { duration_millis } => Rule::Delete(
                DeleteRule::DeleteForEveryoneWindow(decode_duration("durationMillis", duration_millis)?),
            ),
            RuleDto::OnlyAdminCanDelete => Rule::ChatDelete(ChatDeleteRule::OnlyAdminCanDelete),
        })
    }
}

pub fn encode_rules(rules: &RuleSet) -> Vec<RuleDto> {
    rules.iter().map(RuleDto::from).collect()
}

pub fn decode_rules(dtos: &[RuleDto]) -> Result<RuleSet, ProtocolError> {
    dtos.iter()
        .map(Rule::try_from)
        .collect::<Result<Vec<_>, _>>()
        .map(RuleSet::new)
}

// ---------------------------------------------------------------------------
// Delivery status
// ---------------------------------------------------------------------------

impl DeliveryFailure {
    pub fn as_str(&self) -> &str {
        match self {
            Self::NetworkUnavailable => "NetworkUnavailable",
            Self::ServerUnreachable => "ServerUnreachable",
            Self::MessageTooLarge => "MessageTooLarge",
            Self::MessageExpired => "MessageExpired",
            Self::RecipientBlocked => "RecipientBlocked",
            Self::RecipientNotFound => "RecipientNotFound",
            Self::RateLimitExceeded => "RateLimitExceeded",
            Self::Unknown(reason) => reason,
        }
    }

    /// Unrecognised reasons are kept verbatim as `Unknown`.
    pub fn from_reason(reason: &str) -> Self {
        match reason {
            "NetworkUnavailable" => Self::NetworkUnavailable,
            "ServerUnreachable" => Self::ServerUnreachable,
            "MessageTooLarge" => Self::MessageTooLarge,
            "MessageExpired" => Self::MessageExpired,
            "RecipientBlocked" => Self::RecipientBlocked,
            "RecipientNotFound" => Self::RecipientNotFound,
            "RateLimitExceeded" => Self::RateLimitExceeded,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl From<&DeliveryStatus> for DeliveryStatusDto {
    fn from(status: &DeliveryStatus) -> Self {
        match status {
            DeliveryStatus::Sending(p) => Self::Sending {
                progress: i32::from(*p),
            },
            DeliveryStatus::Sent => Self::Sent,
            DeliveryStatus::Delivered => Self::Delivered,
            DeliveryStatus::Read => Self::Read,
            DeliveryStatus::Failed(reason) => Self::Failed {
                reason: reason.as_str().to_string(),
            },
        }
    }
}

impl TryFrom<&DeliveryStatusDto> for DeliveryStatus {
    type Error = ProtocolError;

    fn try_from(dto: &DeliveryStatusDto) -> Result<Self, Self::Error> {
        Ok(match dto {
            DeliveryStatusDto::Sending { progress } => {
                let progress = u8::try_from(*progress)
                    .ok()
                    .filter(|p| *p <= 100)
                    .ok_or_else(|| ProtocolError::InvalidValue {
                        field: "progress",
                        reason: format!("{progress} is outside 0..=100"),
                    })?;
                Self::Sending(progress)
            }
            DeliveryStatusDto::Sent => Self::Sent,
            DeliveryStatusDto::Delivered => Self::Delivered,
            DeliveryStatusDto::Read => Self::Read,
            DeliveryStatusDto::Failed { reason } => Self::Failed(DeliveryFailure::from_reason(reason)),
        })
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

impl From<&Message> for MessageDto {
    fn from(m: &Message) -> Self {
        Self {
            id: m.id.to_string(),
            parent_id: m.parent_id.map(|id| id.to_string()),
            sender: ParticipantDto::from(&m.sender),
            recipient: m.recipient.to_string(),
            created_at: encode_timestamp(m.created_at),
            sent_at: m.sent_at.map(encode_timestamp),
            delivered_at: m.delivered_at.map(encode_timestamp),
            edited_at: m.edited_at.map(encode_timestamp),
            delivery_status: m.delivery_status.as_ref().map(DeliveryStatusDto::from),
            text: m.text.clone(),
        }
    }
}

impl TryFrom<&MessageDto> for Message {
    type Error = ProtocolError;

    fn try_from(dto: &MessageDto) -> Result<Self, Self::Error> {
        Ok(Self {
            id: MessageId(decode_uuid(&dto.id)?),
            parent_id: dto
                .parent_id
                .as_deref()
                .map(decode_uuid)
                .transpose()?
                .map(MessageId),
            sender: Participant::try_from(&dto.sender)?,
            recipient: ChatId(decode_uuid(&dto.recipient)?),
            created_at: decode_timestamp(&dto.created_at)?,
            sent_at: decode_optional_timestamp(dto.sent_at.as_deref())?,
            delivered_at: decode_optional_timestamp(dto.delivered_at.as_deref())?,
            edited_at: decode_optional_timestamp(dto.edited_at.as_deref())?,
            delivery_status: dto
                .delivery_status
                .as_ref()
                .map(DeliveryStatus::try_from)
                .transpose()?,
            text: dto.text.clone(),
        })
    }
}

fn decode_messages(dtos: &[MessageDto]) -> Result<Vec<Message>, ProtocolError> {
    dtos.iter().map(Message::try_from).collect()
}

fn decode_participants(dtos: &[ParticipantDto]) -> Result<Vec<Participant>, ProtocolError> {
    dtos.iter().map(Participant::try_from).collect()
}

fn decode_message_id(s: Option<&str>) -> Result<Option<MessageId>, ProtocolError> {
    s.map(|s| decode_uuid(s).map(MessageId)).transpose()
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

impl From<&Chat> for ChatDto {
    fn from(chat: &Chat) -> Self {
        Self {
            id: chat.id.to_string(),
            name: chat.name.clone(),
            picture_url: chat.picture_url.clone(),
            messages: chat.messages.iter().map(MessageDto::from).collect(),
            participants: chat.participants.iter().map(ParticipantDto::from).collect(),
            rules: encode_rules(&chat.rules),
            unread_messages_count: chat.unread_messages_count,
            last_read_message_id: chat.last_read_message_id.map(|id| id.to_string()),
            is_closed: chat.is_closed,
            is_archived: chat.is_archived,
            is_one_to_one: chat.is_one_to_one,
        }
    }
}

impl TryFrom<&ChatDto> for Chat {
    type Error = ProtocolError;

    fn try_from(dto: &ChatDto) -> Result<Self, Self::Error> {
        let metadata = ChatMetadata {
            name: dto.name.clone(),
            picture_url: dto.picture_url.clone(),
            participants: decode_participants(&dto.participants)?,
            rules: decode_rules(&dto.rules)?,
            unread_messages_count: dto.unread_messages_count,
            last_read_message_id: decode_message_id(dto.last_read_message_id.as_deref())?,
            last_activity_at: None,
            is_closed: dto.is_closed,
            is_archived: dto.is_archived,
            is_one_to_one: dto.is_one_to_one,
        };
        Ok(Chat::from_metadata(
            ChatId(decode_uuid(&dto.id)?),
            metadata,
            decode_messages(&dto.messages)?,
        ))
    }
}

impl From<&ChatMetadata> for ChatMetadataDto {
    fn from(m: &ChatMetadata) -> Self {
        Self {
            name: m.name.clone(),
            participants: m.participants.iter().map(ParticipantDto::from).collect(),
            picture_url: m.picture_url.clone(),
            rules: encode_rules(&m.rules),
            unread_messages_count: m.unread_messages_count,
            last_read_message_id: m.last_read_message_id.map(|id| id.to_string()),
            last_activity_at: m.last_activity_at.map(encode_timestamp),
            is_closed: m.is_closed,
            is_archived: m.is_archived,
            is_one_to_one: m.is_one_to_one,
        }
    }
}

impl TryFrom<&ChatMetadataDto> for ChatMetadata {
    type Error = ProtocolError;

    fn try_from(dto: &ChatMetadataDto) -> Result<Self, Self::Error> {
        Ok(Self {
            name: dto.name.clone(),
            picture_url: dto.picture_url.clone(),
            participants: decode_participants(&dto.participants)?,
            rules: decode_rules(&dto.rules)?,
            unread_messages_count: dto.unread_messages_count,
            last_read_message_id: decode_message_id(dto.last_read_message_id.as_deref())?,
            last_activity_at: decode_optional_timestamp(dto.last_activity_at.as_deref())?,
            is_closed: dto.is_closed,
            is_archived: dto.is_archived,
            is_one_to_one: dto.is_one_to_one,
        })
    }
}

// ---------------------------------------------------------------------------
// Deltas
// ---------------------------------------------------------------------------

impl From<&ChatDelta> for ChatDeltaDto {
    fn from(delta: &ChatDelta) -> Self {
        match delta {
            ChatDelta::Created {
                chat_id,
                metadata,
                initial_messages,
                timestamp,
            } => Self::Created {
                chat_id: chat_id.to_string(),
                chat_metadata: ChatMetadataDto::from(metadata),
                initial_messages: initial_messages.iter().map(MessageDto::from).collect(),
                timestamp: encode_timestamp(*timestamp),
            },
            ChatDelta::Updated {
                chat_id,
                metadata,
                messages_to_add,
                messages_to_delete,
                timestamp,
            } => Self::Updated {
                chat_id: chat_id.to_string(),
                chat_metadata: ChatMetadataDto::from(metadata),
                messages_to_add: messages_to_add.iter().map(MessageDto::from).collect(),
                messages_to_delete: messages_to_delete.iter().map(|id| id.to_string()).collect(),
                timestamp: encode_timestamp(*timestamp),
            },
            ChatDelta::Deleted { chat_id, timestamp } => Self::Deleted {
                chat_id: chat_id.to_string(),
                timestamp: encode_timestamp(*timestamp),
            },
        }
    }
}

impl TryFrom<&ChatDeltaDto> for ChatDelta {
    type Error = ProtocolError;

    fn try_from(dto: &ChatDeltaDto) -> Result<Self, Self::Error> {
        Ok(match dto {
            ChatDeltaDto::Created {
                chat_id,
                chat_metadata,
                initial_messages,
                timestamp,
            } => Self::Created {
                chat_id: ChatId(decode_uuid(chat_id)?),
                metadata: ChatMetadata::try_from(chat_metadata)?,
                initial_messages: decode_messages(initial_messages)?,
                timestamp: decode_timestamp(timestamp)?,
            },
            ChatDeltaDto::Updated {
                chat_id,
                chat_metadata,
                messages_to_add,
                messages_to_delete,
                timestamp,
            } => Self::Updated {
                chat_id: ChatId(decode_uuid(chat_id)?),
                metadata: ChatMetadata::try_from(chat_metadata)?,
                messages_to_add: decode_messages(messages_to_add)?,
                messages_to_delete: messages_to_delete
                    .iter()
                    .map(|id| decode_uuid(id).map(MessageId))
                    .collect::<Result<_, _>>()?,
                timestamp: decode_timestamp(timestamp)?,
            },
            ChatDeltaDto::Deleted { chat_id, timestamp } => Self::Deleted {
                chat_id: ChatId(decode_uuid(chat_id)?),
                timestamp: decode_timestamp(timestamp)?,
            },
        })
    }
}

impl From<&ChatListDelta> for ChatListDeltaDto {
    fn from(batch: &ChatListDelta) -> Self {
        Self {
            changes: batch.changes.iter().map(ChatDeltaDto::from).collect(),
            from_timestamp: batch.from_timestamp.map(encode_timestamp),
            to_timestamp: encode_timestamp(batch.to_timestamp),
            has_more_changes: batch.has_more_changes,
        }
    }
}

impl TryFrom<&ChatListDeltaDto> for ChatListDelta {
    type Error = ProtocolError;

    fn try_from(dto: &ChatListDeltaDto) -> Result<Self, Self::Error> {
        Ok(Self {
            changes: dto
                .changes
                .iter()
                .map(ChatDelta::try_from)
                .collect::<Result<_, _>>()?,
            from_timestamp: decode_optional_timestamp(dto.from_timestamp.as_deref())?,
            to_timestamp: decode_timestamp(&dto.to_timestamp)?,
            has_more_changes: dto.has_more_changes,
        })
    }
}
