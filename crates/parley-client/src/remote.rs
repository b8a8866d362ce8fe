//! The remote source of truth, as seen by the coordinator.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use parley_shared::protocol::ChatListDeltaDto;
use parley_shared::{Chat, ChatId, ChatListDelta, DeleteMode, Message, MessageId};

use crate::error::RemoteError;

/// Request/response and streaming calls against the server.
///
/// Transport concerns (timeouts, retries, auth) belong to the implementor.
/// Every call reports failure through [`RemoteError`].
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Create `chat` remotely; returns the chat as the server stored it.
    async fn create_chat(&self, chat: &Chat) -> Result<Chat, RemoteError>;

    async fn delete_chat(&self, chat_id: ChatId) -> Result<(), RemoteError>;

    async fn join_chat(
        &self,
        chat_id: ChatId,
        invite_link: Option<&str>,
    ) -> Result<Chat, RemoteError>;

    async fn leave_chat(&self, chat_id: ChatId) -> Result<(), RemoteError>;

    /// Change batches since `since`, or a full resync when `None`.
    ///
    /// The stream ends when the server has nothing more to send for now.
    fn deltas_since(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> BoxStream<'static, Result<ChatListDelta, RemoteError>>;

    /// Progressive delivery states of a newly sent message.
    fn send_message(&self, message: Message) -> BoxStream<'static, Result<Message, RemoteError>>;

    /// Progressive delivery states of an edited message.
    fn edit_message(&self, message: Message) -> BoxStream<'static, Result<Message, RemoteError>>;

    async fn delete_message(&self, message_id: MessageId, mode: DeleteMode)
        -> Result<(), RemoteError>;

    async fn mark_messages_as_read(
        &self,
        chat_id: ChatId,
        up_to: MessageId,
    ) -> Result<(), RemoteError>;
}

/// Decode a delta page received as JSON.
pub fn decode_delta_page(json: &str) -> Result<ChatListDelta, RemoteError> {
    let dto: ChatListDeltaDto = serde_json::from_str(json)
        .map_err(|e| RemoteError::ServerError(format!("malformed delta page: {e}")))?;
    ChatListDelta::try_from(&dto)
        .map_err(|e| RemoteError::ServerError(format!("malformed delta page: {e}")))
}

/// Encode a delta page as JSON.
pub fn encode_delta_page(batch: &ChatListDelta) -> serde_json::Result<String> {
    serde_json::to_string(&ChatListDeltaDto::from(batch))
}
