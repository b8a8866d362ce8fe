//! Persistence of [`Message`] records.

use parley_shared::protocol::{encode_timestamp, MessageDto};
use parley_shared::{ChatId, Message, MessageId};
use rusqlite::{params, Connection, OptionalExtension};

use crate::database::Database;
use crate::error::{Result, StoreError};

impl Database {
    /// A page of a chat's messages, newest first.
    pub fn get_messages_for_chat(
        &self,
        chat_id: ChatId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Message>> {
        let mut stmt = self.conn().prepare(
            "SELECT payload
             FROM messages
             WHERE chat_id = ?1
             ORDER BY position DESC
             LIMIT ?2 OFFSET ?3",
        )?;

        let rows = stmt.query_map(params![chat_id.to_string(), limit, offset], |row| {
            row.get::<_, String>(0)
        })?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(decode_message(&row?)?);
        }
        Ok(messages)
    }

    /// Message ids are only unique within their chat.
    pub fn get_message_by_id(&self, chat_id: ChatId, id: MessageId) -> Result<Message> {
        let payload: Option<String> = self
            .conn()
            .query_row(
                "SELECT payload FROM messages WHERE chat_id = ?1 AND id = ?2",
                params![chat_id.to_string(), id.to_string()],
                |row| row.get(0),
            )
            .optional()?;

        decode_message(&payload.ok_or(StoreError::MessageNotFound(id))?)
    }

    pub fn count_messages(&self, chat_id: ChatId) -> Result<u32> {
        let count: u32 = self.conn().query_row(
            "SELECT COUNT(*) FROM messages WHERE chat_id = ?1",
            params![chat_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Replace every stored message of `chat_id` with `messages`.
pub(crate) fn write_messages(conn: &Connection, chat_id: ChatId, messages: &[Message]) -> Result<()> {
    conn.execute(
        "DELETE FROM messages WHERE chat_id = ?1",
        params![chat_id.to_string()],
    )?;

    let mut stmt = conn.prepare(
        "INSERT INTO messages (id, chat_id, position, created_at, payload)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;

    for (position, message) in messages.iter().enumerate() {
        if message.recipient != chat_id {
            return Err(StoreError::InvalidData(format!(
                "message {} is addressed to chat {}, not {}",
                message.id, message.recipient, chat_id
            )));
        }
        let payload = serde_json::to_string(&MessageDto::from(message))?;
        stmt.execute(params![
            message.id.to_string(),
            chat_id.to_string(),
            position as i64,
            encode_timestamp(message.created_at),
            payload,
        ])?;
    }
    Ok(())
}

/// All messages of a chat, oldest first.
pub(crate) fn load_messages(conn: &Connection, chat_id: ChatId) -> Result<Vec<Message>> {
    let mut stmt = conn.prepare(
        "SELECT payload FROM messages WHERE chat_id = ?1 ORDER BY position ASC",
    )?;
    let rows = stmt.query_map(params![chat_id.to_string()], |row| row.get::<_, String>(0))?;

    let mut messages = Vec::new();
    for row in rows {
        messages.push(decode_message(&row?)?);
    }
    Ok(messages)
}

fn decode_message(payload: &str) -> Result<Message> {
    let dto: MessageDto = serde_json::from_str(payload)?;
    Ok(Message::try_from(&dto)?)
}
