//! Persistence of [`Chat`] records.
//!
//! A chat row holds everything but its messages; those live in the
//! `messages` table and are rewritten together with their chat.

use chrono::Utc;
use parley_shared::protocol::{encode_timestamp, ChatDto};
use parley_shared::{Chat, ChatId};
use rusqlite::{params, Connection, OptionalExtension};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::messages::{load_messages, write_messages};

impl Database {
    // ------------------------------------------------------------------
    // Write
    // ------------------------------------------------------------------

    /// Insert or replace a chat and all of its messages.
    pub fn save_chat(&mut self, chat: &Chat) -> Result<()> {
        self.transaction(|tx| write_chat(tx, chat))
    }

    /// Delete a chat and its messages.  Returns `true` if a row was deleted.
    pub fn delete_chat(&mut self, id: ChatId) -> Result<bool> {
        self.transaction(|tx| remove_chat(tx, id))
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single chat, with messages, by id.
    pub fn get_chat(&self, id: ChatId) -> Result<Chat> {
        let payload: Option<String> = self
            .conn()
            .query_row(
                "SELECT payload FROM chats WHERE id = ?1",
                params![id.to_string()],
                |row| row.get(0),
            )
            .optional()?;

        let payload = payload.ok_or(StoreError::ChatNotFound(id))?;
        decode_chat(self.conn(), &payload)
    }

    /// List every stored chat, ordered by name.
    pub fn list_chats(&self) -> Result<Vec<Chat>> {
        let mut stmt = self
            .conn()
            .prepare("SELECT payload FROM chats ORDER BY name ASC, id ASC")?;

        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut chats = Vec::new();
        for row in rows {
            chats.push(decode_chat(self.conn(), &row?)?);
        }
        Ok(chats)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub(crate) fn write_chat(conn: &Connection, chat: &Chat) -> Result<()> {
    let mut dto = ChatDto::from(chat);
    dto.messages.clear();
    let payload = serde_json::to_string(&dto)?;

    conn.execute(
        "INSERT INTO chats (id, name, payload, updated_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(id) DO UPDATE SET
             name = excluded.name,
             payload = excluded.payload,
             updated_at = excluded.updated_at",
        params![
            chat.id.to_string(),
            chat.name,
            payload,
            encode_timestamp(Utc::now()),
        ],
    )?;

    write_messages(conn, chat.id, &chat.messages)
}

pub(crate) fn remove_chat(conn: &Connection, id: ChatId) -> Result<bool> {
    conn.execute(
        "DELETE FROM messages WHERE chat_id = ?1",
        params![id.to_string()],
    )?;
    let affected = conn.execute("DELETE FROM chats WHERE id = ?1", params![id.to_string()])?;
    Ok(affected > 0)
}

pub(crate) fn remove_all_chats(conn: &Connection) -> Result<()> {
    conn.execute("DELETE FROM messages", [])?;
    conn.execute("DELETE FROM chats", [])?;
    Ok(())
}

fn decode_chat(conn: &Connection, payload: &str) -> Result<Chat> {
    let dto: ChatDto = serde_json::from_str(payload)?;
    let mut chat = Chat::try_from(&dto)?;
    chat.messages = load_messages(conn, chat.id)?;
    Ok(chat)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use parley_shared::rules::DeleteRule;
    use parley_shared::{Message, Participant, ParticipantId, RuleSet};

    fn sample_chat(name: &str) -> Chat {
        let t0 = Utc.with_ymd_and_hms(2024, 4, 1, 10, 0, 0).unwrap();
        let alice = Participant::new(ParticipantId::new(), "alice", t0);
        let mut chat = Chat::new(
            name,
            vec![alice.clone()],
            RuleSet::new([DeleteRule::DeleteWindow(Duration::minutes(5))]),
        );
        for i in 0..3 {
            chat.upsert_message(Message::new(
                alice.clone(),
                chat.id,
                format!("m{i}"),
                t0 + Duration::seconds(i),
            ));
        }
        chat
    }

    #[test]
    fn save_and_load_chat() {
        let mut db = Database::open_in_memory().unwrap();
        let chat = sample_chat("general");

        db.save_chat(&chat).unwrap();
        assert_eq!(db.get_chat(chat.id).unwrap(), chat);
    }

    #[test]
    fn save_replaces_messages() {
        let mut db = Database::open_in_memory().unwrap();
        let mut chat = sample_chat("general");
        db.save_chat(&chat).unwrap();

        let dropped = chat.messages[1].id;
        chat.remove_message(dropped);
        chat.name = "renamed".into();
        db.save_chat(&chat).unwrap();

        let loaded = db.get_chat(chat.id).unwrap();
        assert_eq!(loaded.name, "renamed");
        assert_eq!(loaded.messages.len(), 2);
        assert!(loaded.message(dropped).is_none());
    }

    #[test]
    fn delete_and_list() {
        let mut db = Database::open_in_memory().unwrap();
        let a = sample_chat("alpha");
        let b = sample_chat("beta");
        db.save_chat(&b).unwrap();
        db.save_chat(&a).unwrap();

        let names: Vec<String> = db.list_chats().unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["alpha", "beta"]);

        assert!(db.delete_chat(a.id).unwrap());
        assert!(!db.delete_chat(a.id).unwrap());
        assert!(matches!(db.get_chat(a.id), Err(StoreError::ChatNotFound(_))));
    }
}
