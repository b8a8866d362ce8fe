//! v001 -- Initial schema creation.
//!
//! Creates the two core tables: `chats` and `messages`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Chats
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS chats (
    id         TEXT PRIMARY KEY NOT NULL,     -- UUID v4
    name       TEXT NOT NULL,
    payload    TEXT NOT NULL,                 -- ChatDto JSON, without messages
    updated_at TEXT NOT NULL                  -- ISO-8601 / RFC-3339
);

-- ----------------------------------------------------------------
-- Messages
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS messages (
    id         TEXT PRIMARY KEY NOT NULL,     -- UUID v4
    chat_id    TEXT NOT NULL,                 -- FK -> chats(id)
    position   INTEGER NOT NULL,              -- index in chronological order
    created_at TEXT NOT NULL,                 -- ISO-8601
    payload    TEXT NOT NULL,                 -- MessageDto JSON

    FOREIGN KEY (chat_id) REFERENCES chats(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_messages_chat_position
    ON messages(chat_id, position DESC);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
