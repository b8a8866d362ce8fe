//! v003 -- Message ids are unique per chat, not per database.
//!
//! SQLite can not alter a primary key in place, so the table is rebuilt.

use rusqlite::Connection;

const UP_SQL: &str = r#"
CREATE TABLE messages_v3 (
    id         TEXT NOT NULL,                 -- UUID v4, unique within its chat
    chat_id    TEXT NOT NULL,                 -- FK -> chats(id)
    position   INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    payload    TEXT NOT NULL,

    PRIMARY KEY (chat_id, id),
    FOREIGN KEY (chat_id) REFERENCES chats(id) ON DELETE CASCADE
);

INSERT INTO messages_v3 (id, chat_id, position, created_at, payload)
    SELECT id, chat_id, position, created_at, payload FROM messages;

DROP INDEX IF EXISTS idx_messages_chat_position;
DROP TABLE messages;
ALTER TABLE messages_v3 RENAME TO messages;

CREATE INDEX IF NOT EXISTS idx_messages_chat_position
    ON messages(chat_id, position DESC);
"#;

pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
