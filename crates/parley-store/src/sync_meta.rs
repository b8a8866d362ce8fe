//! The sync checkpoint: the timestamp through which local state reflects
//! every remote change.

use chrono::{DateTime, Utc};
use parley_shared::protocol::{decode_timestamp, encode_timestamp};
use rusqlite::{params, Connection, OptionalExtension};

use crate::database::Database;
use crate::error::Result;

const LAST_SYNC_KEY: &str = "last_sync_timestamp";

impl Database {
    pub fn get_last_sync(&self) -> Result<Option<DateTime<Utc>>> {
        read_checkpoint(self.conn())
    }

    pub fn set_last_sync(&self, ts: DateTime<Utc>) -> Result<()> {
        write_checkpoint(self.conn(), Some(ts))
    }

    /// Forget the checkpoint; the next sync will be a full resync.
    pub fn clear_last_sync(&self) -> Result<()> {
        write_checkpoint(self.conn(), None)
    }
}

pub(crate) fn read_checkpoint(conn: &Connection) -> Result<Option<DateTime<Utc>>> {
    let value: Option<String> = conn
        .query_row(
            "SELECT value FROM sync_metadata WHERE key = ?1",
            params![LAST_SYNC_KEY],
            |row| row.get(0),
        )
        .optional()?;

    Ok(value.map(|v| decode_timestamp(&v)).transpose()?)
}

pub(crate) fn write_checkpoint(conn: &Connection, ts: Option<DateTime<Utc>>) -> Result<()> {
    match ts {
        Some(ts) => {
            conn.execute(
                "INSERT INTO sync_metadata (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![LAST_SYNC_KEY, encode_timestamp(ts)],
            )?;
        }
        None => {
            conn.execute(
                "DELETE FROM sync_metadata WHERE key = ?1",
                params![LAST_SYNC_KEY],
            )?;
        }
    }
    Ok(())
}
