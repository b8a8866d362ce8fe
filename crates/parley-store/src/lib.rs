//! # parley-store
//!
//! Local state for the Parley messaging core.
//!
//! [`ChatStore`] is the in-memory chat cache that readers subscribe to.
//! It can be backed by a SQLite [`Database`], in which case every committed
//! change is written through before it is published. [`DeltaSyncEngine`]
//! merges remote delta batches into the store and advances the sync
//! checkpoint.

pub mod chats;
pub mod database;
pub mod delta;
pub mod messages;
pub mod migrations;
pub mod state;
pub mod sync_meta;

mod error;

pub use database::Database;
pub use delta::{ApplyBatchError, DeltaError, DeltaSyncEngine};
pub use error::{LocalStorageError, Result, StoreError};
pub use state::{ChatMap, ChatStore};
