//! The local chat cache.
//!
//! [`ChatStore`] keeps every known chat in an immutable snapshot map that is
//! published through a `watch` channel. Writers never mutate a published
//! snapshot: they build the next one and swap it in, so a reader always sees
//! a complete state. Mutations of one chat are serialized by a per-chat
//! lock; mutations of different chats proceed independently. Delta batches
//! take the batch gate exclusively so no single-chat write interleaves with
//! them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use parley_shared::validation::validate_chat;
use parley_shared::{Chat, ChatId, Message, MessageId};
use tokio::sync::{watch, Mutex as AsyncMutex, OwnedMutexGuard, RwLock, RwLockWriteGuard};
use tracing::{debug, info};

use crate::chats::{remove_all_chats, remove_chat, write_chat};
use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::sync_meta::write_checkpoint;

/// Snapshot of every chat, keyed by id.
pub type ChatMap = HashMap<ChatId, Arc<Chat>>;

/// Shared handle to the local chat cache. Cheap to clone.
#[derive(Clone)]
pub struct ChatStore {
    inner: Arc<Inner>,
}

struct Inner {
    chats: watch::Sender<Arc<ChatMap>>,
    checkpoint: watch::Sender<Option<DateTime<Utc>>>,
    chat_locks: Mutex<HashMap<ChatId, Arc<AsyncMutex<()>>>>,
    batch_gate: RwLock<()>,
    database: Option<Mutex<Database>>,
}

impl ChatStore {
    /// A store that lives only in memory.
    pub fn in_memory() -> Self {
        Self::from_parts(ChatMap::new(), None, None)
    }

    /// Load chats and the checkpoint from `database`; later writes go
    /// through to it.
    pub fn open(database: Database) -> Result<Self> {
        let chats: ChatMap = database
            .list_chats()?
            .into_iter()
            .map(|chat| (chat.id, Arc::new(chat)))
            .collect();
        let checkpoint = database.get_last_sync()?;

        info!(
            chats = chats.len(),
            checkpoint = ?checkpoint,
            "loaded local chat state"
        );

        Ok(Self::from_parts(chats, checkpoint, Some(database)))
    }

    fn from_parts(
        chats: ChatMap,
        checkpoint: Option<DateTime<Utc>>,
        database: Option<Database>,
    ) -> Self {
        let (chats, _) = watch::channel(Arc::new(chats));
        let (checkpoint, _) = watch::channel(checkpoint);
        Self {
            inner: Arc::new(Inner {
                chats,
                checkpoint,
                chat_locks: Mutex::new(HashMap::new()),
                batch_gate: RwLock::new(()),
                database: database.map(Mutex::new),
            }),
        }
    }

    pub fn is_persistent(&self) -> bool {
        self.inner.database.is_some()
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Receiver that is notified after every committed change.
    pub fn subscribe(&self) -> watch::Receiver<Arc<ChatMap>> {
        self.inner.chats.subscribe()
    }

    pub fn snapshot(&self) -> Arc<ChatMap> {
        self.inner.chats.borrow().clone()
    }

    pub fn chat(&self, id: ChatId) -> Option<Arc<Chat>> {
        self.inner.chats.borrow().get(&id).cloned()
    }

    /// A page of a chat's messages, newest first.
    pub fn messages(&self, chat_id: ChatId, limit: usize, offset: usize) -> Result<Vec<Message>> {
        let chat = self.chat(chat_id).ok_or(StoreError::ChatNotFound(chat_id))?;

        if let Some(db) = &self.inner.database {
            let db = db.lock().unwrap_or_else(PoisonError::into_inner);
            let limit = u32::try_from(limit).unwrap_or(u32::MAX);
            let offset = u32::try_from(offset).unwrap_or(u32::MAX);
            return db.get_messages_for_chat(chat_id, limit, offset);
        }

        Ok(chat
            .messages
            .iter()
            .rev()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    // ------------------------------------------------------------------
    // Checkpoint
    // ------------------------------------------------------------------

    pub fn checkpoint(&self) -> Option<DateTime<Utc>> {
        *self.inner.checkpoint.borrow()
    }

    pub fn subscribe_checkpoint(&self) -> watch::Receiver<Option<DateTime<Utc>>> {
        self.inner.checkpoint.subscribe()
    }

    /// Advance the checkpoint. An older timestamp is ignored.
    pub async fn set_checkpoint(&self, ts: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let _gate = self.inner.batch_gate.read().await;
        let next = advance(self.checkpoint(), ts);
        self.with_db(|db| write_checkpoint(db.conn(), Some(next)))?;
        self.inner.checkpoint.send_replace(Some(next));
        Ok(next)
    }

    /// Forget the checkpoint so the next sync is a full resync.
    pub async fn clear_checkpoint(&self) -> Result<()> {
        let _gate = self.inner.batch_gate.read().await;
        self.with_db(|db| write_checkpoint(db.conn(), None))?;
        self.inner.checkpoint.send_replace(None);
        info!("sync checkpoint cleared");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Single-chat writes
    // ------------------------------------------------------------------

    /// Insert a chat, replacing any chat with the same id.
    pub async fn insert_chat(&self, chat: Chat) -> Result<Arc<Chat>> {
        let _gate = self.inner.batch_gate.read().await;
        let _guard = self.lock_chat(chat.id).await;

        check_chat(&chat)?;
        self.with_db(|db| db.save_chat(&chat))?;

        let chat = Arc::new(chat);
        self.publish_chat(chat.clone());
        debug!(chat = %chat.id, "chat stored");
        Ok(chat)
    }

    /// Apply `f` to a copy of the chat and commit the result.
    ///
    /// Nothing is written or published when `f` leaves the chat unchanged.
    pub async fn update_chat<T>(&self, id: ChatId, f: impl FnOnce(&mut Chat) -> T) -> Result<T> {
        let _gate = self.inner.batch_gate.read().await;
        let _guard = self.lock_chat(id).await;

        let current = self.chat(id).ok_or(StoreError::ChatNotFound(id))?;
        let mut chat = (*current).clone();
        let out = f(&mut chat);
        if chat == *current {
            return Ok(out);
        }
        if chat.id != id {
            return Err(StoreError::InvalidData(format!(
                "chat id changed from {id} to {}",
                chat.id
            )));
        }

        check_chat(&chat)?;
        self.with_db(|db| db.save_chat(&chat))?;
        self.publish_chat(Arc::new(chat));
        Ok(out)
    }

    /// Remove a chat. Returns `false` if it was not present.
    pub async fn remove_chat(&self, id: ChatId) -> Result<bool> {
        let _gate = self.inner.batch_gate.read().await;
        let _guard = self.lock_chat(id).await;

        if self.chat(id).is_none() {
            return Ok(false);
        }
        self.with_db(|db| db.delete_chat(id).map(|_| ()))?;
        self.inner.chats.send_modify(|map| {
            Arc::make_mut(map).remove(&id);
        });
        self.forget_lock(id);
        debug!(chat = %id, "chat removed");
        Ok(true)
    }

    /// Insert or replace a message in the chat it is addressed to.
    pub async fn upsert_message(&self, message: Message) -> Result<()> {
        self.update_chat(message.recipient, |chat| {
            chat.upsert_message(message);
        })
        .await
    }

    pub async fn remove_message(&self, chat_id: ChatId, message_id: MessageId) -> Result<bool> {
        self.update_chat(chat_id, |chat| chat.remove_message(message_id))
            .await
    }

    // ------------------------------------------------------------------
    // Batches
    // ------------------------------------------------------------------

    /// Exclusive access for a whole delta batch.
    pub(crate) async fn begin_batch(&self) -> RwLockWriteGuard<'_, ()> {
        self.inner.batch_gate.write().await
    }

    /// Replace the whole chat set and advance the checkpoint in one step.
    ///
    /// The caller must hold the guard returned by [`Self::begin_batch`].
    pub(crate) fn commit_batch(
        &self,
        _gate: &RwLockWriteGuard<'_, ()>,
        staged: ChatMap,
        full_resync: bool,
        to_timestamp: DateTime<Utc>,
    ) -> Result<DateTime<Utc>> {
        let current = self.snapshot();
        let checkpoint = advance(self.checkpoint(), to_timestamp);

        let changed: Vec<&Arc<Chat>> = staged
            .iter()
            .filter(|(id, chat)| match current.get(id) {
                Some(old) => !Arc::ptr_eq(old, chat),
                None => true,
            })
            .map(|(_, chat)| chat)
            .collect();
        let removed: Vec<ChatId> = current
            .keys()
            .filter(|id| !staged.contains_key(id))
            .copied()
            .collect();

        self.with_db(|db| {
            db.transaction(|tx| {
                if full_resync {
                    remove_all_chats(tx)?;
                    for chat in staged.values() {
                        write_chat(tx, chat)?;
                    }
                } else {
                    for id in &removed {
                        remove_chat(tx, *id)?;
                    }
                    for chat in &changed {
                        write_chat(tx, chat)?;
                    }
                }
                write_checkpoint(tx, Some(checkpoint))
            })
        })?;

        debug!(
            changed = changed.len(),
            removed = removed.len(),
            "batch committed"
        );

        for id in &removed {
            self.forget_lock(*id);
        }
        self.inner.chats.send_replace(Arc::new(staged));
        self.inner.checkpoint.send_replace(Some(checkpoint));
        Ok(checkpoint)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    async fn lock_chat(&self, id: ChatId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self
                .inner
                .chat_locks
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            locks.entry(id).or_default().clone()
        };
        lock.lock_owned().await
    }

    fn forget_lock(&self, id: ChatId) {
        self.inner
            .chat_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
    }

    fn publish_chat(&self, chat: Arc<Chat>) {
        self.inner.chats.send_modify(|map| {
            Arc::make_mut(map).insert(chat.id, chat);
        });
    }

    fn with_db(&self, f: impl FnOnce(&mut Database) -> Result<()>) -> Result<()> {
        match &self.inner.database {
            Some(db) => f(&mut db.lock().unwrap_or_else(PoisonError::into_inner)),
            None => Ok(()),
        }
    }
}

impl Default for ChatStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

/// Structural checks applied to every chat before it is stored.
pub(crate) fn check_chat(chat: &Chat) -> Result<()> {
    validate_chat(chat)?;
    if let Some(stray) = chat.messages.iter().find(|m| m.recipient != chat.id) {
        return Err(StoreError::InvalidData(format!(
            "message {} is addressed to chat {}, not {}",
            stray.id, stray.recipient, chat.id
        )));
    }
    Ok(())
}

fn advance(current: Option<DateTime<Utc>>, candidate: DateTime<Utc>) -> DateTime<Utc> {
    match current {
        Some(current) if current > candidate => current,
        _ => candidate,
    }
}
