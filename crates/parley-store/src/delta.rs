//! Merging remote delta batches into the local chat cache.
//!
//! A batch is merged into a staged copy of the chat map. Only when every
//! change has merged cleanly is the staged map persisted, swapped in, and
//! the checkpoint advanced to the batch's `to_timestamp`. A failed batch
//! leaves both the chats and the checkpoint exactly as they were.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parley_shared::{Chat, ChatDelta, ChatId, ChatListDelta};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::state::{check_chat, ChatMap, ChatStore};

#[derive(Debug, Error)]
pub enum DeltaError {
    /// An `Updated` change names a chat that is not known locally.
    #[error("chat {0} is not known locally")]
    ChatNotFound(ChatId),

    /// A change would leave a chat in an invalid state.
    #[error("change to chat {chat} is invalid: {reason}")]
    InvalidChange { chat: ChatId, reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A rejected batch.
#[derive(Debug, Error)]
#[error("delta batch rejected{}: {cause}", .index.map(|i| format!(" at change {i}")).unwrap_or_default())]
pub struct ApplyBatchError {
    /// Position of the failing change in timestamp order. `None` when the
    /// merge succeeded but the commit failed.
    pub index: Option<usize>,
    pub cause: DeltaError,
    /// The checkpoint still in force: everything up to here is committed.
    pub committed_up_to: Option<DateTime<Utc>>,
}

impl ApplyBatchError {
    /// The batch refers to state this client never saw; a full resync
    /// is needed to recover.
    pub fn needs_resync(&self) -> bool {
        matches!(self.cause, DeltaError::ChatNotFound(_))
    }
}

/// Applies [`ChatListDelta`] batches to a [`ChatStore`].
#[derive(Clone)]
pub struct DeltaSyncEngine {
    store: ChatStore,
    syncing: Arc<watch::Sender<bool>>,
}

impl DeltaSyncEngine {
    pub fn new(store: ChatStore) -> Self {
        let (syncing, _) = watch::channel(false);
        Self {
            store,
            syncing: Arc::new(syncing),
        }
    }

    pub fn store(&self) -> &ChatStore {
        &self.store
    }

    /// `true` while a batch is being applied.
    pub fn is_syncing(&self) -> watch::Receiver<bool> {
        self.syncing.subscribe()
    }

    /// Apply a whole batch atomically and return the new checkpoint.
    pub async fn apply_batch(
        &self,
        batch: &ChatListDelta,
    ) -> Result<DateTime<Utc>, ApplyBatchError> {
        let gate = self.store.begin_batch().await;
        self.syncing.send_replace(true);

        let full_resync = batch.is_full_resync();
        let committed_up_to = self.store.checkpoint();
        let mut staged: ChatMap = if full_resync {
            ChatMap::new()
        } else {
            (*self.store.snapshot()).clone()
        };

        let mut outcome = Ok(());
        for (index, delta) in batch.ordered_changes().into_iter().enumerate() {
            if let Err(cause) = merge(&mut staged, delta) {
                outcome = Err(ApplyBatchError {
                    index: Some(index),
                    cause,
                    committed_up_to,
                });
                break;
            }
        }

        let result = match outcome {
            Ok(()) => self
                .store
                .commit_batch(&gate, staged, full_resync, batch.to_timestamp)
                .map_err(|e| ApplyBatchError {
                    index: None,
                    cause: DeltaError::Store(e),
                    committed_up_to,
                }),
            Err(e) => Err(e),
        };

        self.syncing.send_replace(false);
        drop(gate);

        match &result {
            Ok(checkpoint) => info!(
                changes = batch.changes.len(),
                full_resync,
                checkpoint = %checkpoint,
                "delta batch applied"
            ),
            Err(e) => warn!(
                changes = batch.changes.len(),
                full_resync,
                error = %e,
                "delta batch rejected"
            ),
        }
        result
    }
}

fn merge(staged: &mut ChatMap, delta: &ChatDelta) -> Result<(), DeltaError> {
    debug!(chat = %delta.chat_id(), kind = delta.kind(), "merging change");

    match delta {
        ChatDelta::Created {
            chat_id,
            metadata,
            initial_messages,
            ..
        } => {
            let chat = Chat::from_metadata(*chat_id, metadata.clone(), initial_messages.clone());
            checked(&chat)?;
            staged.insert(*chat_id, Arc::new(chat));
        }
        ChatDelta::Updated {
            chat_id,
            metadata,
            messages_to_add,
            messages_to_delete,
            ..
        } => {
            let existing = staged
                .get(chat_id)
                .ok_or(DeltaError::ChatNotFound(*chat_id))?;
            let mut chat = (**existing).clone();
            chat.apply_metadata(metadata.clone());
            for message in messages_to_add {
                chat.upsert_message(message.clone());
            }
            for id in messages_to_delete {
                chat.remove_message(*id);
            }
            checked(&chat)?;
            staged.insert(*chat_id, Arc::new(chat));
        }
        ChatDelta::Deleted { chat_id, .. } => {
            staged.remove(chat_id);
        }
    }
    Ok(())
}

fn checked(chat: &Chat) -> Result<(), DeltaError> {
    check_chat(chat).map_err(|e| DeltaError::InvalidChange {
        chat: chat.id,
        reason: e.to_string(),
    })
}
