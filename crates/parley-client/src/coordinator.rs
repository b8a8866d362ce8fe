//! The client-facing façade over the remote and the local chat cache.
//!
//! Every mutating call follows the same path: check the action against the
//! chat's rules using the locally cached chat, call the remote, then reflect
//! the result locally. Reads never touch the remote; they observe the
//! [`ChatStore`], which the delta sync keeps current.

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future;
use futures::stream::{BoxStream, StreamExt};
use parley_shared::constants::APP_NAME;
use parley_shared::validation::{validate_chat_on_creation, validate_text};
use parley_shared::{
    Action, Chat, ChatId, ChatPreview, Clock, DeleteMode, DeliveryStatusPolicy, Message,
    MessageId, Participant, ParticipantId, ReadCursorMove, RuleEngine, StandardDeliveryPolicy,
    SystemClock,
};
use parley_store::{ChatMap, ChatStore, DeltaSyncEngine};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::remote::RemoteSource;
use crate::streaming::guarded_progress;

/// Result of one [`SyncCoordinator::sync_once`] pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Batches applied during the pass.
    pub batches: usize,
    /// Whether the last applied batch announced more pages.
    pub has_more_changes: bool,
    pub checkpoint: Option<DateTime<Utc>>,
}

/// Entry point for everything the presentation layer does with chats.
#[derive(Clone)]
pub struct SyncCoordinator {
    remote: Arc<dyn RemoteSource>,
    engine: DeltaSyncEngine,
    policy: Arc<dyn DeliveryStatusPolicy>,
    clock: Arc<dyn Clock>,
    config: ClientConfig,
}

impl SyncCoordinator {
    pub fn new(remote: Arc<dyn RemoteSource>, store: ChatStore, config: ClientConfig) -> Self {
        info!(app = APP_NAME, persistent = store.is_persistent(), "coordinator created");
        Self {
            remote,
            engine: DeltaSyncEngine::new(store),
            policy: Arc::new(StandardDeliveryPolicy::new()),
            clock: Arc::new(SystemClock),
            config,
        }
    }

    /// Replace the delivery-status policy used to guard send/edit progress.
    pub fn with_policy(mut self, policy: Arc<dyn DeliveryStatusPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the clock used for rule evaluation.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &ChatStore {
        self.engine.store()
    }

    pub fn engine(&self) -> &DeltaSyncEngine {
        &self.engine
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// `true` while a delta batch is being applied.
    pub fn is_syncing(&self) -> watch::Receiver<bool> {
        self.engine.is_syncing()
    }

    // ------------------------------------------------------------------
    // Chat lifecycle
    // ------------------------------------------------------------------

    pub async fn create_chat(&self, chat: Chat) -> Result<Arc<Chat>> {
        validate_chat_on_creation(&chat)?;
        let created = self.remote.create_chat(&chat).await?;
        let stored = self.store().insert_chat(created).await?;
        info!(chat = %stored.id, name = %stored.name, "chat created");
        Ok(stored)
    }

    /// Delete a chat on behalf of `actor`, subject to the chat's
    /// chat-delete rules.
    pub async fn delete_chat(&self, chat_id: ChatId, actor: ParticipantId) -> Result<()> {
        let chat = self.cached_chat(chat_id)?;
        let actor = participant(&chat, actor)?;
        RuleEngine::evaluate(
            &chat.rules,
            &Action::DeleteChat { actor },
            self.clock.now(),
        )?;

        self.remote.delete_chat(chat_id).await?;
        self.store().remove_chat(chat_id).await?;
        info!(chat = %chat_id, "chat deleted");
        Ok(())
    }

    pub async fn join_chat(&self, chat_id: ChatId, invite_link: Option<&str>) -> Result<Arc<Chat>> {
        let joined = self.remote.join_chat(chat_id, invite_link).await?;
        let stored = self.store().insert_chat(joined).await?;
        info!(chat = %chat_id, "joined chat");
        Ok(stored)
    }

    pub async fn leave_chat(&self, chat_id: ChatId) -> Result<()> {
        self.remote.leave_chat(chat_id).await?;
        self.store().remove_chat(chat_id).await?;
        info!(chat = %chat_id, "left chat");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Observation
    // ------------------------------------------------------------------

    /// The chat list, re-emitted whenever it changes.
    ///
    /// Ordered by last activity, most recent first. Chats without messages
    /// come last; ties are broken by id.
    pub fn chat_list(&self) -> BoxStream<'static, Vec<ChatPreview>> {
        let snapshots = WatchStream::new(self.store().subscribe());
        dedup(snapshots.map(|map| previews(&map))).boxed()
    }

    /// One chat, re-emitted whenever it changes.
    ///
    /// While the chat is absent locally the stream yields `ChatNotFound`
    /// once, and resumes if the chat comes back.
    pub fn chat_updates(&self, chat_id: ChatId) -> BoxStream<'static, Result<Arc<Chat>>> {
        let snapshots = WatchStream::new(self.store().subscribe());
        let chats = snapshots.map(move |map| map.get(&chat_id).cloned());

        chats
            .scan(None::<Option<Arc<Chat>>>, move |last, chat| {
                let unchanged = match (last.as_ref(), &chat) {
                    (Some(Some(a)), Some(b)) => Arc::ptr_eq(a, b) || a == b,
                    (Some(None), None) => true,
                    _ => false,
                };
                let out = if unchanged {
                    None
                } else {
                    *last = Some(chat.clone());
                    Some(chat.ok_or(ClientError::ChatNotFound(chat_id)))
                };
                future::ready(Some(out))
            })
            .filter_map(future::ready)
            .boxed()
    }

    /// A page of a chat's messages, newest first.
    pub fn messages(
        &self,
        chat_id: ChatId,
        page: usize,
        limit: Option<usize>,
    ) -> Result<Vec<Message>> {
        let limit = limit.unwrap_or(self.config.page_size);
        let offset = page.saturating_mul(limit);
        Ok(self.store().messages(chat_id, limit, offset)?)
    }

    // ------------------------------------------------------------------
    // Messages
    // ------------------------------------------------------------------

    /// Send a new message.
    ///
    /// Rule and content checks happen before anything is sent. The returned
    /// stream yields each accepted delivery state of the message; it ends
    /// with an error at the first rejected transition or remote failure.
    /// Dropping it stops local tracking only.
    pub fn send_message(
        &self,
        message: Message,
    ) -> Result<BoxStream<'static, Result<Message>>> {
        let chat = self.cached_chat(message.recipient)?;
        let sender = participant(&chat, message.sender.id)?;
        RuleEngine::evaluate(
            &chat.rules,
            &Action::Create {
                chat: &chat,
                actor: sender,
            },
            self.clock.now(),
        )?;
        check_content(&message)?;

        debug!(chat = %chat.id, message = %message.id, "sending message");
        let id = message.id;
        let updates = self.remote.send_message(message);
        Ok(guarded_progress(
            id,
            None,
            updates,
            self.policy.clone(),
            self.store().clone(),
        ))
    }

    /// Replace the text (or other editable fields) of a sent message.
    pub fn edit_message(
        &self,
        edited: Message,
    ) -> Result<BoxStream<'static, Result<Message>>> {
        let (chat, original) = self
            .find_message(edited.id)
            .ok_or(ClientError::MessageNotFound(edited.id))?;
        RuleEngine::evaluate(
            &chat.rules,
            &Action::Edit {
                original: &original,
                edited: &edited,
            },
            self.clock.now(),
        )?;
        check_content(&edited)?;

        debug!(chat = %chat.id, message = %edited.id, "editing message");
        let id = edited.id;
        let updates = self.remote.edit_message(edited);
        Ok(guarded_progress(
            id,
            None,
            updates,
            self.policy.clone(),
            self.store().clone(),
        ))
    }

    pub async fn delete_message(
        &self,
        message_id: MessageId,
        actor: ParticipantId,
        mode: DeleteMode,
    ) -> Result<()> {
        let (chat, message) = self
            .find_message(message_id)
            .ok_or(ClientError::MessageNotFound(message_id))?;
        let actor = participant(&chat, actor)?;
        RuleEngine::evaluate(
            &chat.rules,
            &Action::Delete {
                message: &message,
                actor,
                mode,
            },
            self.clock.now(),
        )?;

        self.remote.delete_message(message_id, mode).await?;
        self.store().remove_message(chat.id, message_id).await?;
        info!(chat = %chat.id, message = %message_id, mode = mode.as_str(), "message deleted");
        Ok(())
    }

    /// Advance the read cursor of a chat to `up_to`.
    ///
    /// A move that would go backward is ignored and reported as
    /// [`ReadCursorMove::Backward`] without contacting the remote.
    pub async fn mark_messages_as_read(
        &self,
        chat_id: ChatId,
        up_to: MessageId,
    ) -> Result<ReadCursorMove> {
        let chat = self.cached_chat(chat_id)?;
        let mut preview = (*chat).clone();
        match preview.mark_read_up_to(up_to) {
            None => return Err(ClientError::MessageNotFound(up_to)),
            Some(ReadCursorMove::Backward) => {
                debug!(chat = %chat_id, message = %up_to, "ignoring backward read cursor");
                return Ok(ReadCursorMove::Backward);
            }
            Some(_) => {}
        }

        self.remote.mark_messages_as_read(chat_id, up_to).await?;
        let moved = self
            .store()
            .update_chat(chat_id, |chat| chat.mark_read_up_to(up_to))
            .await?;
        moved.ok_or(ClientError::MessageNotFound(up_to))
    }

    // ------------------------------------------------------------------
    // Sync
    // ------------------------------------------------------------------

    /// Pull and apply every batch the remote has since the checkpoint.
    ///
    /// Batches applied before a failure stay applied. When a batch refers
    /// to a chat this client does not know, the checkpoint is cleared so
    /// the next pass starts with a full resync.
    pub async fn sync_once(&self) -> Result<SyncOutcome> {
        let since = self.store().checkpoint();
        debug!(since = ?since, "opening delta stream");

        let mut deltas = self.remote.deltas_since(since);
        let mut outcome = SyncOutcome {
            batches: 0,
            has_more_changes: false,
            checkpoint: since,
        };

        while let Some(batch) = deltas.next().await {
            let batch = batch?;
            match self.engine.apply_batch(&batch).await {
                Ok(checkpoint) => {
                    outcome.batches += 1;
                    outcome.has_more_changes = batch.has_more_changes;
                    outcome.checkpoint = Some(checkpoint);
                }
                Err(e) => {
                    if e.needs_resync() {
                        warn!(error = %e, "local state is missing a chat, forcing full resync");
                        self.store().clear_checkpoint().await?;
                    }
                    return Err(e.into());
                }
            }
        }

        Ok(outcome)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn cached_chat(&self, chat_id: ChatId) -> Result<Arc<Chat>> {
        self.store()
            .chat(chat_id)
            .ok_or(ClientError::ChatNotFound(chat_id))
    }

    fn find_message(&self, id: MessageId) -> Option<(Arc<Chat>, Message)> {
        self.store().snapshot().values().find_map(|chat| {
            chat.message(id)
                .map(|message| (chat.clone(), message.clone()))
        })
    }
}

fn participant(chat: &Chat, id: ParticipantId) -> Result<&Participant> {
    chat.participant(id).ok_or(ClientError::NotParticipant)
}

fn check_content(message: &Message) -> Result<()> {
    validate_text(&message.text)?;
    if let Some(status) = &message.delivery_status {
        return Err(ClientError::DeliveryStatusAlreadySet(status.clone()));
    }
    Ok(())
}

fn previews(map: &ChatMap) -> Vec<ChatPreview> {
    let mut previews: Vec<ChatPreview> = map.values().map(|chat| ChatPreview::from(&**chat)).collect();
    previews.sort_by(by_last_activity);
    previews
}

fn by_last_activity(a: &ChatPreview, b: &ChatPreview) -> Ordering {
    match (a.last_activity_at, b.last_activity_at) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.id.cmp(&b.id))
}

/// Drop consecutive duplicates.
fn dedup<T, S>(items: S) -> impl futures::Stream<Item = T>
where
    T: Clone + PartialEq,
    S: futures::Stream<Item = T>,
{
    items
        .scan(None::<T>, |last, item| {
            let out = if last.as_ref() == Some(&item) {
                None
            } else {
                *last = Some(item.clone());
                Some(item)
            };
            future::ready(Some(out))
        })
        .filter_map(future::ready)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use futures::stream;
    use parley_shared::RuleSet;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()
    }

    fn chat_with_activity(name: &str, offset: Option<i64>) -> Chat {
        let alice = Participant::new(ParticipantId::new(), "alice", t0());
        let mut chat = Chat::new(name, vec![alice.clone()], RuleSet::default());
        if let Some(s) = offset {
            chat.upsert_message(Message::new(alice, chat.id, "hi", t0() + Duration::seconds(s)));
        }
        chat
    }

    #[test]
    fn previews_are_ordered_by_activity() {
        let quiet = chat_with_activity("quiet", None);
        let old = chat_with_activity("old", Some(10));
        let new = chat_with_activity("new", Some(60));

        let map: ChatMap = [quiet.clone(), old.clone(), new.clone()]
            .into_iter()
            .map(|c| (c.id, Arc::new(c)))
            .collect();

        let names: Vec<String> = previews(&map).into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["new", "old", "quiet"]);
    }

    #[test]
    fn equal_activity_breaks_ties_by_id() {
        let a = chat_with_activity("a", None);
        let b = chat_with_activity("b", None);
        let map: ChatMap = [a.clone(), b.clone()]
            .into_iter()
            .map(|c| (c.id, Arc::new(c)))
            .collect();

        let ids: Vec<ChatId> = previews(&map).into_iter().map(|p| p.id).collect();
        let mut expected = vec![a.id, b.id];
        expected.sort();
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn dedup_drops_consecutive_repeats() {
        let out: Vec<i32> = dedup(stream::iter(vec![1, 1, 2, 2, 1, 3, 3]))
            .collect()
            .await;
        assert_eq!(out, vec![1, 2, 1, 3]);
    }

    #[test]
    fn content_checks() {
        let chat = chat_with_activity("c", None);
        let sender = chat.participants[0].clone();

        let blank = Message::new(sender.clone(), chat.id, "  ", t0());
        assert!(matches!(
            check_content(&blank),
            Err(ClientError::InvalidMessage(_))
        ));

        let sent = Message::new(sender, chat.id, "hi", t0())
            .with_status(parley_shared::DeliveryStatus::Sent);
        assert!(matches!(
            check_content(&sent),
            Err(ClientError::DeliveryStatusAlreadySet(_))
        ));
    }
}
