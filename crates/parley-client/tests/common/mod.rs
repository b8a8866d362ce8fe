//! Shared fixtures for the coordinator integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use futures::stream::{self, BoxStream, StreamExt};
use parley_client::{
    decode_delta_page, encode_delta_page, ClientConfig, RemoteError, RemoteSource, SyncCoordinator,
};
use parley_shared::{
    Chat, ChatId, ChatListDelta, Clock, DeleteMode, DeliveryStatus, ManualClock, Message, MessageId,
    Participant, ParticipantId, RuleSet,
};
use parley_store::ChatStore;

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

/// A participant who joined a day before `t0`.
pub fn member(name: &str) -> Participant {
    Participant::new(ParticipantId::new(), name, t0() - Duration::days(1))
}

pub fn chat_of(name: &str, participants: &[&Participant], rules: RuleSet) -> Chat {
    Chat::new(
        name,
        participants.iter().map(|p| (*p).clone()).collect(),
        rules,
    )
}

// ---------------------------------------------------------------------------
// Remote double
// ---------------------------------------------------------------------------

/// One scripted response to `deltas_since`: pages sent as JSON, optionally
/// followed by a failure or by a stream that stays open.
#[derive(Default)]
struct DeltaScript {
    pages: Vec<String>,
    then_fail: Option<RemoteError>,
    then_hang: bool,
}

#[derive(Default)]
struct Inner {
    delta_scripts: VecDeque<DeltaScript>,
    since_calls: Vec<Option<DateTime<Utc>>>,
    progress: Vec<Result<DeliveryStatus, RemoteError>>,
    fail_next: Option<RemoteError>,
    joinable: HashMap<ChatId, Chat>,
    sent: Vec<Message>,
    edited: Vec<Message>,
    created: Vec<ChatId>,
    deleted_chats: Vec<ChatId>,
    left: Vec<ChatId>,
    deleted_messages: Vec<(MessageId, DeleteMode)>,
    read_marks: Vec<(ChatId, MessageId)>,
}

/// In-memory stand-in for the server.
///
/// Delta pages go through the JSON wire encoding on the way out, like a
/// real transport would.
#[derive(Default)]
pub struct MemoryRemote {
    inner: Mutex<Inner>,
}

impl MemoryRemote {
    pub fn new() -> Arc<Self> {
        let remote = Arc::new(Self::default());
        remote.script_progress(vec![
            DeliveryStatus::Sending(0),
            DeliveryStatus::Sending(100),
            DeliveryStatus::Sent,
        ]);
        remote
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap()
    }

    /// Answer the next `deltas_since` call with `batches`.
    pub fn push_deltas(&self, batches: Vec<ChatListDelta>) {
        self.push_deltas_then_fail(batches, None);
    }

    pub fn push_deltas_then_fail(&self, batches: Vec<ChatListDelta>, then_fail: Option<RemoteError>) {
        let pages = batches
            .iter()
            .map(|b| encode_delta_page(b).unwrap())
            .collect();
        self.lock().delta_scripts.push_back(DeltaScript {
            pages,
            then_fail,
            then_hang: false,
        });
    }

    /// Serve `batches`, then keep the stream open without another page.
    pub fn push_deltas_then_hang(&self, batches: Vec<ChatListDelta>) {
        let pages = batches
            .iter()
            .map(|b| encode_delta_page(b).unwrap())
            .collect();
        self.lock().delta_scripts.push_back(DeltaScript {
            pages,
            then_fail: None,
            then_hang: true,
        });
    }

    /// Statuses streamed back for every send or edit.
    pub fn script_progress(&self, statuses: Vec<DeliveryStatus>) {
        self.lock().progress = statuses.into_iter().map(Ok).collect();
    }

    pub fn script_progress_results(&self, results: Vec<Result<DeliveryStatus, RemoteError>>) {
        self.lock().progress = results;
    }

    /// Fail the next request/response call.
    pub fn fail_next(&self, error: RemoteError) {
        self.lock().fail_next = Some(error);
    }

    pub fn offer_chat(&self, chat: Chat) {
        self.lock().joinable.insert(chat.id, chat);
    }

    pub fn since_calls(&self) -> Vec<Option<DateTime<Utc>>> {
        self.lock().since_calls.clone()
    }

    pub fn sent(&self) -> Vec<Message> {
        self.lock().sent.clone()
    }

    pub fn created(&self) -> Vec<ChatId> {
        self.lock().created.clone()
    }

    pub fn deleted_chats(&self) -> Vec<ChatId> {
        self.lock().deleted_chats.clone()
    }

    pub fn deleted_messages(&self) -> Vec<(MessageId, DeleteMode)> {
        self.lock().deleted_messages.clone()
    }

    pub fn read_marks(&self) -> Vec<(ChatId, MessageId)> {
        self.lock().read_marks.clone()
    }

    fn take_failure(&self) -> Result<(), RemoteError> {
        match self.lock().fail_next.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn progress_for(&self, message: Message) -> BoxStream<'static, Result<Message, RemoteError>> {
        let items: Vec<Result<Message, RemoteError>> = self
            .lock()
            .progress
            .iter()
            .map(|step| step.clone().map(|s| message.clone().with_status(s)))
            .collect();
        stream::iter(items).boxed()
    }
}

#[async_trait]
impl RemoteSource for MemoryRemote {
    async fn create_chat(&self, chat: &Chat) -> Result<Chat, RemoteError> {
        self.take_failure()?;
        self.lock().created.push(chat.id);
        Ok(chat.clone())
    }

    async fn delete_chat(&self, chat_id: ChatId) -> Result<(), RemoteError> {
        self.take_failure()?;
        self.lock().deleted_chats.push(chat_id);
        Ok(())
    }

    async fn join_chat(
        &self,
        chat_id: ChatId,
        _invite_link: Option<&str>,
    ) -> Result<Chat, RemoteError> {
        self.take_failure()?;
        self.lock()
            .joinable
            .get(&chat_id)
            .cloned()
            .ok_or(RemoteError::ChatNotFound(chat_id))
    }

    async fn leave_chat(&self, chat_id: ChatId) -> Result<(), RemoteError> {
        self.take_failure()?;
        self.lock().left.push(chat_id);
        Ok(())
    }

    fn deltas_since(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> BoxStream<'static, Result<ChatListDelta, RemoteError>> {
        let script = {
            let mut inner = self.lock();
            inner.since_calls.push(since);
            inner.delta_scripts.pop_front().unwrap_or_default()
        };

        let mut items: Vec<Result<ChatListDelta, RemoteError>> = script
            .pages
            .iter()
            .map(|json| decode_delta_page(json))
            .collect();
        if let Some(e) = script.then_fail {
            items.push(Err(e));
        }
        if script.then_hang {
            return stream::iter(items).chain(stream::pending()).boxed();
        }
        stream::iter(items).boxed()
    }

    fn send_message(&self, message: Message) -> BoxStream<'static, Result<Message, RemoteError>> {
        self.lock().sent.push(message.clone());
        self.progress_for(message)
    }

    fn edit_message(&self, message: Message) -> BoxStream<'static, Result<Message, RemoteError>> {
        self.lock().edited.push(message.clone());
        self.progress_for(message)
    }

    async fn delete_message(
        &self,
        message_id: MessageId,
        mode: DeleteMode,
    ) -> Result<(), RemoteError> {
        self.take_failure()?;
        self.lock().deleted_messages.push((message_id, mode));
        Ok(())
    }

    async fn mark_messages_as_read(
        &self,
        chat_id: ChatId,
        up_to: MessageId,
    ) -> Result<(), RemoteError> {
        self.take_failure()?;
        self.lock().read_marks.push((chat_id, up_to));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub remote: Arc<MemoryRemote>,
    pub clock: Arc<ManualClock>,
    pub coordinator: SyncCoordinator,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_store(ChatStore::in_memory())
    }

    pub fn with_store(store: ChatStore) -> Self {
        let remote = MemoryRemote::new();
        let clock = Arc::new(ManualClock::new(t0()));
        let config = ClientConfig {
            poll_interval: StdDuration::from_millis(20),
            catch_up_interval: StdDuration::from_millis(5),
            retry_interval: StdDuration::from_millis(20),
            ..ClientConfig::default()
        };
        let coordinator = SyncCoordinator::new(remote.clone(), store, config)
            .with_clock(clock.clone());
        Self {
            remote,
            clock,
            coordinator,
        }
    }

    pub fn store(&self) -> &ChatStore {
        self.coordinator.store()
    }

    /// Put `chat` straight into the local cache.
    pub async fn seed(&self, chat: Chat) -> Chat {
        self.store().insert_chat(chat.clone()).await.unwrap();
        chat
    }

    /// Put a message straight into the local cache.
    pub async fn seed_message(&self, sender: &Participant, chat: ChatId, at: DateTime<Utc>) -> Message {
        let message = Message::new(sender.clone(), chat, "seeded", at);
        self.store().upsert_message(message.clone()).await.unwrap();
        message
    }

    /// Send `text` as `sender` at the current clock reading and drain the
    /// progress stream.
    pub async fn send(
        &self,
        sender: &Participant,
        chat: ChatId,
        text: &str,
    ) -> parley_client::Result<Vec<parley_client::Result<Message>>> {
        let message = Message::new(sender.clone(), chat, text, self.clock.now());
        let progress = self.coordinator.send_message(message)?;
        Ok(progress.collect().await)
    }
}
