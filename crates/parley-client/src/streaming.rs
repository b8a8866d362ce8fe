//! Forwarding of send/edit progress with delivery-status validation.
//!
//! Every update from the remote is checked against the previous status.
//! The first rejected transition, or the first remote failure, ends the
//! call: one error is yielded and the remote stream is dropped, so nothing
//! later in it can reach the caller or the store.

use std::sync::Arc;

use futures::stream::{self, BoxStream};
use futures::StreamExt;
use parley_shared::{DeliveryStatus, DeliveryStatusPolicy, Message, MessageId};
use parley_store::ChatStore;
use tracing::{debug, warn};

use crate::error::{ClientError, RemoteError};

struct Guard {
    message_id: MessageId,
    updates: Option<BoxStream<'static, Result<Message, RemoteError>>>,
    last: Option<DeliveryStatus>,
    policy: Arc<dyn DeliveryStatusPolicy>,
    store: ChatStore,
}

impl Guard {
    /// Yield `err` and stop listening to the remote.
    fn fail(mut self, err: ClientError) -> Option<(Result<Message, ClientError>, Self)> {
        self.updates = None;
        Some((Err(err), self))
    }
}

/// Wrap a remote progress stream.
///
/// Accepted updates are written to `store` before they are yielded.
pub(crate) fn guarded_progress(
    message_id: MessageId,
    initial: Option<DeliveryStatus>,
    updates: BoxStream<'static, Result<Message, RemoteError>>,
    policy: Arc<dyn DeliveryStatusPolicy>,
    store: ChatStore,
) -> BoxStream<'static, Result<Message, ClientError>> {
    let guard = Guard {
        message_id,
        updates: Some(updates),
        last: initial,
        policy,
        store,
    };

    stream::unfold(guard, |mut guard| async move {
        let next = guard.updates.as_mut()?.next().await;
        let update = match next {
            None => {
                debug!(message = %guard.message_id, "progress stream finished");
                return None;
            }
            Some(Err(e)) => {
                warn!(message = %guard.message_id, error = %e, "remote failed during delivery");
                return guard.fail(e.into());
            }
            Some(Ok(update)) => update,
        };

        let expected = guard.message_id;
        if update.id != expected {
            return guard.fail(ClientError::Remote(RemoteError::ServerError(format!(
                "progress for message {} arrived on the stream of {expected}",
                update.id
            ))));
        }

        let status = update.delivery_status.as_ref();
        if let Err(e) = guard.policy.validate(guard.last.as_ref(), status) {
            warn!(
                message = %expected,
                error = %e,
                "invalid delivery status transition, cancelling progress stream"
            );
            return guard.fail(e.into());
        }
        if let Some(status) = status {
            guard.last = Some(status.clone());
        }

        if let Err(e) = guard.store.upsert_message(update.clone()).await {
            warn!(message = %guard.message_id, error = %e, "failed to store delivery progress");
            return guard.fail(e.into());
        }

        Some((Ok(update), guard))
    })
    .boxed()
}
