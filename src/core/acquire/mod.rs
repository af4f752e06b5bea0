//! Reply acquisition across transports.
//!
//! [`ResponseAcquirer::acquire`] turns a [`Conversation`] plus a
//! [`TransportDescriptor`] into one final reply string or a [`Failure`]
//! value. Streaming transports are drained internally; callers that want to
//! watch progress pass a snapshot sink through [`AcquireOptions`].
//!
//! Acquisitions sharing a thread id run one at a time. Different thread ids
//! are independent.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::core::conversation::Conversation;
use crate::core::failure::Failure;
use crate::core::message::ConversationMessage;
use crate::core::transport::TransportDescriptor;

mod buffered;
mod direct;
mod streaming;
mod subprocess;


pub use subprocess::{render_script, NO_RESPONSE_PLACEHOLDER};

/// `Ok` always holds a non-empty reply.
pub type AcquisitionResult = Result<String, Failure>;

const HTTP_CONNECT_TIMEOUT_SECONDS: u64 = 10;
const HTTP_POOL_IDLE_TIMEOUT_SECONDS: u64 = 90;

pub struct AcquireOptions {
    pub timeout: Duration,
    /// Receives each cumulative snapshot of a streaming reply.
    pub snapshots: Option<mpsc::UnboundedSender<String>>,
    pub cancel: Option<CancellationToken>,
}

impl AcquireOptions {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            snapshots: None,
            cancel: None,
        }
    }

    pub fn with_snapshots(mut self, sink: mpsc::UnboundedSender<String>) -> Self {
        self.snapshots = Some(sink);
        self
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

pub struct ResponseAcquirer {
    client: reqwest::Client,
    thread_locks: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

pub fn build_http_client() -> Result<reqwest::Client, String> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECONDS))
        .pool_idle_timeout(Duration::from_secs(HTTP_POOL_IDLE_TIMEOUT_SECONDS))
        .build()
        .map_err(|err| err.to_string())
}

impl ResponseAcquirer {
    pub fn new() -> Result<Self, String> {
        Ok(Self::with_client(build_http_client()?))
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            thread_locks: StdMutex::new(HashMap::new()),
        }
    }

    pub async fn acquire(
        &self,
        conversation: &Conversation,
        transport: &TransportDescriptor,
        timeout: Duration,
    ) -> AcquisitionResult {
        self.acquire_with(conversation, transport, AcquireOptions::new(timeout))
            .await
    }

    pub async fn acquire_with(
        &self,
        conversation: &Conversation,
        transport: &TransportDescriptor,
        options: AcquireOptions,
    ) -> AcquisitionResult {
        let AcquireOptions {
            timeout,
            snapshots,
            cancel,
        } = options;
        let thread_lock = self.thread_lock(conversation.thread_id());

        // Waiting for an earlier turn on the same thread is cancellable too.
        let work = async {
            let _turn = thread_lock.lock().await;

            let messages = transport.history().select(conversation.messages());
            debug!(
                transport = transport.name(),
                thread_id = %conversation.thread_id(),
                forwarded = messages.len(),
                history = transport.history().as_str(),
                timeout_secs = timeout.as_secs_f64(),
                "Acquiring reply"
            );
            self.dispatch(conversation, transport, &messages, timeout, snapshots)
                .await
        };

        let result = match cancel {
            Some(token) => {
                tokio::select! {
                    result = work => result,
                    _ = token.cancelled() => Err(Failure::cancelled()),
                }
            }
            None => work.await,
        };

        match &result {
            Ok(reply) => debug!(chars = reply.chars().count(), "Reply acquired"),
            Err(failure) => debug!(kind = %failure.kind, message = %failure.message, "Acquisition failed"),
        }
        result
    }

    async fn dispatch(
        &self,
        conversation: &Conversation,
        transport: &TransportDescriptor,
        messages: &[ConversationMessage],
        timeout: Duration,
        snapshots: Option<mpsc::UnboundedSender<String>>,
    ) -> AcquisitionResult {
        match transport {
            TransportDescriptor::DirectCall(call) => {
                direct::acquire(call, messages, conversation.thread_id(), timeout).await
            }
            TransportDescriptor::BufferedRequest(target) => {
                buffered::acquire(
                    &self.client,
                    target,
                    messages,
                    conversation.thread_id(),
                    timeout,
                )
                .await
            }
            TransportDescriptor::StreamingRequest(target) => {
                streaming::acquire(
                    &self.client,
                    streaming::StreamTurn {
                        target,
                        messages,
                        thread_id: conversation.thread_id(),
                        resource_id: conversation.resource_id(),
                    },
                    timeout,
                    snapshots.as_ref(),
                )
                .await
            }
            TransportDescriptor::SubprocessCall(target) => {
                subprocess::acquire(target, messages, conversation.thread_id(), timeout).await
            }
        }
    }

    fn thread_lock(&self, thread_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self
            .thread_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // Locks nobody else holds a handle to belong to finished turns.
        locks.retain(|id, lock| id == thread_id || Arc::strong_count(lock) > 1);
        locks
            .entry(thread_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    #[cfg(test)]
    pub(crate) fn tracked_threads(&self) -> usize {
        self.thread_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}
