use std::time::{Duration, Instant};

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tracing::debug;

use super::{buffered, AcquisitionResult};
use crate::api::{to_api_messages, StreamRequest};
use crate::core::failure::{classify_reqwest_error, Failure};
use crate::core::message::ConversationMessage;
use crate::core::sse::{data_payload, is_done_marker, snapshot_text, SseLineBuffer};
use crate::core::transport::{HttpTarget, DEFAULT_BUFFERED_TIMEOUT_SECONDS};
use crate::utils::url::stream_url;

pub(super) struct StreamTurn<'a> {
    pub target: &'a HttpTarget,
    pub messages: &'a [ConversationMessage],
    pub thread_id: &'a str,
    pub resource_id: &'a str,
}

pub(super) async fn acquire(
    client: &reqwest::Client,
    turn: StreamTurn<'_>,
    timeout: Duration,
    snapshots: Option<&mpsc::UnboundedSender<String>>,
) -> AcquisitionResult {
    let url = stream_url(&turn.target.endpoint, &turn.target.agent_name);
    let request = StreamRequest {
        messages: to_api_messages(turn.messages),
        thread_id: turn.thread_id.to_string(),
        resource_id: turn.resource_id.to_string(),
    };
    debug!(url = %url, thread_id = turn.thread_id, resource_id = turn.resource_id, "Opening reply stream");
    let started = Instant::now();

    let response = client
        .post(&url)
        .header("Content-Type", "application/json")
        .header("Accept", "text/event-stream")
        .timeout(timeout)
        .json(&request)
        .send()
        .await
        .map_err(|err| classify_reqwest_error(&err))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());
        return Err(Failure::remote_error(format!("{status}: {}", body.trim())));
    }

    let mut stream = response.bytes_stream();
    let mut lines = SseLineBuffer::default();
    let mut accumulator = SnapshotAccumulator::default();

    'read: while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|err| classify_reqwest_error(&err))?;
        for line in lines.push(&chunk) {
            if accumulator.apply_line(&line, snapshots) {
                break 'read;
            }
        }
    }
    for line in lines.finish() {
        accumulator.apply_line(&line, snapshots);
    }

    debug!(
        records = accumulator.records,
        snapshots = accumulator.snapshots,
        "Reply stream drained"
    );

    if accumulator.text.trim().is_empty() {
        // The fallback shares the turn's deadline.
        let remaining = timeout.saturating_sub(started.elapsed());
        if remaining.is_zero() {
            return Err(Failure::timeout(format!(
                "stream carried no text within {timeout:?}"
            )));
        }
        let fallback_timeout = remaining.min(Duration::from_secs(DEFAULT_BUFFERED_TIMEOUT_SECONDS));
        debug!(
            thread_id = turn.thread_id,
            fallback_secs = fallback_timeout.as_secs_f64(),
            "Stream carried no text; falling back to generate"
        );
        return buffered::acquire(
            client,
            turn.target,
            turn.messages,
            turn.thread_id,
            fallback_timeout,
        )
        .await;
    }

    Ok(accumulator.text)
}

/// Running state of a streamed reply.
///
/// The server resends the whole reply so far in every event, so each `text`
/// replaces the buffer instead of extending it.
#[derive(Default)]
pub(super) struct SnapshotAccumulator {
    pub text: String,
    pub records: usize,
    pub snapshots: usize,
}

impl SnapshotAccumulator {
    /// Returns true once the stream signals completion.
    pub fn apply_line(
        &mut self,
        line: &str,
        sink: Option<&mpsc::UnboundedSender<String>>,
    ) -> bool {
        let Some(payload) = data_payload(line) else {
            return false;
        };
        self.records += 1;

        if is_done_marker(payload) {
            return true;
        }

        if let Some(text) = snapshot_text(payload) {
            self.snapshots += 1;
            if let Some(sink) = sink {
                let _ = sink.send(text.clone());
            }
            self.text = text;
        }
        false
    }
}
