//! Text-submission entry point for one chat session.
//!
//! [`ChatSession`] owns the conversation, filters blank input before it can
//! reach the acquirer, and records every outcome as an assistant turn so the
//! transcript never skips a reply.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::warn;

use crate::core::acquire::{AcquireOptions, ResponseAcquirer};
use crate::core::conversation::Conversation;
use crate::core::failure::Failure;
use crate::core::message::ConversationMessage;
use crate::core::transport::TransportDescriptor;
use crate::utils::logging::TranscriptLog;

pub const USER_DISPLAY_NAME: &str = "You";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    BlankInput,
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitError::BlankInput => write!(f, "Message is empty; nothing was sent."),
        }
    }
}

impl StdError for SubmitError {}

/// What a submitted turn produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    /// Text appended to the transcript as the assistant turn.
    pub reply: String,
    pub failure: Option<Failure>,
}

impl TurnOutcome {
    pub fn is_failure(&self) -> bool {
        self.failure.is_some()
    }
}

pub struct ChatSession {
    conversation: Conversation,
    transport: TransportDescriptor,
    timeout: Duration,
    acquirer: Arc<ResponseAcquirer>,
    transcript: TranscriptLog,
}

impl ChatSession {
    pub fn new(
        acquirer: Arc<ResponseAcquirer>,
        transport: TransportDescriptor,
        timeout: Duration,
        conversation: Conversation,
    ) -> Self {
        Self {
            conversation,
            transport,
            timeout,
            acquirer,
            transcript: TranscriptLog::disabled(),
        }
    }

    pub fn with_transcript(mut self, transcript: TranscriptLog) -> Self {
        self.transcript = transcript;
        self
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn transport(&self) -> &TransportDescriptor {
        &self.transport
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn transcript(&self) -> &TranscriptLog {
        &self.transcript
    }

    pub fn transcript_mut(&mut self) -> &mut TranscriptLog {
        &mut self.transcript
    }

    pub async fn submit(&mut self, input: &str) -> Result<TurnOutcome, SubmitError> {
        self.submit_with(input, None).await
    }

    /// Sends one user turn; streaming snapshots go to `snapshots` when given.
    pub async fn submit_with(
        &mut self,
        input: &str,
        snapshots: Option<mpsc::UnboundedSender<String>>,
    ) -> Result<TurnOutcome, SubmitError> {
        if input.trim().is_empty() {
            return Err(SubmitError::BlankInput);
        }

        self.append(ConversationMessage::user(input));

        let mut options = AcquireOptions::new(self.timeout);
        if let Some(sink) = snapshots {
            options = options.with_snapshots(sink);
        }
        let result = self
            .acquirer
            .acquire_with(&self.conversation, &self.transport, options)
            .await;

        let outcome = match result {
            Ok(reply) => TurnOutcome {
                reply,
                failure: None,
            },
            Err(failure) => {
                warn!(kind = %failure.kind, message = %failure.message, "Reply acquisition failed");
                TurnOutcome {
                    reply: failure.reply_text(),
                    failure: Some(failure),
                }
            }
        };

        self.append(ConversationMessage::assistant(outcome.reply.clone()));
        Ok(outcome)
    }

    /// Empties the transcript and starts a new backend thread.
    pub fn clear(&mut self) {
        self.conversation.clear();
        let note = format!("Chat cleared (thread {})", self.conversation.thread_id());
        if let Err(err) = self.transcript.log_note(&note) {
            warn!(error = %err, "Unable to write transcript log");
        }
    }

    fn append(&mut self, message: ConversationMessage) {
        if let Err(err) = self.transcript.log_turn(&message, USER_DISPLAY_NAME) {
            warn!(error = %err, "Unable to write transcript log");
        }
        self.conversation.push(message);
    }
}
