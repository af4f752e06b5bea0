//! Transport descriptors for reply acquisition.
//!
//! A deployment picks exactly one [`TransportDescriptor`]:
//! - [`TransportDescriptor::DirectCall`] for an agent living in this process.
//! - [`TransportDescriptor::BufferedRequest`] for a single `/generate` POST.
//! - [`TransportDescriptor::StreamingRequest`] for an SSE `/stream` POST that
//!   falls back to `/generate` when no text arrives.
//! - [`TransportDescriptor::SubprocessCall`] for a spawned script runtime.

use async_trait::async_trait;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::core::message::ConversationMessage;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:4111/api";
pub const DEFAULT_AGENT_NAME: &str = "cityAssistantAgent";
pub const DEFAULT_RUNTIME: &str = "node";
pub const DEFAULT_AGENT_MODULE: &str = "src/mastra/index.ts";
/// Lets the runtime import the TypeScript agent module.
pub const DEFAULT_RUNTIME_ARGS: &[&str] = &["--loader", "tsx"];

pub const DEFAULT_DIRECT_TIMEOUT_SECONDS: u64 = 60;
pub const DEFAULT_BUFFERED_TIMEOUT_SECONDS: u64 = 60;
pub const DEFAULT_STREAMING_TIMEOUT_SECONDS: u64 = 120;
pub const DEFAULT_SUBPROCESS_TIMEOUT_SECONDS: u64 = 60;

/// Which part of the transcript a transport forwards to the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum HistoryPolicy {
    /// Every turn, in chronological order.
    #[default]
    Full,
    /// Only the most recent user message; the backend recalls the rest by thread id.
    #[serde(alias = "latest")]
    #[value(alias = "latest")]
    LatestMessage,
}

impl HistoryPolicy {
    pub fn select(self, messages: &[ConversationMessage]) -> Vec<ConversationMessage> {
        match self {
            HistoryPolicy::Full => messages.to_vec(),
            HistoryPolicy::LatestMessage => messages
                .iter()
                .rev()
                .find(|msg| msg.role.is_user())
                .cloned()
                .into_iter()
                .collect(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HistoryPolicy::Full => "full",
            HistoryPolicy::LatestMessage => "latest-message",
        }
    }
}

/// In-process agent capability.
///
/// The returned value mirrors the agent's result object; its `text` field is
/// the reply when present.
#[async_trait]
pub trait AgentHandle: Send + Sync {
    async fn generate(
        &self,
        messages: &[ConversationMessage],
        thread_id: &str,
    ) -> Result<serde_json::Value, String>;
}

#[derive(Clone)]
pub struct DirectCall {
    pub agent: Arc<dyn AgentHandle>,
    pub history: HistoryPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpTarget {
    /// Base URL including the API prefix, e.g. `http://localhost:4111/api`.
    pub endpoint: String,
    pub agent_name: String,
    pub history: HistoryPolicy,
    /// Reply to use when `/generate` succeeds without text. `None` reports
    /// the empty reply as a failure.
    pub empty_reply_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubprocessTarget {
    pub runtime: String,
    /// Arguments placed before the script path, e.g. `["--import", "tsx"]`.
    pub runtime_args: Vec<String>,
    pub working_dir: PathBuf,
    /// Module exporting `mastra`, relative to `working_dir` unless absolute.
    pub module: PathBuf,
    pub agent_name: String,
    pub history: HistoryPolicy,
}

#[derive(Clone)]
pub enum TransportDescriptor {
    DirectCall(DirectCall),
    BufferedRequest(HttpTarget),
    StreamingRequest(HttpTarget),
    SubprocessCall(SubprocessTarget),
}

impl HttpTarget {
    pub fn new(endpoint: impl Into<String>, agent_name: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            agent_name: agent_name.into(),
            history: HistoryPolicy::default(),
            empty_reply_text: None,
        }
    }

    pub fn with_history(mut self, history: HistoryPolicy) -> Self {
        self.history = history;
        self
    }

    pub fn with_empty_reply_text(mut self, text: Option<String>) -> Self {
        self.empty_reply_text = text;
        self
    }
}

pub fn default_runtime_args() -> Vec<String> {
    DEFAULT_RUNTIME_ARGS.iter().map(|arg| arg.to_string()).collect()
}

impl SubprocessTarget {
    pub fn new(runtime: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            runtime: runtime.into(),
            runtime_args: default_runtime_args(),
            working_dir: working_dir.into(),
            module: PathBuf::from(DEFAULT_AGENT_MODULE),
            agent_name: DEFAULT_AGENT_NAME.to_string(),
            history: HistoryPolicy::LatestMessage,
        }
    }

    pub fn module_path(&self) -> PathBuf {
        if self.module.is_absolute() {
            self.module.clone()
        } else {
            self.working_dir.join(&self.module)
        }
    }
}

impl TransportDescriptor {
    pub fn name(&self) -> &'static str {
        match self {
            TransportDescriptor::DirectCall(_) => "direct",
            TransportDescriptor::BufferedRequest(_) => "buffered",
            TransportDescriptor::StreamingRequest(_) => "streaming",
            TransportDescriptor::SubprocessCall(_) => "subprocess",
        }
    }

    pub fn history(&self) -> HistoryPolicy {
        match self {
            TransportDescriptor::DirectCall(call) => call.history,
            TransportDescriptor::BufferedRequest(target)
            | TransportDescriptor::StreamingRequest(target) => target.history,
            TransportDescriptor::SubprocessCall(target) => target.history,
        }
    }

    pub fn default_timeout(&self) -> Duration {
        let seconds = match self {
            TransportDescriptor::DirectCall(_) => DEFAULT_DIRECT_TIMEOUT_SECONDS,
            TransportDescriptor::BufferedRequest(_) => DEFAULT_BUFFERED_TIMEOUT_SECONDS,
            TransportDescriptor::StreamingRequest(_) => DEFAULT_STREAMING_TIMEOUT_SECONDS,
            TransportDescriptor::SubprocessCall(_) => DEFAULT_SUBPROCESS_TIMEOUT_SECONDS,
        };
        Duration::from_secs(seconds)
    }
}

impl fmt::Debug for TransportDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportDescriptor::DirectCall(call) => f
                .debug_struct("DirectCall")
                .field("history", &call.history)
                .finish_non_exhaustive(),
            TransportDescriptor::BufferedRequest(target) => {
                f.debug_tuple("BufferedRequest").field(target).finish()
            }
            TransportDescriptor::StreamingRequest(target) => {
                f.debug_tuple("StreamingRequest").field(target).finish()
            }
            TransportDescriptor::SubprocessCall(target) => {
                f.debug_tuple("SubprocessCall").field(target).finish()
            }
        }
    }
}
