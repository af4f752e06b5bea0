use std::path::PathBuf;
use std::time::Duration;

use crate::core::config::data::{Config, SubprocessConfig, TimeoutConfig, TransportKind};
use crate::core::config::io::ConfigError;
use crate::core::conversation::{Conversation, DEFAULT_THREAD_PREFIX};
use crate::core::transport::{
    default_runtime_args, HistoryPolicy, HttpTarget, SubprocessTarget, TransportDescriptor,
    DEFAULT_AGENT_MODULE, DEFAULT_AGENT_NAME, DEFAULT_BUFFERED_TIMEOUT_SECONDS, DEFAULT_ENDPOINT,
    DEFAULT_RUNTIME, DEFAULT_STREAMING_TIMEOUT_SECONDS, DEFAULT_SUBPROCESS_TIMEOUT_SECONDS,
};
use crate::utils::url::normalize_base_url;

impl Config {
    /// A configuration with every commonly edited key spelled out, as
    /// written by `citychat config init`.
    pub fn starter() -> Config {
        Config {
            transport: Some(TransportKind::default()),
            endpoint: Some(DEFAULT_ENDPOINT.to_string()),
            agent: Some(DEFAULT_AGENT_NAME.to_string()),
            history: None,
            empty_reply_text: None,
            thread_prefix: Some(DEFAULT_THREAD_PREFIX.to_string()),
            timeouts: TimeoutConfig {
                buffered: Some(DEFAULT_BUFFERED_TIMEOUT_SECONDS),
                streaming: Some(DEFAULT_STREAMING_TIMEOUT_SECONDS),
                subprocess: Some(DEFAULT_SUBPROCESS_TIMEOUT_SECONDS),
            },
            subprocess: SubprocessConfig {
                runtime: Some(DEFAULT_RUNTIME.to_string()),
                args: Some(default_runtime_args()),
                working_dir: None,
                module: Some(PathBuf::from(DEFAULT_AGENT_MODULE)),
            },
        }
    }

    pub fn transport_kind(&self) -> TransportKind {
        self.transport.unwrap_or_default()
    }

    pub fn endpoint(&self) -> String {
        normalize_base_url(self.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT))
    }

    pub fn agent_name(&self) -> &str {
        self.agent.as_deref().unwrap_or(DEFAULT_AGENT_NAME)
    }

    pub fn thread_prefix(&self) -> &str {
        self.thread_prefix
            .as_deref()
            .unwrap_or(DEFAULT_THREAD_PREFIX)
    }

    /// HTTP backends get the full transcript unless told otherwise; the
    /// subprocess agent recalls earlier turns from its own memory.
    pub fn history_for(&self, kind: TransportKind) -> HistoryPolicy {
        self.history.unwrap_or(match kind {
            TransportKind::Buffered | TransportKind::Streaming => HistoryPolicy::Full,
            TransportKind::Subprocess => HistoryPolicy::LatestMessage,
        })
    }

    pub fn timeout_for(&self, kind: TransportKind) -> Duration {
        let seconds = match kind {
            TransportKind::Buffered => self
                .timeouts
                .buffered
                .unwrap_or(DEFAULT_BUFFERED_TIMEOUT_SECONDS),
            TransportKind::Streaming => self
                .timeouts
                .streaming
                .unwrap_or(DEFAULT_STREAMING_TIMEOUT_SECONDS),
            TransportKind::Subprocess => self
                .timeouts
                .subprocess
                .unwrap_or(DEFAULT_SUBPROCESS_TIMEOUT_SECONDS),
        };
        Duration::from_secs(seconds)
    }

    pub fn new_conversation(&self) -> Conversation {
        Conversation::new(self.thread_prefix())
    }

    /// Builds the transport this configuration selects, validating the
    /// values it depends on.
    pub fn transport(&self) -> Result<TransportDescriptor, ConfigError> {
        self.validate()?;
        let kind = self.transport_kind();
        let history = self.history_for(kind);

        let descriptor = match kind {
            TransportKind::Buffered | TransportKind::Streaming => {
                let target = HttpTarget::new(self.endpoint(), self.agent_name())
                    .with_history(history)
                    .with_empty_reply_text(self.empty_reply_text.clone());
                if kind == TransportKind::Buffered {
                    TransportDescriptor::BufferedRequest(target)
                } else {
                    TransportDescriptor::StreamingRequest(target)
                }
            }
            TransportKind::Subprocess => {
                let working_dir = match &self.subprocess.working_dir {
                    Some(dir) => dir.clone(),
                    None => std::env::current_dir().map_err(|err| {
                        ConfigError::invalid("subprocess.working_dir", err.to_string())
                    })?,
                };
                let mut target = SubprocessTarget::new(
                    self.subprocess
                        .runtime
                        .as_deref()
                        .unwrap_or(DEFAULT_RUNTIME),
                    working_dir,
                );
                if let Some(args) = &self.subprocess.args {
                    target.runtime_args = args.clone();
                }
                target.module = self
                    .subprocess
                    .module
                    .clone()
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_AGENT_MODULE));
                target.agent_name = self.agent_name().to_string();
                target.history = history;
                TransportDescriptor::SubprocessCall(target)
            }
        };
        Ok(descriptor)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.agent_name().trim().is_empty() {
            return Err(ConfigError::invalid("agent", "agent name must not be empty"));
        }
        if self.thread_prefix().trim().is_empty() {
            return Err(ConfigError::invalid(
                "thread_prefix",
                "thread prefix must not be empty",
            ));
        }

        match self.transport_kind() {
            TransportKind::Buffered | TransportKind::Streaming => {
                let endpoint = self.endpoint();
                let url = reqwest::Url::parse(&endpoint)
                    .map_err(|err| ConfigError::invalid("endpoint", format!("{endpoint}: {err}")))?;
                if !matches!(url.scheme(), "http" | "https") {
                    return Err(ConfigError::invalid(
                        "endpoint",
                        format!("{endpoint}: expected an http or https URL"),
                    ));
                }
            }
            TransportKind::Subprocess => {
                if let Some(runtime) = &self.subprocess.runtime {
                    if runtime.trim().is_empty() {
                        return Err(ConfigError::invalid(
                            "subprocess.runtime",
                            "runtime must not be empty",
                        ));
                    }
                }
            }
        }

        let kind = self.transport_kind();
        if self.timeout_for(kind).is_zero() {
            return Err(ConfigError::invalid(
                "timeouts",
                format!("{kind} timeout must be at least one second"),
            ));
        }
        Ok(())
    }
}
