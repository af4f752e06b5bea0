use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::core::transport::HistoryPolicy;

/// Network or process transport selectable from configuration.
///
/// The in-process direct call is only reachable through the library API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum TransportKind {
    Buffered,
    #[default]
    Streaming,
    Subprocess,
}

impl TransportKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TransportKind::Buffered => "buffered",
            TransportKind::Streaming => "streaming",
            TransportKind::Subprocess => "subprocess",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-transport deadlines, in seconds.
///
/// The in-process direct call takes its deadline from the caller.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct TimeoutConfig {
    pub buffered: Option<u64>,
    pub streaming: Option<u64>,
    pub subprocess: Option<u64>,
}

impl TimeoutConfig {
    fn is_empty(&self) -> bool {
        self == &TimeoutConfig::default()
    }
}

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct SubprocessConfig {
    /// Script runtime executable (e.g., "node", "bun")
    pub runtime: Option<String>,
    /// Arguments passed to the runtime before the script path; unset means
    /// the TypeScript loader arguments
    pub args: Option<Vec<String>>,
    /// Directory the agent project lives in; defaults to the current directory
    pub working_dir: Option<PathBuf>,
    /// Module exporting the `mastra` instance, relative to `working_dir`
    pub module: Option<PathBuf>,
}

impl SubprocessConfig {
    fn is_empty(&self) -> bool {
        self == &SubprocessConfig::default()
    }
}

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct Config {
    pub transport: Option<TransportKind>,
    /// Backend base URL including the API prefix
    pub endpoint: Option<String>,
    /// Agent name exposed by the backend
    pub agent: Option<String>,
    /// Which part of the transcript is forwarded with each turn
    pub history: Option<HistoryPolicy>,
    /// Reply used when `/generate` succeeds without any text
    pub empty_reply_text: Option<String>,
    /// Prefix for generated conversation thread ids
    pub thread_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "TimeoutConfig::is_empty")]
    pub timeouts: TimeoutConfig,
    #[serde(default, skip_serializing_if = "SubprocessConfig::is_empty")]
    pub subprocess: SubprocessConfig,
}

pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}
