use std::error::Error as StdError;
use std::fmt;

/// Classification of a failed acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Connection refused, DNS failure, or the link dropped mid-response.
    Unreachable,
    /// The backend answered with a non-success HTTP status.
    RemoteError,
    /// The backend succeeded but produced no usable text.
    EmptyReply,
    /// The deadline passed before a reply arrived.
    Timeout,
    /// The agent itself raised an error or exited non-zero.
    AgentFault,
    /// The backend answered with data that could not be interpreted.
    MalformedOutput,
    /// The caller cancelled the acquisition.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::Unreachable => "unreachable",
            FailureKind::RemoteError => "remote-error",
            FailureKind::EmptyReply => "empty-reply",
            FailureKind::Timeout => "timeout",
            FailureKind::AgentFault => "agent-fault",
            FailureKind::MalformedOutput => "malformed-output",
            FailureKind::Cancelled => "cancelled",
        }
    }
}

impl Failure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Unreachable, message)
    }

    pub fn remote_error(message: impl Into<String>) -> Self {
        Self::new(FailureKind::RemoteError, message)
    }

    pub fn empty_reply(message: impl Into<String>) -> Self {
        Self::new(FailureKind::EmptyReply, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Timeout, message)
    }

    pub fn agent_fault(message: impl Into<String>) -> Self {
        Self::new(FailureKind::AgentFault, message)
    }

    pub fn malformed_output(message: impl Into<String>) -> Self {
        Self::new(FailureKind::MalformedOutput, message)
    }

    pub fn cancelled() -> Self {
        Self::new(FailureKind::Cancelled, "Request cancelled.")
    }

    /// Text appended to the transcript in place of the assistant reply.
    pub fn reply_text(&self) -> String {
        match self.kind {
            FailureKind::Unreachable => format!(
                "⚠️ Connection failed. Please make sure the agent server is running.\n\n{}",
                self.message
            ),
            FailureKind::RemoteError => format!(
                "I'm having trouble reaching the assistant right now (API Error: {}).",
                self.message
            ),
            FailureKind::EmptyReply => {
                "I apologize, but I couldn't generate a response.".to_string()
            }
            FailureKind::Timeout => "Request timed out. Please try again.".to_string(),
            FailureKind::AgentFault => format!("I encountered an error: {}", self.message),
            FailureKind::MalformedOutput => format!(
                "The assistant returned a response I couldn't read: {}",
                self.message
            ),
            FailureKind::Cancelled => "Request cancelled.".to_string(),
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl StdError for Failure {}

/// Maps a `reqwest` transport error onto the failure taxonomy.
pub fn classify_reqwest_error(err: &reqwest::Error) -> Failure {
    if err.is_timeout() {
        Failure::timeout(err.to_string())
    } else if err.is_decode() {
        Failure::malformed_output(err.to_string())
    } else {
        Failure::unreachable(err.to_string())
    }
}
