//! Caller-owned conversation state.
//!
//! A [`Conversation`] bundles the ordered transcript with the identifiers the
//! backend uses to group turns: the thread id (reset on clear) and the
//! resource id (stable for the lifetime of the session).

use chrono::Local;

use crate::core::message::ConversationMessage;

pub const DEFAULT_THREAD_PREFIX: &str = "citychat";

#[derive(Debug, Clone)]
pub struct Conversation {
    messages: Vec<ConversationMessage>,
    thread_id: String,
    resource_id: String,
    thread_prefix: String,
}

impl Conversation {
    pub fn new(thread_prefix: &str) -> Self {
        Self {
            messages: Vec::new(),
            thread_id: generate_thread_id(thread_prefix),
            resource_id: generate_resource_id(thread_prefix),
            thread_prefix: thread_prefix.to_string(),
        }
    }

    /// Builds a conversation with fixed identifiers.
    pub fn with_ids(thread_id: impl Into<String>, resource_id: impl Into<String>) -> Self {
        Self {
            messages: Vec::new(),
            thread_id: thread_id.into(),
            resource_id: resource_id.into(),
            thread_prefix: DEFAULT_THREAD_PREFIX.to_string(),
        }
    }

    pub fn messages(&self) -> &[ConversationMessage] {
        &self.messages
    }

    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn push(&mut self, message: ConversationMessage) {
        self.messages.push(message);
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.push(ConversationMessage::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.push(ConversationMessage::assistant(content));
    }

    /// Drops every turn and starts a new backend thread.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.thread_id = generate_thread_id(&self.thread_prefix);
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new(DEFAULT_THREAD_PREFIX)
    }
}

pub fn generate_thread_id(prefix: &str) -> String {
    format!(
        "{}-{}-{}",
        prefix,
        Local::now().format("%Y%m%d%H%M%S"),
        random_suffix(4)
    )
}

pub fn generate_resource_id(prefix: &str) -> String {
    format!("{}-user-{}", prefix, random_suffix(8))
}

fn random_suffix(len: usize) -> String {
    let mut bytes = vec![0_u8; len];
    if getrandom::fill(&mut bytes).is_err() {
        // Fall back to clock entropy; uniqueness within one process is enough.
        let nanos = Local::now().timestamp_subsec_nanos().to_le_bytes();
        for (index, byte) in bytes.iter_mut().enumerate() {
            *byte = nanos[index % nanos.len()] ^ (index as u8);
        }
    }
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_id_uses_prefix_and_timestamp() {
        let id = generate_thread_id("streamlit");
        let parts: Vec<&str> = id.split('-').collect();
        assert_eq!(parts.len(), 3, "unexpected thread id shape: {id}");
        assert_eq!(parts[0], "streamlit");
        assert_eq!(parts[1].len(), 14);
        assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(parts[2].len(), 8);
    }

    #[test]
    fn clear_resets_messages_and_thread_but_keeps_resource() {
        let mut conversation = Conversation::with_ids("thread-a", "resource-a");
        conversation.push_user("Tell me about Tokyo");
        conversation.push_assistant("Tokyo is the capital of Japan.");

        conversation.clear();

        assert!(conversation.is_empty());
        assert_ne!(conversation.thread_id(), "thread-a");
        assert!(conversation.thread_id().starts_with(DEFAULT_THREAD_PREFIX));
        assert_eq!(conversation.resource_id(), "resource-a");
    }
}
