use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::message::ConversationMessage;

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ApiMessage {
    pub role: String,
    pub content: String,
}

/// Body of `POST /agents/{agent}/generate`, also piped to subprocess agents.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub messages: Vec<ApiMessage>,
    pub thread_id: String,
}

/// Body of `POST /agents/{agent}/stream`.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct StreamRequest {
    pub messages: Vec<ApiMessage>,
    pub thread_id: String,
    pub resource_id: String,
}

#[derive(Deserialize, Debug)]
pub struct AgentErrorPayload {
    pub error: Value,
}

impl From<&ConversationMessage> for ApiMessage {
    fn from(message: &ConversationMessage) -> Self {
        Self {
            role: message.role.as_str().to_string(),
            content: message.content.clone(),
        }
    }
}

pub fn to_api_messages(messages: &[ConversationMessage]) -> Vec<ApiMessage> {
    messages.iter().map(ApiMessage::from).collect()
}

/// Returns the reply text carried by an agent result object.
pub fn text_field(value: &Value) -> Option<&str> {
    value.get("text").and_then(Value::as_str)
}
