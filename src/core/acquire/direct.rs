use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures_util::FutureExt;
use serde_json::Value;
use tracing::debug;

use super::AcquisitionResult;
use crate::api::text_field;
use crate::core::failure::Failure;
use crate::core::message::ConversationMessage;
use crate::core::transport::DirectCall;

pub(super) async fn acquire(
    call: &DirectCall,
    messages: &[ConversationMessage],
    thread_id: &str,
    timeout: Duration,
) -> AcquisitionResult {
    let generate = AssertUnwindSafe(call.agent.generate(messages, thread_id)).catch_unwind();

    match tokio::time::timeout(timeout, generate).await {
        Err(_) => Err(Failure::timeout(format!(
            "agent did not answer within {timeout:?}"
        ))),
        Ok(Err(panic)) => Err(Failure::agent_fault(panic_message(&*panic))),
        Ok(Ok(Err(message))) => Err(Failure::agent_fault(message)),
        Ok(Ok(Ok(value))) => reply_from_agent_value(&value),
    }
}

/// Uses the result's `text` field, or the whole result rendered as text.
pub(super) fn reply_from_agent_value(value: &Value) -> AcquisitionResult {
    let text = match (text_field(value), value) {
        (Some(text), _) => text.to_string(),
        (None, Value::Null) => String::new(),
        (None, Value::String(text)) => text.clone(),
        (None, other) => {
            debug!("Agent result has no text field; stringifying");
            other.to_string()
        }
    };

    if text.trim().is_empty() {
        Err(Failure::empty_reply("agent returned no text"))
    } else {
        Ok(text)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("agent panicked: {message}")
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("agent panicked: {message}")
    } else {
        "agent panicked".to_string()
    }
}
