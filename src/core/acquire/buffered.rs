use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use super::AcquisitionResult;
use crate::api::{text_field, to_api_messages, GenerateRequest};
use crate::core::failure::{classify_reqwest_error, Failure};
use crate::core::message::ConversationMessage;
use crate::core::transport::HttpTarget;
use crate::utils::url::generate_url;

pub(super) async fn acquire(
    client: &reqwest::Client,
    target: &HttpTarget,
    messages: &[ConversationMessage],
    thread_id: &str,
    timeout: Duration,
) -> AcquisitionResult {
    let url = generate_url(&target.endpoint, &target.agent_name);
    let request = GenerateRequest {
        messages: to_api_messages(messages),
        thread_id: thread_id.to_string(),
    };
    debug!(url = %url, thread_id, "Sending generate request");

    let response = client
        .post(&url)
        .header("Content-Type", "application/json")
        .timeout(timeout)
        .json(&request)
        .send()
        .await
        .map_err(|err| classify_reqwest_error(&err))?;

    let status = response.status();
    debug!(status = %status, "Generate response received");
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());
        return Err(Failure::remote_error(format!("{status}: {}", body.trim())));
    }

    let body = response
        .text()
        .await
        .map_err(|err| classify_reqwest_error(&err))?;
    parse_generate_body(&body, target.empty_reply_text.as_deref())
}

/// Interprets a successful `/generate` body.
///
/// A missing or blank `text` is an empty reply unless `empty_reply_text`
/// supplies an explicit default.
pub(super) fn parse_generate_body(body: &str, empty_reply_text: Option<&str>) -> AcquisitionResult {
    let value: Value = serde_json::from_str(body).map_err(|err| {
        Failure::malformed_output(format!("generate response is not JSON: {err}"))
    })?;

    match text_field(&value) {
        Some(text) if !text.trim().is_empty() => Ok(text.to_string()),
        _ => match empty_reply_text {
            Some(default) => Ok(default.to_string()),
            None => Err(Failure::empty_reply("generate response carried no text")),
        },
    }
}
