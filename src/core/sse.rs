//! Line framing for `text/event-stream` bodies.

use memchr::memchr;

/// Accumulates raw body chunks and yields complete, non-empty lines.
#[derive(Default)]
pub struct SseLineBuffer {
    buffer: Vec<u8>,
}

impl SseLineBuffer {
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(newline_pos) = memchr(b'\n', &self.buffer) {
            if let Some(line) = decode_line(&self.buffer[..newline_pos]) {
                lines.push(line);
            }
            self.buffer.drain(..=newline_pos);
        }
        lines
    }

    /// Flushes a trailing record that was not newline-terminated.
    pub fn finish(&mut self) -> Vec<String> {
        let line = decode_line(&self.buffer);
        self.buffer.clear();
        line.into_iter().collect()
    }
}

fn decode_line(bytes: &[u8]) -> Option<String> {
    let text = std::str::from_utf8(bytes).ok()?;
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Returns the payload of a `data:` record, tolerating a missing space.
pub fn data_payload(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim)
}

pub fn is_done_marker(payload: &str) -> bool {
    payload == "[DONE]"
}

/// Extracts the cumulative `text` snapshot from a record payload.
///
/// Non-JSON payloads and objects without a string `text` yield `None`.
pub fn snapshot_text(payload: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(payload).ok()?;
    crate::api::text_field(&value).map(str::to_owned)
}
