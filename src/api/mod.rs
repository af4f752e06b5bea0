//! Wire payloads exchanged with agent backends.

pub mod models;

pub use models::{
    text_field, to_api_messages, AgentErrorPayload, ApiMessage, GenerateRequest,
    StreamRequest,
};
