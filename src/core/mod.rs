pub mod acquire;
pub mod config;
pub mod conversation;
pub mod failure;
pub mod message;
pub mod session;
pub mod sse;
pub mod transport;
