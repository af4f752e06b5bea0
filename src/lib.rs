//! citychat is a terminal front-end for city information agents.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the conversation, the transport descriptors, and the
//!   [`core::acquire::ResponseAcquirer`] that turns a conversation into one
//!   assistant reply or a classified failure.
//! - [`api`] defines the JSON payloads exchanged with agent backends.
//! - [`cli`] parses arguments and runs the interactive chat loop or the
//!   one-shot `say` command.
//! - [`utils`] holds URL helpers and the plain-text transcript log.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`].

pub mod api;
pub mod cli;
pub mod core;
pub mod logging;
pub mod utils;
