//! Command-line interface parsing and handling
//!
//! This module handles parsing command-line arguments and executing the appropriate commands.

pub mod chat;
pub mod render;
pub mod say;

use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::cli::chat::run_chat;
use crate::cli::say::run_say;
use crate::core::acquire::ResponseAcquirer;
use crate::core::config::{path_display, Config, TransportKind};
use crate::core::session::ChatSession;
use crate::core::transport::HistoryPolicy;
use crate::logging::init_tracing;
use crate::utils::logging::TranscriptLog;

/// Prompts offered by `/examples` and listed in `--help`.
pub const EXAMPLE_PROMPTS: &[&str] = &[
    "Tell me about Tokyo",
    "I want to visit Paris",
    "Recommend activities for London based on current conditions",
    "What time is it in New York?",
    "Compare Tokyo and Paris",
];

#[derive(Parser)]
#[command(name = "citychat")]
#[command(about = "A terminal chat front-end for city information agents")]
#[command(
    long_about = "citychat talks to a city information agent: weather, local time, \
and things to do. Replies come from an agent server over HTTP (buffered or streaming) \
or from a script runtime spawned per turn.\n\n\
Configuration:\n\
  Settings live in the file shown by 'citychat config path'; command-line flags override them.\n\
  RUST_LOG controls diagnostic output (e.g. RUST_LOG=citychat=debug).\n\n\
Try asking:\n\
  Tell me about Tokyo\n\
  I want to visit Paris\n\
  Recommend activities for London based on current conditions\n\
  What time is it in New York?\n\
  Compare Tokyo and Paris\n\n\
Commands:\n\
  /examples         List example prompts (/example <n> sends one)\n\
  /clear            Clear the chat and start a new thread\n\
  /log <filename>   Enable logging to specified file\n\
  /log              Toggle logging pause/resume\n\
  /thread           Show the current thread id\n\
  /quit             Leave the chat"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Transport used to reach the agent
    #[arg(short = 't', long, global = true, value_enum)]
    pub transport: Option<TransportKind>,

    /// Agent server base URL, including the API prefix
    #[arg(short = 'e', long, global = true, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Agent name exposed by the backend
    #[arg(short = 'a', long, global = true)]
    pub agent: Option<String>,

    /// Which part of the transcript is sent with each turn
    #[arg(long, global = true, value_enum)]
    pub history: Option<HistoryPolicy>,

    /// Reply deadline in seconds for the selected transport
    #[arg(long, global = true, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Enable logging to specified file
    #[arg(short = 'l', long, global = true)]
    pub log: Option<String>,

    /// Read configuration from this file instead of the default location
    #[arg(short = 'c', long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print transport diagnostics to stderr
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the interactive chat (default)
    Chat,
    /// Send a single prompt and print the reply
    Say {
        /// Prompt text (can be multiple words)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        prompt: Vec<String>,
    },
    /// Show or initialise the configuration file
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration (default)
    Show,
    /// Write a starter configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the configuration file location
    Path,
}

impl Args {
    /// Layers command-line flags over file values.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(transport) = self.transport {
            config.transport = Some(transport);
        }
        if let Some(endpoint) = &self.endpoint {
            config.endpoint = Some(endpoint.clone());
        }
        if let Some(agent) = &self.agent {
            config.agent = Some(agent.clone());
        }
        if let Some(history) = self.history {
            config.history = Some(history);
        }
        if let Some(seconds) = self.timeout {
            let slot = match config.transport_kind() {
                TransportKind::Buffered => &mut config.timeouts.buffered,
                TransportKind::Streaming => &mut config.timeouts.streaming,
                TransportKind::Subprocess => &mut config.timeouts.subprocess,
            };
            *slot = Some(seconds);
        }
    }

    fn config_path(&self) -> Result<PathBuf, Box<dyn Error>> {
        match &self.config {
            Some(path) => Ok(path.clone()),
            None => Ok(Config::get_config_path()?),
        }
    }
}

pub fn main() -> Result<(), Box<dyn Error>> {
    tokio::runtime::Runtime::new()?.block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config_path = args.config_path()?;
    let mut config = Config::load_from_path(&config_path)?;
    args.apply_overrides(&mut config);

    match &args.command {
        Some(Commands::Config { command }) => {
            run_config_command(command.as_ref(), &config, &config_path)
        }
        Some(Commands::Say { prompt }) => {
            let session = build_session(&config, args.log.clone())?;
            run_say(prompt, session).await
        }
        Some(Commands::Chat) | None => {
            let session = build_session(&config, args.log.clone())?;
            run_chat(session).await
        }
    }
}

fn run_config_command(
    command: Option<&ConfigCommands>,
    config: &Config,
    config_path: &Path,
) -> Result<(), Box<dyn Error>> {
    match command {
        Some(ConfigCommands::Show) | None => {
            config.print_all();
            println!("  config-file: {}", path_display(config_path));
        }
        Some(ConfigCommands::Init { force }) => {
            if config_path.exists() && !force {
                eprintln!(
                    "❌ {} already exists; pass --force to overwrite it.",
                    path_display(config_path)
                );
                std::process::exit(1);
            }
            Config::starter().save_to_path(config_path)?;
            println!("✅ Wrote {}", path_display(config_path));
        }
        Some(ConfigCommands::Path) => println!("{}", config_path.display()),
    }
    Ok(())
}

/// Wires a configured transport, a fresh conversation and the transcript log
/// into a session.
pub fn build_session(
    config: &Config,
    log_file: Option<String>,
) -> Result<ChatSession, Box<dyn Error>> {
    let transport = config.transport()?;
    let timeout = config.timeout_for(config.transport_kind());
    let acquirer = Arc::new(ResponseAcquirer::new()?);
    let transcript = TranscriptLog::new(log_file)?;

    Ok(
        ChatSession::new(acquirer, transport, timeout, config.new_conversation())
            .with_transcript(transcript),
    )
}

#[cfg(test)]
mod tests;
