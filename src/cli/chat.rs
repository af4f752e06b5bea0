//! Line-oriented interactive chat.

use std::error::Error;
use std::io::{self, Write};

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::cli::say::submit_streaming;
use crate::cli::EXAMPLE_PROMPTS;
use crate::core::session::{ChatSession, USER_DISPLAY_NAME};
use crate::core::transport::TransportDescriptor;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatInput {
    Send(String),
    Clear,
    Examples,
    /// `/example <n>`, one-based.
    Example(usize),
    Log(Option<String>),
    Thread,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

pub fn parse_chat_input(line: &str) -> ChatInput {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return ChatInput::Empty;
    }
    let Some(command) = trimmed.strip_prefix('/') else {
        return ChatInput::Send(trimmed.to_string());
    };

    let (name, rest) = match command.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (command, ""),
    };

    match name {
        "clear" => ChatInput::Clear,
        "examples" => ChatInput::Examples,
        "example" => match rest.parse::<usize>() {
            Ok(index) if (1..=EXAMPLE_PROMPTS.len()).contains(&index) => ChatInput::Example(index),
            _ => ChatInput::Unknown(trimmed.to_string()),
        },
        "log" if rest.is_empty() => ChatInput::Log(None),
        "log" => ChatInput::Log(Some(rest.to_string())),
        "thread" => ChatInput::Thread,
        "help" => ChatInput::Help,
        "quit" | "exit" => ChatInput::Quit,
        _ => ChatInput::Unknown(trimmed.to_string()),
    }
}

fn describe_transport(transport: &TransportDescriptor) -> String {
    match transport {
        TransportDescriptor::DirectCall(_) => "in-process agent".to_string(),
        TransportDescriptor::BufferedRequest(target)
        | TransportDescriptor::StreamingRequest(target) => {
            format!("{} at {}", target.agent_name, target.endpoint)
        }
        TransportDescriptor::SubprocessCall(target) => format!(
            "{} via {} in {}",
            target.agent_name,
            target.runtime,
            target.working_dir.display()
        ),
    }
}

fn print_examples() {
    println!("Try asking:");
    for (index, prompt) in EXAMPLE_PROMPTS.iter().enumerate() {
        println!("  {}. {prompt}", index + 1);
    }
    println!("Send one with /example <n>.");
}

fn print_help() {
    println!("Commands:");
    println!("  /examples         List example prompts");
    println!("  /example <n>      Send example prompt n");
    println!("  /clear            Clear the chat and start a new thread");
    println!("  /log <filename>   Enable logging to specified file");
    println!("  /log              Toggle logging pause/resume");
    println!("  /thread           Show the current thread id");
    println!("  /quit             Leave the chat");
}

fn prompt_user() -> io::Result<()> {
    let mut stdout = io::stdout();
    write!(stdout, "{USER_DISPLAY_NAME}: ")?;
    stdout.flush()
}

pub async fn run_chat(mut session: ChatSession) -> Result<(), Box<dyn Error>> {
    eprintln!(
        "🏙️ citychat ({} transport, {})",
        session.transport().name(),
        describe_transport(session.transport())
    );
    eprintln!("💡 Ask about a city, /examples for ideas, /help for commands, /quit to leave.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt_user()?;
        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };

        let prompt = match parse_chat_input(&line) {
            ChatInput::Empty => continue,
            ChatInput::Send(text) => text,
            ChatInput::Example(index) => {
                let prompt = EXAMPLE_PROMPTS[index - 1].to_string();
                println!("{USER_DISPLAY_NAME}: {prompt}");
                prompt
            }
            ChatInput::Clear => {
                session.clear();
                println!(
                    "Chat cleared. New thread: {}",
                    session.conversation().thread_id()
                );
                continue;
            }
            ChatInput::Examples => {
                print_examples();
                continue;
            }
            ChatInput::Log(path) => {
                let transcript = session.transcript_mut();
                let result = match path {
                    Some(path) => transcript.set_log_file(path),
                    None => transcript.toggle_logging("Logging paused"),
                };
                match result {
                    Ok(status) => println!("{status}"),
                    Err(err) => eprintln!("❌ {err}"),
                }
                continue;
            }
            ChatInput::Thread => {
                println!("Thread: {}", session.conversation().thread_id());
                println!("Log: {}", session.transcript().get_status_string());
                continue;
            }
            ChatInput::Help => {
                print_help();
                continue;
            }
            ChatInput::Quit => break,
            ChatInput::Unknown(command) => {
                eprintln!("Unknown command: {command} (try /help)");
                continue;
            }
        };

        let (outcome, mut printer) = submit_streaming(&mut session, &prompt).await?;
        let rest = printer.finish(&outcome.reply);
        let mut stdout = io::stdout();
        stdout.write_all(rest.as_bytes())?;
        stdout.write_all(b"\n")?;
        stdout.flush()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_sent_trimmed() {
        assert_eq!(
            parse_chat_input("  Tell me about Tokyo \n"),
            ChatInput::Send("Tell me about Tokyo".to_string())
        );
        assert_eq!(parse_chat_input("   "), ChatInput::Empty);
    }

    #[test]
    fn slash_commands_are_recognised() {
        assert_eq!(parse_chat_input("/clear"), ChatInput::Clear);
        assert_eq!(parse_chat_input("/examples"), ChatInput::Examples);
        assert_eq!(parse_chat_input("/example 2"), ChatInput::Example(2));
        assert_eq!(parse_chat_input("/thread"), ChatInput::Thread);
        assert_eq!(parse_chat_input("/quit"), ChatInput::Quit);
        assert_eq!(parse_chat_input("/exit"), ChatInput::Quit);
        assert_eq!(parse_chat_input("/log"), ChatInput::Log(None));
        assert_eq!(
            parse_chat_input("/log  chat.log "),
            ChatInput::Log(Some("chat.log".to_string()))
        );
    }

    #[test]
    fn out_of_range_examples_and_unknown_commands_are_rejected() {
        assert_eq!(
            parse_chat_input("/example 0"),
            ChatInput::Unknown("/example 0".to_string())
        );
        let past_end = format!("/example {}", EXAMPLE_PROMPTS.len() + 1);
        assert_eq!(parse_chat_input(&past_end), ChatInput::Unknown(past_end));
        assert_eq!(
            parse_chat_input("/weather"),
            ChatInput::Unknown("/weather".to_string())
        );
    }
}
