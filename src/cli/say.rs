//! One-shot "say" command

use std::error::Error;
use std::io::{self, Write};

use tokio::sync::mpsc;

use crate::cli::render::{print_snapshots, SnapshotPrinter};
use crate::core::session::{ChatSession, TurnOutcome};

/// Submits `prompt`, echoing streamed snapshots to stdout as they arrive.
pub(crate) async fn submit_streaming(
    session: &mut ChatSession,
    prompt: &str,
) -> Result<(TurnOutcome, SnapshotPrinter), Box<dyn Error>> {
    let (tx, rx) = mpsc::unbounded_channel();
    let (outcome, printer) = tokio::join!(
        session.submit_with(prompt, Some(tx)),
        print_snapshots(rx, SnapshotPrinter::new())
    );
    Ok((outcome?, printer?))
}

pub async fn run_say(prompt: &[String], mut session: ChatSession) -> Result<(), Box<dyn Error>> {
    let prompt = prompt.join(" ");
    if prompt.trim().is_empty() {
        eprintln!("Usage: citychat say <prompt>");
        std::process::exit(1);
    }

    let (outcome, mut printer) = submit_streaming(&mut session, &prompt).await?;

    if outcome.is_failure() {
        if !printer.printed().is_empty() {
            println!();
        }
        eprintln!("❌ {}", outcome.reply);
        std::process::exit(1);
    }

    let mut stdout = io::stdout();
    stdout.write_all(printer.finish(&outcome.reply).as_bytes())?;
    stdout.flush()?;
    Ok(())
}
