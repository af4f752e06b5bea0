//! Incremental printing of streamed reply snapshots.

use std::io::{self, Write};

use tokio::sync::mpsc;

/// Tracks what has reached the terminal so each cumulative snapshot only
/// prints its new suffix.
#[derive(Debug, Default)]
pub struct SnapshotPrinter {
    printed: String,
}

impl SnapshotPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn printed(&self) -> &str {
        &self.printed
    }

    /// Returns the text to write for `snapshot`.
    ///
    /// A snapshot that does not extend the printed text restarts on a fresh
    /// line with the whole snapshot.
    pub fn advance(&mut self, snapshot: &str) -> String {
        let output = match snapshot.strip_prefix(self.printed.as_str()) {
            Some(suffix) => suffix.to_string(),
            None => format!("\n{snapshot}"),
        };
        self.printed = snapshot.to_string();
        output
    }

    /// Returns the text still owed once the final reply is known, including
    /// the closing newline.
    pub fn finish(&mut self, reply: &str) -> String {
        let mut output = if self.printed.is_empty() {
            reply.to_string()
        } else {
            self.advance(reply)
        };
        self.printed = reply.to_string();
        output.push('\n');
        output
    }
}

/// Prints snapshots until the sending side closes.
pub async fn print_snapshots(
    mut rx: mpsc::UnboundedReceiver<String>,
    mut printer: SnapshotPrinter,
) -> io::Result<SnapshotPrinter> {
    while let Some(snapshot) = rx.recv().await {
        let chunk = printer.advance(&snapshot);
        if !chunk.is_empty() {
            let mut stdout = io::stdout();
            stdout.write_all(chunk.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(printer)
}
