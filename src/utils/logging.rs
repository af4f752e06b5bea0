use crate::core::message::{ConversationMessage, Role};
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Plain-text transcript written alongside a chat session.
pub struct TranscriptLog {
    file_path: Option<String>,
    is_active: bool,
}

impl TranscriptLog {
    pub fn new(log_file: Option<String>) -> Result<Self, Box<dyn std::error::Error>> {
        let mut log = TranscriptLog {
            file_path: None,
            is_active: false,
        };

        if let Some(path) = log_file {
            log.set_log_file(path)?;
        }

        Ok(log)
    }

    pub fn disabled() -> Self {
        TranscriptLog {
            file_path: None,
            is_active: false,
        }
    }

    pub fn set_log_file(&mut self, path: String) -> Result<String, Box<dyn std::error::Error>> {
        self.test_file_access(&path)?;

        self.file_path = Some(path.clone());
        self.is_active = true;

        Ok(format!("Logging enabled to: {path}"))
    }

    pub fn toggle_logging(
        &mut self,
        pause_message: &str,
    ) -> Result<String, Box<dyn std::error::Error>> {
        let Some(path) = self.file_path.clone() else {
            return Err("No log file specified. Use /log <filename> to enable logging first.".into());
        };

        if self.is_active {
            // Mark the gap in the file before going quiet.
            self.log_note(pause_message)?;
            self.is_active = false;
            Ok(format!("Logging paused (file: {path})"))
        } else {
            self.is_active = true;
            Ok(format!("Logging resumed to: {path}"))
        }
    }

    pub fn log_turn(
        &self,
        message: &ConversationMessage,
        user_display_name: &str,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match message.role {
            Role::User => self.log_message(&format!("{user_display_name}: {}", message.content)),
            Role::Assistant => self.log_message(&message.content),
        }
    }

    /// Writes an app note, prefixed with `## `.
    pub fn log_note(&self, note: &str) -> Result<(), Box<dyn std::error::Error>> {
        self.log_message(&format!("## {note}"))
    }

    pub fn log_message(&self, content: &str) -> Result<(), Box<dyn std::error::Error>> {
        let Some(file_path) = self.file_path.as_deref() else {
            return Ok(());
        };
        if !self.is_active {
            return Ok(());
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(file_path)?;
        let mut writer = BufWriter::new(file);

        for line in content.lines() {
            writeln!(writer, "{line}")?;
        }
        // Blank line between turns.
        writeln!(writer)?;

        writer.flush()?;
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn get_status_string(&self) -> String {
        match (&self.file_path, self.is_active) {
            (None, _) => "disabled".to_string(),
            (Some(path), true) => format!("active ({})", file_name(path)),
            (Some(path), false) => format!("paused ({})", file_name(path)),
        }
    }

    fn test_file_access(&self, path: &str) -> Result<(), Box<dyn std::error::Error>> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.flush()?;
        Ok(())
    }
}

fn file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn writes_turns_with_blank_line_separators() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("chat.log");
        let log = TranscriptLog::new(Some(path.to_string_lossy().to_string()))
            .expect("log should open");

        log.log_turn(&ConversationMessage::user("Tell me about Tokyo"), "You")
            .expect("user turn");
        log.log_turn(
            &ConversationMessage::assistant("Tokyo is the capital.\nPopulation: 14M"),
            "You",
        )
        .expect("assistant turn");

        let contents = fs::read_to_string(&path).expect("log should be readable");
        assert_eq!(
            contents,
            "You: Tell me about Tokyo\n\nTokyo is the capital.\nPopulation: 14M\n\n"
        );
    }

    #[test]
    fn pausing_writes_marker_then_stops() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("chat.log");
        let mut log = TranscriptLog::new(Some(path.to_string_lossy().to_string()))
            .expect("log should open");

        let status = log.toggle_logging("Logging paused").expect("pause");
        assert!(status.starts_with("Logging paused"));
        log.log_message("hidden").expect("paused write is a no-op");
        assert_eq!(log.get_status_string(), "paused (chat.log)");

        let contents = fs::read_to_string(&path).expect("log should be readable");
        assert_eq!(contents, "## Logging paused\n\n");
    }

    #[test]
    fn toggling_without_file_is_an_error() {
        let mut log = TranscriptLog::disabled();
        assert!(log.toggle_logging("pause").is_err());
        assert_eq!(log.get_status_string(), "disabled");
    }
}
