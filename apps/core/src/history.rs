//! Chat log
//!
//! Append-only CSV record of every Home chat turn. The file carries a
//! header row and is read back only by the Conversation History view.

use crate::error::AppError;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

const HEADER: [&str; 3] = ["User Input", "Chatbot Response", "Timestamp"];

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One logged turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatLogEntry {
    #[serde(rename = "User Input")]
    pub user_input: String,
    #[serde(rename = "Chatbot Response")]
    pub response: String,
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
}

pub struct ChatLog {
    path: PathBuf,
    /// Serializes appends from concurrent sessions.
    write_lock: Mutex<()>,
}

impl ChatLog {
    /// Opens the log at `path`, creating it with a header row if missing.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, AppError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        if !path.exists() {
            let mut writer = csv::Writer::from_path(&path)?;
            writer.write_record(HEADER)?;
            writer.flush()?;
            info!("Created chat log at {:?}", path);
        }
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one turn stamped with the current local time.
    pub fn append(&self, user_input: &str, response: &str) -> Result<ChatLogEntry, AppError> {
        self.append_at(user_input, response, Local::now())
    }

    pub fn append_at(
        &self,
        user_input: &str,
        response: &str,
        at: DateTime<Local>,
    ) -> Result<ChatLogEntry, AppError> {
        let entry = ChatLogEntry {
            user_input: user_input.to_string(),
            response: response.to_string(),
            timestamp: at.format(TIMESTAMP_FORMAT).to_string(),
        };

        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| AppError::History(format!("Chat log lock poisoned: {}", e)))?;
        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer.serialize(&entry)?;
        writer.flush()?;

        debug!("Logged chat turn at {}", entry.timestamp);
        Ok(entry)
    }

    /// Every logged turn, oldest first, header skipped. A missing file reads
    /// as an empty log.
    pub fn entries(&self) -> Result<Vec<ChatLogEntry>, AppError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&self.path)?;

        let mut entries = Vec::new();
        for record in reader.records() {
            let record = record?;
            entries.push(ChatLogEntry {
                user_input: record.get(0).unwrap_or_default().to_string(),
                response: record.get(1).unwrap_or_default().to_string(),
                timestamp: record.get(2).unwrap_or_default().to_string(),
            });
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_open_writes_header_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs").join("chat_log.csv");
        ChatLog::open(&path).unwrap();
        ChatLog::open(&path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "User Input,Chatbot Response,Timestamp\n");
    }

    #[test]
    fn test_append_and_read_back() {
        let dir = TempDir::new().unwrap();
        let log = ChatLog::open(dir.path().join("chat_log.csv")).unwrap();
        let at = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();

        log.append_at("Hi", "Hello!", at).unwrap();
        log.append_at("budget, please", "Track \"income\" first", at).unwrap();

        let entries = log.entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].user_input, "Hi");
        assert_eq!(entries[0].timestamp, "2024-03-09 14:05:07");
        // Quoting survives the round trip.
        assert_eq!(entries[1].user_input, "budget, please");
        assert_eq!(entries[1].response, "Track \"income\" first");
    }

    #[test]
    fn test_missing_file_reads_empty() {
        let dir = TempDir::new().unwrap();
        let log = ChatLog::open(dir.path().join("chat_log.csv")).unwrap();
        fs::remove_file(log.path()).unwrap();
        assert!(log.entries().unwrap().is_empty());
    }
}
