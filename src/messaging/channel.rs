//! Message Channels
//!
//! Concrete [`MessageService`] implementations shipped with the runner.
//! Neither talks SMTP: [`LogChannel`] reports deliveries through the log,
//! and [`OutboxChannel`] drops each message as a JSON file into a
//! directory that an external mailer (or a test) can pick up.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use log::{debug, info};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use super::{ChannelError, MessageRequest, MessageService, SMTP_MESSAGE_TYPE};

/// Environment variable overriding the default outbox directory.
pub const OUTBOX_ENV_VAR: &str = "ACTIVITYRUNNER_OUTBOX";

/// Lazily-resolved default outbox directory.
///
/// Uses `$ACTIVITYRUNNER_OUTBOX` when set, otherwise `./outbox`.
pub static DEFAULT_OUTBOX_DIR: Lazy<PathBuf> = Lazy::new(|| match std::env::var(OUTBOX_ENV_VAR) {
    Ok(dir) if !dir.trim().is_empty() => {
        info!("Using outbox from {}: {}", OUTBOX_ENV_VAR, dir);
        PathBuf::from(dir)
    }
    _ => PathBuf::from("outbox"),
});

fn check_message_type(message_type: &str) -> Result<(), ChannelError> {
    if message_type != SMTP_MESSAGE_TYPE {
        return Err(ChannelError::UnsupportedType(message_type.to_string()));
    }
    Ok(())
}

/// Channel that logs each delivery and counts them.
#[derive(Debug, Default)]
pub struct LogChannel {
    delivered: AtomicUsize,
}

impl LogChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of messages delivered so far.
    pub fn delivered(&self) -> usize {
        self.delivered.load(Ordering::SeqCst)
    }
}

impl MessageService for LogChannel {
    fn send(&self, message_type: &str, request: &MessageRequest) -> Result<(), ChannelError> {
        check_message_type(message_type)?;

        let recipients = request.recipient_list();
        info!(
            "Delivering {} message '{}' to {} recipient(s): {}",
            message_type,
            request.subject,
            recipients.len(),
            recipients.join(", ")
        );
        if !request.cc.is_empty() || !request.bcc.is_empty() {
            debug!("  cc: '{}', bcc: '{}'", request.cc, request.bcc);
        }

        self.delivered.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A message as written to the outbox.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct OutboxRecord {
    pub message_type: String,
    pub delivered_at: DateTime<Utc>,
    pub message: MessageRequest,
}

/// Channel that writes every message to `<dir>/<timestamp>-<seq>.json`.
#[derive(Debug)]
pub struct OutboxChannel {
    dir: PathBuf,
    sequence: AtomicUsize,
}

impl OutboxChannel {
    /// Creates a channel writing into `dir`. The directory is created on
    /// first delivery.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            sequence: AtomicUsize::new(0),
        }
    }

    /// Creates a channel writing into [`DEFAULT_OUTBOX_DIR`].
    pub fn with_default_dir() -> Self {
        Self::new(DEFAULT_OUTBOX_DIR.clone())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes the message and returns the file it landed in.
    pub fn deliver(
        &self,
        message_type: &str,
        request: &MessageRequest,
    ) -> Result<PathBuf, ChannelError> {
        check_message_type(message_type)?;
        fs::create_dir_all(&self.dir)?;

        let record = OutboxRecord {
            message_type: message_type.to_string(),
            delivered_at: Utc::now(),
            message: request.clone(),
        };

        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        let file_name = format!(
            "{}-{:04}.json",
            record.delivered_at.format("%Y%m%dT%H%M%S%3f"),
            seq
        );
        let path = self.dir.join(file_name);

        let json = serde_json::to_string_pretty(&record)?;
        fs::write(&path, json)?;

        info!(
            "Message '{}' for {} written to {}",
            request.subject,
            request.recipients,
            path.display()
        );
        Ok(path)
    }

    /// Reads back every message currently in the outbox, oldest first.
    pub fn read_all(&self) -> Result<Vec<OutboxRecord>, ChannelError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut paths: Vec<PathBuf> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().map_or(false, |ext| ext == "json"))
            .collect();
        paths.sort();

        let mut records = Vec::with_capacity(paths.len());
        for path in paths {
            let content = fs::read_to_string(&path)?;
            records.push(serde_json::from_str(&content)?);
        }
        Ok(records)
    }
}

impl MessageService for OutboxChannel {
    fn send(&self, message_type: &str, request: &MessageRequest) -> Result<(), ChannelError> {
        self.deliver(message_type, request).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_log_channel_counts_deliveries() {
        let channel = LogChannel::new();
        let request = MessageRequest::new("a@x.com", "Hi", "Hello");

        channel.send(SMTP_MESSAGE_TYPE, &request).unwrap();
        channel.send(SMTP_MESSAGE_TYPE, &request).unwrap();

        assert_eq!(channel.delivered(), 2);
    }

    #[test]
    fn test_log_channel_rejects_other_types() {
        let channel = LogChannel::new();
        let result = channel.send("Sms", &MessageRequest::default());

        assert!(matches!(result, Err(ChannelError::UnsupportedType(t)) if t == "Sms"));
        assert_eq!(channel.delivered(), 0);
    }

    #[test]
    fn test_outbox_writes_json_file() {
        let temp_dir = tempdir().unwrap();
        let outbox = temp_dir.path().join("outbox");
        let channel = OutboxChannel::new(&outbox);

        let mut request = MessageRequest::new("a@x.com", "Hi", "Hello");
        request.notify_read_email = true;

        let path = channel.deliver(SMTP_MESSAGE_TYPE, &request).unwrap();
        assert!(path.exists());
        assert!(path.starts_with(&outbox));

        let content = fs::read_to_string(&path).unwrap();
        let record: OutboxRecord = serde_json::from_str(&content).unwrap();
        assert_eq!(record.message_type, "Email");
        assert_eq!(record.message, request);
    }

    #[test]
    fn test_outbox_read_all_in_order() {
        let temp_dir = tempdir().unwrap();
        let channel = OutboxChannel::new(temp_dir.path());

        channel
            .send(SMTP_MESSAGE_TYPE, &MessageRequest::new("a@x.com", "first", ""))
            .unwrap();
        channel
            .send(SMTP_MESSAGE_TYPE, &MessageRequest::new("b@x.com", "second", ""))
            .unwrap();

        let records = channel.read_all().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].message.subject, "first");
        assert_eq!(records[1].message.subject, "second");
    }

    #[test]
    fn test_outbox_default_dir() {
        let channel = OutboxChannel::with_default_dir();
        assert_eq!(channel.dir(), DEFAULT_OUTBOX_DIR.as_path());
    }

    #[test]
    fn test_outbox_read_all_missing_dir() {
        let channel = OutboxChannel::new("/nonexistent/outbox/dir");
        assert!(channel.read_all().unwrap().is_empty());
    }

    #[test]
    fn test_outbox_unsupported_type_writes_nothing() {
        let temp_dir = tempdir().unwrap();
        let outbox = temp_dir.path().join("outbox");
        let channel = OutboxChannel::new(&outbox);

        assert!(channel.send("Sms", &MessageRequest::default()).is_err());
        assert!(!outbox.exists());
    }
}
