//! Messaging Services
//!
//! The two external services an activity may hand work to:
//!
//! - [`MessageService`]: synchronous delivery of a message through a channel
//! - [`JobsQueue`]: deferred, priority-ordered execution of a job
//!
//! The activity core only depends on these traits. Concrete channels and
//! the in-process queue live in [`channel`] and [`queue`].

pub mod channel;
pub mod queue;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use channel::{LogChannel, OutboxChannel};
pub use queue::{JobEnvelope, JobWorker, MemoryJobQueue, WorkerStats};

/// Message type identifier handled by the email channels.
pub const SMTP_MESSAGE_TYPE: &str = "Email";

/// Job kind used when a message send is deferred to the job queue.
pub const SEND_MESSAGE_JOB: &str = "send-message";

/// The parameter bundle for one email message.
///
/// Serialized with the same key names workflow authors use in the
/// activity state (`Subject`, `Body`, `Recipients`, `ReplyTo`, `Bcc`,
/// `CC`, `NotifyReadEmail`).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct MessageRequest {
    pub subject: String,
    pub body: String,
    pub recipients: String,
    pub reply_to: String,
    pub bcc: String,
    #[serde(rename = "CC")]
    pub cc: String,
    pub notify_read_email: bool,
}

impl MessageRequest {
    /// Creates a request with recipients, subject and body set.
    pub fn new(
        recipients: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            recipients: recipients.into(),
            subject: subject.into(),
            body: body.into(),
            ..Self::default()
        }
    }

    /// Returns the individual recipient addresses.
    ///
    /// Recipients are stored as a single string separated by commas or
    /// semicolons.
    pub fn recipient_list(&self) -> Vec<&str> {
        self.recipients
            .split(|c: char| c == ',' || c == ';')
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .collect()
    }
}

/// Payload of a deferred message send.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct QueuedJob {
    /// Channel message type the worker should send through
    #[serde(rename = "type")]
    pub message_type: String,

    /// The message itself
    pub parameters: MessageRequest,
}

impl QueuedJob {
    pub fn new(message_type: impl Into<String>, parameters: MessageRequest) -> Self {
        Self {
            message_type: message_type.into(),
            parameters,
        }
    }
}

/// Errors raised by a message channel.
#[derive(Error, Debug)]
pub enum ChannelError {
    /// The channel does not handle this message type
    #[error("Unsupported message type: {0}")]
    UnsupportedType(String),

    /// The transport refused or lost the message
    #[error("Delivery failed: {0}")]
    DeliveryFailed(String),

    /// Writing the message failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Encoding the message failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised by a job queue.
#[derive(Error, Debug)]
pub enum QueueError {
    /// The queue no longer accepts jobs
    #[error("Job queue is closed")]
    Closed,
}

/// Synchronous message delivery.
pub trait MessageService: Send + Sync {
    /// Delivers one message. Blocks until the channel accepts or fails it.
    fn send(&self, message_type: &str, request: &MessageRequest) -> Result<(), ChannelError>;
}

/// Asynchronous job submission.
pub trait JobsQueue: Send + Sync {
    /// Schedules a job and returns without waiting for it to run.
    fn enqueue(&self, job_kind: &str, job: QueuedJob, priority: i64) -> Result<(), QueueError>;
}
