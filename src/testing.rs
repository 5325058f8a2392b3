//! Recording fakes of the messaging services, for unit tests.

use std::sync::Mutex;

use crate::messaging::{
    ChannelError, JobsQueue, MessageRequest, MessageService, QueueError, QueuedJob,
};

/// Message service that records every send.
#[derive(Default)]
pub struct RecordingService {
    sent: Mutex<Vec<(String, MessageRequest)>>,
    fail: bool,
}

impl RecordingService {
    pub fn new() -> Self {
        Self::default()
    }

    /// A service whose every send fails with `DeliveryFailed`.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<(String, MessageRequest)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn send_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

impl MessageService for RecordingService {
    fn send(&self, message_type: &str, request: &MessageRequest) -> Result<(), ChannelError> {
        if self.fail {
            return Err(ChannelError::DeliveryFailed("smtp host unreachable".to_string()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((message_type.to_string(), request.clone()));
        Ok(())
    }
}

/// Job queue that records every submission.
#[derive(Default)]
pub struct RecordingQueue {
    jobs: Mutex<Vec<(String, QueuedJob, i64)>>,
    fail: bool,
}

impl RecordingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// A queue whose every enqueue fails with `Closed`.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn jobs(&self) -> Vec<(String, QueuedJob, i64)> {
        self.jobs.lock().unwrap().clone()
    }

    pub fn enqueue_count(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }
}

impl JobsQueue for RecordingQueue {
    fn enqueue(&self, job_kind: &str, job: QueuedJob, priority: i64) -> Result<(), QueueError> {
        if self.fail {
            return Err(QueueError::Closed);
        }
        self.jobs
            .lock()
            .unwrap()
            .push((job_kind.to_string(), job, priority));
        Ok(())
    }
}
