//! In-Process Job Queue
//!
//! A priority queue of deferred jobs plus a background worker that drains
//! it. Higher priorities run first; jobs of equal priority run in the order
//! they were enqueued.
//!
//! The worker runs on its own thread. Nothing orders a job relative to the
//! workflow step that enqueued it, and a job cannot be cancelled once
//! submitted.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::error::Error;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

use super::{JobsQueue, MessageService, QueueError, QueuedJob, SEND_MESSAGE_JOB};

/// A job as held by the queue.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct JobEnvelope {
    /// Job kind, e.g. `send-message`
    pub kind: String,
    pub job: QueuedJob,
    pub priority: i64,
    pub enqueued_at: DateTime<Utc>,
}

struct QueuedEntry {
    envelope: JobEnvelope,
    sequence: u64,
}

impl PartialEq for QueuedEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueuedEntry {}

impl PartialOrd for QueuedEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedEntry {
    // BinaryHeap pops the greatest entry: highest priority, then lowest sequence.
    fn cmp(&self, other: &Self) -> Ordering {
        self.envelope
            .priority
            .cmp(&other.envelope.priority)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

#[derive(Default)]
struct QueueInner {
    heap: BinaryHeap<QueuedEntry>,
    next_sequence: u64,
    closed: bool,
}

/// Thread-safe in-memory priority queue of jobs.
#[derive(Default)]
pub struct MemoryJobQueue {
    inner: Mutex<QueueInner>,
    available: Condvar,
}

impl MemoryJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, QueueInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of jobs waiting to run.
    pub fn len(&self) -> usize {
        self.lock().heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Stops accepting jobs and wakes any waiting worker.
    ///
    /// Jobs already queued can still be popped.
    pub fn close(&self) {
        self.lock().closed = true;
        self.available.notify_all();
    }

    /// Removes the next job without waiting.
    pub fn try_pop(&self) -> Option<JobEnvelope> {
        self.lock().heap.pop().map(|entry| entry.envelope)
    }

    /// Removes the next job, waiting for one to arrive.
    ///
    /// Returns `None` only when the queue is closed and drained.
    pub fn pop_blocking(&self) -> Option<JobEnvelope> {
        let mut inner = self.lock();
        loop {
            if let Some(entry) = inner.heap.pop() {
                return Some(entry.envelope);
            }
            if inner.closed {
                return None;
            }
            inner = self
                .available
                .wait(inner)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Returns the queued jobs in the order they would run.
    pub fn pending(&self) -> Vec<JobEnvelope> {
        let inner = self.lock();
        let mut entries: Vec<&QueuedEntry> = inner.heap.iter().collect();
        entries.sort_by(|a, b| b.cmp(a));
        entries.into_iter().map(|e| e.envelope.clone()).collect()
    }
}

impl JobsQueue for MemoryJobQueue {
    fn enqueue(&self, job_kind: &str, job: QueuedJob, priority: i64) -> Result<(), QueueError> {
        let mut inner = self.lock();
        if inner.closed {
            return Err(QueueError::Closed);
        }

        let sequence = inner.next_sequence;
        inner.next_sequence += 1;

        debug!(
            "Enqueued job #{} '{}' ({} to {}) with priority {}",
            sequence, job_kind, job.message_type, job.parameters.recipients, priority
        );

        inner.heap.push(QueuedEntry {
            envelope: JobEnvelope {
                kind: job_kind.to_string(),
                job,
                priority,
                enqueued_at: Utc::now(),
            },
            sequence,
        });
        drop(inner);

        self.available.notify_one();
        Ok(())
    }
}

/// Counters reported by a worker after it stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub delivered: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Runs one job against the message service, updating `stats`.
///
/// Failed deliveries are logged and counted. They are not retried.
pub fn process_job(envelope: &JobEnvelope, service: &dyn MessageService, stats: &mut WorkerStats) {
    if envelope.kind != SEND_MESSAGE_JOB {
        warn!("Skipping job of unknown kind '{}'", envelope.kind);
        stats.skipped += 1;
        return;
    }

    match service.send(&envelope.job.message_type, &envelope.job.parameters) {
        Ok(()) => {
            debug!(
                "Queued message to {} delivered",
                envelope.job.parameters.recipients
            );
            stats.delivered += 1;
        }
        Err(e) => {
            error!(
                "Queued message to {} failed: {}",
                envelope.job.parameters.recipients, e
            );
            stats.failed += 1;
        }
    }
}

/// Background thread draining a [`MemoryJobQueue`].
pub struct JobWorker {
    queue: Arc<MemoryJobQueue>,
    handle: JoinHandle<WorkerStats>,
}

impl JobWorker {
    /// Starts a worker delivering queued messages through `service`.
    pub fn spawn(queue: Arc<MemoryJobQueue>, service: Arc<dyn MessageService>) -> Self {
        let worker_queue = Arc::clone(&queue);

        let handle = thread::spawn(move || {
            let mut stats = WorkerStats::default();
            while let Some(envelope) = worker_queue.pop_blocking() {
                process_job(&envelope, service.as_ref(), &mut stats);
            }
            stats
        });

        Self { queue, handle }
    }

    /// Closes the queue, waits for the remaining jobs to run and returns
    /// the worker's counters.
    pub fn shutdown(self) -> Result<WorkerStats, Box<dyn Error>> {
        self.queue.close();
        let stats = self
            .handle
            .join()
            .map_err(|_| "Job worker thread panicked")?;

        info!(
            "Job worker stopped: {} delivered, {} failed, {} skipped",
            stats.delivered, stats.failed, stats.skipped
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::{MessageRequest, SMTP_MESSAGE_TYPE};
    use crate::testing::RecordingService;

    fn job(recipients: &str) -> QueuedJob {
        QueuedJob::new(SMTP_MESSAGE_TYPE, MessageRequest::new(recipients, "Hi", "Hello"))
    }

    #[test]
    fn test_queue_priority_order() {
        let queue = MemoryJobQueue::new();
        queue.enqueue(SEND_MESSAGE_JOB, job("low@x.com"), 1).unwrap();
        queue.enqueue(SEND_MESSAGE_JOB, job("high@x.com"), 10).unwrap();
        queue.enqueue(SEND_MESSAGE_JOB, job("mid@x.com"), 5).unwrap();

        let order: Vec<String> = std::iter::from_fn(|| queue.try_pop())
            .map(|e| e.job.parameters.recipients)
            .collect();
        assert_eq!(order, vec!["high@x.com", "mid@x.com", "low@x.com"]);
    }

    #[test]
    fn test_queue_fifo_within_priority() {
        let queue = MemoryJobQueue::new();
        queue.enqueue(SEND_MESSAGE_JOB, job("first@x.com"), 3).unwrap();
        queue.enqueue(SEND_MESSAGE_JOB, job("second@x.com"), 3).unwrap();
        queue.enqueue(SEND_MESSAGE_JOB, job("third@x.com"), 3).unwrap();

        let pending = queue.pending();
        assert_eq!(pending.len(), 3);
        assert_eq!(pending[0].job.parameters.recipients, "first@x.com");
        assert_eq!(pending[2].job.parameters.recipients, "third@x.com");
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn test_negative_priority_runs_last() {
        let queue = MemoryJobQueue::new();
        queue.enqueue(SEND_MESSAGE_JOB, job("late@x.com"), -1).unwrap();
        queue.enqueue(SEND_MESSAGE_JOB, job("default@x.com"), 0).unwrap();

        assert_eq!(queue.try_pop().unwrap().job.parameters.recipients, "default@x.com");
    }

    #[test]
    fn test_closed_queue_rejects_jobs() {
        let queue = MemoryJobQueue::new();
        queue.close();

        let result = queue.enqueue(SEND_MESSAGE_JOB, job("a@x.com"), 0);
        assert!(matches!(result, Err(QueueError::Closed)));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_pop_blocking_drains_after_close() {
        let queue = MemoryJobQueue::new();
        queue.enqueue(SEND_MESSAGE_JOB, job("a@x.com"), 0).unwrap();
        queue.close();

        assert!(queue.pop_blocking().is_some());
        assert!(queue.pop_blocking().is_none());
    }

    #[test]
    fn test_process_job_skips_unknown_kind() {
        let service = RecordingService::new();
        let mut stats = WorkerStats::default();
        let envelope = JobEnvelope {
            kind: "rebuild-index".to_string(),
            job: job("a@x.com"),
            priority: 0,
            enqueued_at: Utc::now(),
        };

        process_job(&envelope, &service, &mut stats);

        assert_eq!(stats.skipped, 1);
        assert_eq!(service.send_count(), 0);
    }

    #[test]
    fn test_process_job_counts_failures() {
        let service = RecordingService::failing();
        let mut stats = WorkerStats::default();
        let envelope = JobEnvelope {
            kind: SEND_MESSAGE_JOB.to_string(),
            job: job("a@x.com"),
            priority: 0,
            enqueued_at: Utc::now(),
        };

        process_job(&envelope, &service, &mut stats);

        assert_eq!(stats.failed, 1);
        assert_eq!(stats.delivered, 0);
    }

    #[test]
    fn test_worker_delivers_queued_jobs() {
        let queue = Arc::new(MemoryJobQueue::new());
        let service = Arc::new(RecordingService::new());
        let worker = JobWorker::spawn(Arc::clone(&queue), service.clone());

        queue.enqueue(SEND_MESSAGE_JOB, job("a@x.com"), 0).unwrap();
        queue.enqueue(SEND_MESSAGE_JOB, job("b@x.com"), 0).unwrap();

        let stats = worker.shutdown().unwrap();

        assert_eq!(stats.delivered, 2);
        assert_eq!(service.send_count(), 2);
        assert!(queue.is_closed());
        assert!(queue.is_empty());
    }
}
