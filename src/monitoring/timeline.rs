//! Execution Timeline
//!
//! Records when each step starts and how it ends, for the run summary.

use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

use crate::activity::Outcomes;

/// Type of timeline event.
#[derive(Debug, Clone, PartialEq)]
pub enum EventType {
    /// Step started executing
    Started,
    /// Step returned outcomes
    Completed(Outcomes),
    /// Step ended with an infrastructure fault
    Faulted(String),
}

/// A single event in the execution timeline.
#[derive(Debug, Clone)]
pub struct TimelineEvent {
    pub step_id: String,
    pub event_type: EventType,
    pub timestamp: Instant,
}

/// Tracks the execution timeline of a workflow run.
#[derive(Debug, Clone)]
pub struct ExecutionTimeline {
    events: Vec<TimelineEvent>,
    start_time: Instant,
}

impl ExecutionTimeline {
    /// Creates a new timeline starting now.
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            start_time: Instant::now(),
        }
    }

    /// Records an event for a step.
    pub fn add_event(&mut self, step_id: impl Into<String>, event_type: EventType) {
        self.events.push(TimelineEvent {
            step_id: step_id.into(),
            event_type,
            timestamp: Instant::now(),
        });
    }

    /// Returns all recorded events.
    pub fn get_events(&self) -> &[TimelineEvent] {
        &self.events
    }

    /// Returns the total elapsed time since timeline creation.
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Returns how long each finished step ran.
    pub fn get_durations(&self) -> HashMap<String, Duration> {
        let mut starts: HashMap<&str, Instant> = HashMap::new();
        let mut durations = HashMap::new();

        for event in &self.events {
            match event.event_type {
                EventType::Started => {
                    starts.insert(&event.step_id, event.timestamp);
                }
                EventType::Completed(_) | EventType::Faulted(_) => {
                    if let Some(start) = starts.get(event.step_id.as_str()) {
                        durations.insert(
                            event.step_id.clone(),
                            event.timestamp.duration_since(*start),
                        );
                    }
                }
            }
        }

        durations
    }

    /// Counts how often each outcome label was produced.
    pub fn outcome_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for event in &self.events {
            if let EventType::Completed(outcomes) = &event.event_type {
                for outcome in outcomes {
                    *counts.entry(outcome.to_string()).or_insert(0) += 1;
                }
            }
        }
        counts
    }

    /// IDs of steps that ended with a fault.
    pub fn faulted_steps(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter(|e| matches!(e.event_type, EventType::Faulted(_)))
            .map(|e| e.step_id.as_str())
            .collect()
    }

    /// One-line summary such as `3 steps: Done x2, Failed x1`.
    pub fn summary(&self) -> String {
        let started = self
            .events
            .iter()
            .filter(|e| e.event_type == EventType::Started)
            .count();

        let mut parts: Vec<String> = self
            .outcome_counts()
            .into_iter()
            .map(|(label, count)| format!("{} x{}", label, count))
            .collect();

        let faulted = self.faulted_steps().len();
        if faulted > 0 {
            parts.push(format!("faulted x{}", faulted));
        }

        let noun = if started == 1 { "step" } else { "steps" };
        if parts.is_empty() {
            format!("{} {}", started, noun)
        } else {
            format!("{} {}: {}", started, noun, parts.join(", "))
        }
    }
}

impl Default for ExecutionTimeline {
    fn default() -> Self {
        Self::new()
    }
}
