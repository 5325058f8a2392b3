//! Activity Contract
//!
//! An activity is one reusable step type that can be wired into a
//! workflow. The engine resolves an activity by [`Activity::name`], hands it
//! the [`WorkflowContext`] and [`ActivityContext`] of the current step, and
//! follows whatever [`Outcomes`] it returns.
//!
//! # Structure
//!
//! - [`context`]: Per-step state and workflow identity
//! - [`email`]: The `SendEmail` activity
//! - [`registry`]: Startup registry of activity types

pub mod context;
pub mod email;
pub mod registry;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::messaging::{ChannelError, QueueError};

pub use context::{ActivityContext, StateValue, WorkflowContext};
pub use email::{EmailActivity, EmailSettings};
pub use registry::ActivityRegistry;

/// A label chosen from an activity's possible outcomes.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Outcome(String);

impl Outcome {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Outcome {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

impl PartialEq<&str> for Outcome {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// The ordered outcomes of one execution.
///
/// A single outcome moves the workflow along one edge. Several outcomes fan
/// out into parallel branches, and none at all leaves the workflow waiting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcomes(Vec<Outcome>);

impl Outcomes {
    /// No outcome.
    pub fn none() -> Self {
        Self::default()
    }

    /// Exactly one outcome.
    pub fn single(outcome: impl Into<Outcome>) -> Self {
        Self(vec![outcome.into()])
    }

    pub fn push(&mut self, outcome: impl Into<Outcome>) {
        self.0.push(outcome.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self) -> Option<&Outcome> {
        self.0.first()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.0.iter().any(|o| o.as_str() == label)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Outcome> {
        self.0.iter()
    }

    /// Labels joined with `, `.
    pub fn labels(&self) -> String {
        self.0
            .iter()
            .map(Outcome::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl FromIterator<Outcome> for Outcomes {
    fn from_iter<I: IntoIterator<Item = Outcome>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Outcomes {
    type Item = &'a Outcome;
    type IntoIter = std::slice::Iter<'a, Outcome>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A state value that does not match the type its key requires.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("State key '{key}' must be {expected}, found {found}")]
    WrongType {
        key: String,
        expected: &'static str,
        found: &'static str,
    },
}

/// Faults an activity does not handle itself.
///
/// Business failures are reported as outcomes; an `ActivityError` ends the
/// step abnormally.
#[derive(Error, Debug)]
pub enum ActivityError {
    #[error("Message channel failure: {0}")]
    Channel(#[from] ChannelError),

    #[error("Job queue failure: {0}")]
    Queue(#[from] QueueError),

    #[error("Invalid activity state: {0}")]
    Config(#[from] ConfigError),
}

/// A step type the workflow engine can execute.
///
/// Implementations hold no per-invocation state: everything an execution
/// needs comes from the two contexts.
pub trait Activity: Send + Sync {
    /// Stable identifier used to wire the activity into workflows.
    fn name(&self) -> &str;

    fn category(&self) -> &str;

    fn description(&self) -> &str;

    /// Identifier of the configuration form bound to this activity type.
    fn form(&self) -> Option<&str> {
        None
    }

    /// The outcomes this activity can produce, in display order.
    fn possible_outcomes(
        &self,
        workflow: &WorkflowContext,
        context: &ActivityContext,
    ) -> Vec<Outcome>;

    /// Checks the configured state once, before any execution.
    fn validate(&self, _context: &ActivityContext) -> Result<(), ConfigError> {
        Ok(())
    }

    /// Runs the activity for one step.
    fn execute(
        &self,
        workflow: &WorkflowContext,
        context: &ActivityContext,
    ) -> Result<Outcomes, ActivityError>;
}
