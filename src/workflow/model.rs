//! Workflow Data Model
//!
//! A workflow file names the workflow definition and lists the activity
//! invocations ("steps") to run for it.
//!
//! # Example YAML Format
//!
//! ```yaml
//! name: welcome-flow
//! steps:
//!   - id: notify_user
//!     activity: SendEmail
//!     state:
//!       Recipients: a@x.com
//!       Subject: Welcome
//!       Body: Thanks for signing up.
//!
//!   - id: notify_team
//!     activity: SendEmail
//!     state:
//!       Recipients: team@x.com
//!       Subject: New signup
//!       Queued: true
//!       Priority: 5
//! ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::activity::{ActivityContext, StateValue};

/// One configured activity invocation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Step {
    /// Unique identifier of this step within the workflow
    pub id: String,

    /// Name of the activity type to run (e.g. "SendEmail")
    pub activity: String,

    /// State handed to the activity as its context
    #[serde(default, skip_serializing_if = "ActivityContext::is_empty")]
    pub state: ActivityContext,

    /// Free-form note shown in dry runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Step {
    /// Creates a step with an empty state.
    ///
    /// # Example
    ///
    /// ```
    /// use activityrunner::workflow::Step;
    ///
    /// let step = Step::new("notify", "SendEmail")
    ///     .with_state("Recipients", "a@x.com")
    ///     .with_state("Queued", true)
    ///     .with_state("Priority", 5);
    /// ```
    pub fn new(id: impl Into<String>, activity: impl Into<String>) -> Self {
        Self {
            id: id.into().trim().to_string(),
            activity: activity.into().trim().to_string(),
            state: ActivityContext::new(),
            description: None,
        }
    }

    /// Sets one state value.
    pub fn with_state(mut self, key: impl Into<String>, value: impl Into<StateValue>) -> Self {
        self.state.set(key, value);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A workflow definition and its steps.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Workflow {
    /// Name of the workflow definition
    pub name: String,

    /// Steps in execution order
    #[serde(default)]
    pub steps: Vec<Step>,

    /// Unique activity types used (auto-populated)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub activities: Vec<String>,
}

impl Workflow {
    /// Creates a new empty workflow.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
            activities: Vec::new(),
        }
    }

    /// Creates a workflow from a list of steps.
    pub fn from_steps(name: impl Into<String>, steps: Vec<Step>) -> Self {
        let mut workflow = Self {
            name: name.into(),
            steps,
            activities: Vec::new(),
        };
        workflow.refresh_activities();
        workflow
    }

    /// Adds a step to the workflow.
    pub fn add_step(&mut self, step: Step) -> Result<(), String> {
        if self.steps.iter().any(|s| s.id == step.id) {
            return Err(format!("Step '{}' already exists", step.id));
        }
        self.steps.push(step);
        self.refresh_activities();
        Ok(())
    }

    /// Removes a step from the workflow.
    pub fn remove_step(&mut self, id: &str) -> Result<(), String> {
        let index = self
            .steps
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| format!("Step '{}' not found", id))?;

        self.steps.remove(index);
        self.refresh_activities();
        Ok(())
    }

    /// Gets a step by ID.
    pub fn get_step(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Gets a mutable reference to a step by ID.
    pub fn get_step_mut(&mut self, id: &str) -> Option<&mut Step> {
        self.steps.iter_mut().find(|s| s.id == id)
    }

    /// Updates the activity list based on steps.
    pub fn refresh_activities(&mut self) {
        let names: HashSet<_> = self.steps.iter().map(|s| s.activity.clone()).collect();
        self.activities = names.into_iter().collect();
        self.activities.sort();
    }

    /// Returns the number of steps in the workflow.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns true if the workflow has no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
