//! Workflow Validation
//!
//! Validation runs once, when a workflow is loaded, so that configuration
//! mistakes surface before any step executes:
//! - Structural checks (name, step IDs, activity names)
//! - Activity checks against a registry (known type, typed state)

use std::collections::HashSet;

use log::{debug, info, warn};

use super::model::{Step, Workflow};
use crate::activity::{ActivityRegistry, ConfigError};

/// Validation error types for user-friendly error messages.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    EmptyWorkflow,
    EmptyName,
    DuplicateStepId(String),
    EmptyStepId,
    EmptyActivity(String),
    UnknownActivity { step: String, activity: String },
    InvalidState { step: String, error: ConfigError },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyWorkflow => write!(f, "Workflow has no steps"),
            Self::EmptyName => write!(f, "Workflow has no name"),
            Self::DuplicateStepId(id) => write!(f, "Duplicate step ID: '{}'", id),
            Self::EmptyStepId => write!(f, "Step has empty or whitespace-only ID"),
            Self::EmptyActivity(step) => write!(f, "Step '{}' has no activity specified", step),
            Self::UnknownActivity { step, activity } => {
                write!(f, "Step '{}' uses unknown activity '{}'", step, activity)
            }
            Self::InvalidState { step, error } => write!(f, "Step '{}': {}", step, error),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validates a single step's fields.
fn validate_step(step: &Step) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if step.id.trim().is_empty() {
        errors.push(ValidationError::EmptyStepId);
        return errors;
    }

    if step.activity.trim().is_empty() {
        errors.push(ValidationError::EmptyActivity(step.id.clone()));
    }

    if step.state.is_empty() {
        debug!("Step '{}' has no state configured", step.id);
    }

    errors
}

/// Validates the workflow structure.
///
/// Checks that:
/// 1. The workflow has a name and at least one step
/// 2. Step IDs are unique
/// 3. Every step has an ID and an activity
pub fn validate_workflow(workflow: &mut Workflow) -> Result<(), String> {
    info!(
        "Validating workflow '{}' with {} steps",
        workflow.name,
        workflow.steps.len()
    );

    if workflow.name.trim().is_empty() {
        return Err(ValidationError::EmptyName.to_string());
    }

    if workflow.steps.is_empty() {
        return Err(ValidationError::EmptyWorkflow.to_string());
    }

    workflow.refresh_activities();

    let mut seen_ids: HashSet<&str> = HashSet::new();
    for step in &workflow.steps {
        if !step.id.trim().is_empty() && !seen_ids.insert(step.id.as_str()) {
            return Err(ValidationError::DuplicateStepId(step.id.clone()).to_string());
        }
    }

    let all_errors: Vec<ValidationError> = workflow.steps.iter().flat_map(validate_step).collect();
    if !all_errors.is_empty() {
        let error_messages: Vec<String> = all_errors.iter().map(|e| e.to_string()).collect();
        return Err(error_messages.join("\n"));
    }

    info!(
        "Workflow validated: {} steps, {} activity types",
        workflow.steps.len(),
        workflow.activities.len()
    );
    Ok(())
}

/// Validates every step against the registered activity types.
///
/// Each step must name a registered activity, and its state must hold
/// values of the types that activity declares. Missing recipients on a
/// `SendEmail` step are only warned about: the step will end in `Failed`.
pub fn validate_activities(workflow: &Workflow, registry: &ActivityRegistry) -> Result<(), String> {
    let mut errors = Vec::new();

    for step in &workflow.steps {
        let Some(activity) = registry.get(&step.activity) else {
            errors.push(ValidationError::UnknownActivity {
                step: step.id.clone(),
                activity: step.activity.clone(),
            });
            continue;
        };

        if let Err(error) = activity.validate(&step.state) {
            errors.push(ValidationError::InvalidState {
                step: step.id.clone(),
                error,
            });
            continue;
        }

        if step.activity == crate::activity::email::ACTIVITY_NAME
            && step
                .state
                .get_string("Recipients")
                .map_or(false, |r| r.trim().is_empty())
        {
            warn!(
                "Step '{}' has no recipients and will end with the Failed outcome",
                step.id
            );
        }
    }

    if !errors.is_empty() {
        let error_messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        return Err(error_messages.join("\n"));
    }

    debug!(
        "All {} steps match registered activities",
        workflow.steps.len()
    );
    Ok(())
}
