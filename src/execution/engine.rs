//! Step Execution Engine
//!
//! Runs the steps of a workflow file one after another:
//! - Resolves each step's activity in the registry
//! - Builds the workflow and activity contexts
//! - Checks produced outcomes against the activity's possible outcomes
//! - Records a timeline and prints a summary
//!
//! Steps are independent invocations. The engine does not follow outcome
//! edges between them; it stops at the first step that faults.

use std::time::{Duration, Instant};

use chrono::Utc;
use colored::{ColoredString, Colorize};
use log::{error, info, warn};
use thiserror::Error;

use crate::activity::{ActivityError, ActivityRegistry, Outcome, Outcomes, WorkflowContext};
use crate::monitoring::{EventType, ExecutionTimeline};
use crate::workflow::{validate_activities, Step, Workflow};

/// Errors that end a step abnormally.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Step '{step}' uses unknown activity '{activity}'")]
    UnknownActivity { step: String, activity: String },

    #[error("Step '{step}' produced outcome '{outcome}' which is not one of its possible outcomes")]
    UnexpectedOutcome { step: String, outcome: String },

    #[error("Step '{step}' faulted: {source}")]
    Faulted {
        step: String,
        #[source]
        source: ActivityError,
    },
}

/// Result of one executed step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    pub step_id: String,
    pub activity: String,
    pub outcomes: Outcomes,
    pub elapsed: Duration,
}

/// Workflow step execution engine.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
///
/// use activityrunner::activity::ActivityRegistry;
/// use activityrunner::execution::Engine;
/// use activityrunner::load_workflow;
/// use activityrunner::messaging::{LogChannel, MemoryJobQueue};
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let workflow = load_workflow("welcome.yaml")?;
///     let registry = ActivityRegistry::with_builtin(
///         Arc::new(LogChannel::new()),
///         Arc::new(MemoryJobQueue::new()),
///     );
///
///     let mut engine = Engine::new(workflow, registry);
///     engine.run()?;
///     Ok(())
/// }
/// ```
pub struct Engine {
    workflow: Workflow,
    registry: ActivityRegistry,
    dry_run: bool,
    instance_id: String,
    timeline: ExecutionTimeline,
}

impl Engine {
    /// Creates an engine for one instance of `workflow`.
    pub fn new(workflow: Workflow, registry: ActivityRegistry) -> Self {
        let instance_id = format!(
            "{}-{}",
            workflow.name,
            Utc::now().format("%Y%m%dT%H%M%S%3f")
        );

        Self {
            workflow,
            registry,
            dry_run: false,
            instance_id,
            timeline: ExecutionTimeline::new(),
        }
    }

    /// Enables or disables dry run mode.
    pub fn set_dry_run(&mut self, dry_run: bool) {
        self.dry_run = dry_run;
    }

    /// Overrides the generated workflow instance ID.
    pub fn set_instance_id(&mut self, instance_id: impl Into<String>) {
        self.instance_id = instance_id.into();
    }

    pub fn timeline(&self) -> &ExecutionTimeline {
        &self.timeline
    }

    fn workflow_context(&self) -> WorkflowContext {
        WorkflowContext::new(&self.workflow.name, &self.instance_id)
    }

    /// Executes a single step and records it on the timeline.
    ///
    /// Business failures come back as outcomes in the report. Any error is
    /// an infrastructure fault.
    pub fn execute_step(&mut self, step: &Step) -> Result<StepReport, EngineError> {
        let activity =
            self.registry
                .get(&step.activity)
                .ok_or_else(|| EngineError::UnknownActivity {
                    step: step.id.clone(),
                    activity: step.activity.clone(),
                })?;

        let workflow_context = self.workflow_context();
        let started = Instant::now();
        self.timeline.add_event(&step.id, EventType::Started);

        let outcomes = match activity.execute(&workflow_context, &step.state) {
            Ok(outcomes) => outcomes,
            Err(source) => {
                error!("Step '{}' faulted: {}", step.id, source);
                self.timeline
                    .add_event(&step.id, EventType::Faulted(source.to_string()));
                return Err(EngineError::Faulted {
                    step: step.id.clone(),
                    source,
                });
            }
        };

        let possible: Vec<Outcome> = activity.possible_outcomes(&workflow_context, &step.state);
        if let Some(unexpected) = outcomes.iter().find(|o| !possible.contains(*o)) {
            let err = EngineError::UnexpectedOutcome {
                step: step.id.clone(),
                outcome: unexpected.to_string(),
            };
            error!("{}", err);
            self.timeline
                .add_event(&step.id, EventType::Faulted(err.to_string()));
            return Err(err);
        }

        match outcomes.len() {
            0 => warn!("Step '{}' produced no outcome; its workflow would stall", step.id),
            1 => {}
            n => info!("Step '{}' fans out into {} branches", step.id, n),
        }

        self.timeline
            .add_event(&step.id, EventType::Completed(outcomes.clone()));

        Ok(StepReport {
            step_id: step.id.clone(),
            activity: step.activity.clone(),
            outcomes,
            elapsed: started.elapsed(),
        })
    }

    /// Executes every step of the workflow in file order.
    ///
    /// The workflow is checked against the registry before the first step
    /// runs. Execution stops at the first faulted step.
    pub fn run(&mut self) -> Result<Vec<StepReport>, Box<dyn std::error::Error>> {
        validate_activities(&self.workflow, &self.registry)?;

        info!(
            "Running workflow '{}' as {} ({} steps, dry run: {})",
            self.workflow.name,
            self.instance_id,
            self.workflow.steps.len(),
            self.dry_run
        );

        let steps = self.workflow.steps.clone();
        let mut reports = Vec::with_capacity(steps.len());

        for step in &steps {
            if self.dry_run {
                self.print_plan(step);
                continue;
            }

            info!("Starting step: {} ({})", step.id, step.activity);
            let report = self.execute_step(step)?;
            println!(
                "  {:<20} {:<12} {} ({:.2?})",
                report.step_id,
                report.activity,
                paint_outcomes(&report.outcomes),
                report.elapsed
            );
            reports.push(report);
        }

        println!();
        println!("Workflow '{}' finished: {}", self.workflow.name, self.timeline.summary());
        println!("Total execution time: {:.2?}", self.timeline.elapsed());

        Ok(reports)
    }

    /// Prints what a step would do without running it.
    fn print_plan(&self, step: &Step) {
        println!();
        println!("[DRY RUN] Step: {}", step.id);
        println!("  Activity: {}", step.activity);
        if let Some(ref description) = step.description {
            println!("  Description: {}", description);
        }

        for key in step.state.keys() {
            if let Some(value) = step.state.get(key) {
                println!("  {}: {}", key, value);
            }
        }

        if let Some(activity) = self.registry.get(&step.activity) {
            let labels: Vec<String> = activity
                .possible_outcomes(&self.workflow_context(), &step.state)
                .iter()
                .map(Outcome::to_string)
                .collect();
            println!("  Possible outcomes: {}", labels.join(", "));
        }
    }
}

fn paint_outcome(outcome: &Outcome) -> ColoredString {
    match outcome.as_str() {
        "Done" => outcome.as_str().green(),
        "Failed" => outcome.as_str().red(),
        other => other.yellow(),
    }
}

fn paint_outcomes(outcomes: &Outcomes) -> String {
    if outcomes.is_empty() {
        return "(no outcome)".dimmed().to_string();
    }
    outcomes
        .iter()
        .map(|o| paint_outcome(o).to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
