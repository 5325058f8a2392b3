//! ActivityRunner - Workflow Activity Execution Engine
//!
//! Runs individual workflow activities, reports their outcomes, and lets
//! side-effecting work such as sending email either happen inline or be
//! deferred to a job queue.
//!
//! # Architecture
//!
//! The library is organized into five main modules:
//!
//! - [`activity`]: The activity contract, contexts, and the `SendEmail` activity
//! - [`messaging`]: Message channel and job queue services
//! - [`workflow`]: Workflow file model, loading, and validation
//! - [`execution`]: Engine running workflow steps
//! - [`monitoring`]: Execution timeline and run summary
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use activityrunner::activity::ActivityRegistry;
//! use activityrunner::execution::Engine;
//! use activityrunner::load_workflow;
//! use activityrunner::messaging::{JobWorker, LogChannel, MemoryJobQueue};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let workflow = load_workflow("welcome.yaml")?;
//!
//!     let channel = Arc::new(LogChannel::new());
//!     let queue = Arc::new(MemoryJobQueue::new());
//!     let worker = JobWorker::spawn(queue.clone(), channel.clone());
//!
//!     let registry = ActivityRegistry::with_builtin(channel, queue);
//!     let mut engine = Engine::new(workflow, registry);
//!     engine.run()?;
//!
//!     worker.shutdown()?;
//!     Ok(())
//! }
//! ```

pub mod activity;
pub mod execution;
pub mod messaging;
pub mod monitoring;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use activity::{Activity, ActivityContext, ActivityRegistry, Outcome, Outcomes, WorkflowContext};
pub use execution::engine::Engine;
pub use workflow::model::{Step, Workflow};
pub use workflow::parser::load_workflow;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "ActivityRunner";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_version() {
        assert!(!VERSION.is_empty());
        assert!(VERSION.contains('.'));
    }

    #[test]
    fn test_app_name() {
        assert_eq!(APP_NAME, "ActivityRunner");
    }

    #[test]
    fn test_module_exports_step() {
        let step = Step::new("notify", "SendEmail");
        assert_eq!(step.id, "notify");
        assert_eq!(step.activity, "SendEmail");
    }

    #[test]
    fn test_module_exports_workflow() {
        let workflow = Workflow::new("flow");
        assert!(workflow.is_empty());
    }
}
