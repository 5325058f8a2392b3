//! Workflow Execution Module
//!
//! Provides the engine that runs workflow steps against the registered
//! activity types.
//!
//! # Architecture
//!
//! - [`engine`]: Step execution, outcome checking and run summary

pub mod engine;

pub use engine::{Engine, EngineError, StepReport};
