//! Workflow Definition Module
//!
//! Provides data structures and utilities for defining, loading, and
//! validating workflow files.
//!
//! # Structure
//!
//! - [`model`]: Core data structures (Step, Workflow)
//! - [`parser`]: YAML loading and saving
//! - [`validator`]: Structural and per-activity validation

pub mod model;
pub mod parser;
pub mod validator;

pub use model::{Step, Workflow};
pub use parser::{load_workflow, parse_workflow, save_workflow};
pub use validator::{validate_activities, validate_workflow, ValidationError};
