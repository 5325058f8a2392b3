//! Workflow Parser
//!
//! Handles loading and saving workflow files in YAML.

use std::error::Error;
use std::fs;

use log::{debug, info};

use super::model::Workflow;
use super::validator::validate_workflow;

/// Parses and validates a workflow from YAML text.
pub fn parse_workflow(yaml_content: &str) -> Result<Workflow, Box<dyn Error>> {
    let mut workflow: Workflow = serde_yaml::from_str(yaml_content).map_err(|e| {
        format!(
            "Failed to parse workflow YAML: {}. Check the file format.",
            e
        )
    })?;

    info!(
        "Parsed workflow '{}': {} steps",
        workflow.name,
        workflow.steps.len()
    );

    for step in &workflow.steps {
        debug!(
            "Step '{}' runs '{}' with state keys {:?}",
            step.id,
            step.activity,
            step.state.keys()
        );
    }

    validate_workflow(&mut workflow)?;

    Ok(workflow)
}

/// Loads a workflow from a YAML file.
///
/// The file is read, parsed and structurally validated. Activity-specific
/// checks need the registry and are done by
/// [`validate_activities`](super::validator::validate_activities).
///
/// # Example
///
/// ```rust,no_run
/// use activityrunner::workflow::load_workflow;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let workflow = load_workflow("welcome.yaml")?;
///     println!("Loaded {} steps", workflow.steps.len());
///     Ok(())
/// }
/// ```
pub fn load_workflow(path: &str) -> Result<Workflow, Box<dyn Error>> {
    info!("Loading workflow from: {}", path);

    let yaml_content = fs::read_to_string(path).map_err(|e| {
        format!(
            "Failed to read workflow file '{}': {}. Check that the file exists and is readable.",
            path, e
        )
    })?;

    debug!("YAML content loaded ({} bytes)", yaml_content.len());

    parse_workflow(&yaml_content)
}

/// Saves a workflow to a YAML file.
pub fn save_workflow(workflow: &Workflow, path: &str) -> Result<(), Box<dyn Error>> {
    let yaml_content = serde_yaml::to_string(workflow)?;
    fs::write(path, yaml_content)?;
    info!("Workflow saved to: {}", path);
    Ok(())
}
