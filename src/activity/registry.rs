//! Activity Registry
//!
//! Activity types are registered once at startup and looked up by name
//! when a workflow step is executed.

use std::collections::HashMap;
use std::sync::Arc;

use log::debug;

use super::email::EmailActivity;
use super::Activity;
use crate::messaging::{JobsQueue, MessageService};

/// Name-indexed set of activity types.
#[derive(Default, Clone)]
pub struct ActivityRegistry {
    activities: HashMap<String, Arc<dyn Activity>>,
}

impl ActivityRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding every built-in activity type.
    pub fn with_builtin(
        message_service: Arc<dyn MessageService>,
        jobs_queue: Arc<dyn JobsQueue>,
    ) -> Self {
        let mut registry = Self::new();
        registry
            .activities
            .insert(
                super::email::ACTIVITY_NAME.to_string(),
                Arc::new(EmailActivity::new(message_service, jobs_queue)),
            );
        registry
    }

    /// Registers an activity type under its own name.
    pub fn register(&mut self, activity: Arc<dyn Activity>) -> Result<(), String> {
        let name = activity.name().to_string();
        if self.activities.contains_key(&name) {
            return Err(format!("Activity '{}' is already registered", name));
        }
        debug!("Registered activity '{}' ({})", name, activity.category());
        self.activities.insert(name, activity);
        Ok(())
    }

    /// Looks up an activity type by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Activity>> {
        self.activities.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.activities.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.activities.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.activities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }
}
