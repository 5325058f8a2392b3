//! Execution Contexts
//!
//! [`ActivityContext`] carries the per-invocation state a workflow author
//! configured for one step. [`WorkflowContext`] identifies the workflow
//! instance the step belongs to.
//!
//! # State Values
//!
//! State values are strings, booleans or integers. In YAML they are
//! written as plain scalars:
//!
//! ```yaml
//! state:
//!   Recipients: a@x.com
//!   Queued: true
//!   Priority: 5
//! ```
//!
//! A key left blank (`CC:` or `CC: ~`) is treated as absent.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use super::ConfigError;

/// A single typed state value.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum StateValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl StateValue {
    /// Name of the value's type, used in configuration errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "a boolean",
            Self::Int(_) => "an integer",
            Self::Text(_) => "a string",
        }
    }
}

impl fmt::Display for StateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::Text(s) => write!(f, "\"{}\"", s),
        }
    }
}

impl From<bool> for StateValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for StateValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for StateValue {
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}

impl From<&str> for StateValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for StateValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Per-invocation state for one activity execution.
///
/// Typed getters return the type's default when a key is absent and a
/// [`ConfigError`] when the key holds a value of another type. No value is
/// ever coerced between types.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct ActivityContext {
    state: HashMap<String, StateValue>,
}

impl<'de> Deserialize<'de> for ActivityContext {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = HashMap::<String, Option<StateValue>>::deserialize(deserializer)?;
        let state = raw
            .into_iter()
            .filter_map(|(key, value)| value.map(|v| (key, v)))
            .collect();
        Ok(Self { state })
    }
}

impl ActivityContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<StateValue>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<StateValue>) {
        self.state.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&StateValue> {
        self.state.get(key)
    }

    /// Keys in sorted order.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.state.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    pub fn len(&self) -> usize {
        self.state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    fn wrong_type(key: &str, expected: &'static str, found: &StateValue) -> ConfigError {
        ConfigError::WrongType {
            key: key.to_string(),
            expected,
            found: found.type_name(),
        }
    }

    /// Reads a string value; absent keys yield `""`.
    pub fn get_string(&self, key: &str) -> Result<String, ConfigError> {
        match self.state.get(key) {
            None => Ok(String::new()),
            Some(StateValue::Text(s)) => Ok(s.clone()),
            Some(other) => Err(Self::wrong_type(key, "a string", other)),
        }
    }

    /// Reads a boolean value; absent keys yield `false`.
    pub fn get_bool(&self, key: &str) -> Result<bool, ConfigError> {
        match self.state.get(key) {
            None => Ok(false),
            Some(StateValue::Bool(b)) => Ok(*b),
            Some(other) => Err(Self::wrong_type(key, "a boolean", other)),
        }
    }

    /// Reads an integer value; absent keys yield `0`.
    pub fn get_int(&self, key: &str) -> Result<i64, ConfigError> {
        match self.state.get(key) {
            None => Ok(0),
            Some(StateValue::Int(i)) => Ok(*i),
            Some(other) => Err(Self::wrong_type(key, "an integer", other)),
        }
    }
}

/// Identity of the running workflow instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowContext {
    /// Name of the workflow definition
    pub definition_name: String,
    /// Identifier of this workflow instance record
    pub instance_id: String,
}

impl WorkflowContext {
    pub fn new(definition_name: impl Into<String>, instance_id: impl Into<String>) -> Self {
        Self {
            definition_name: definition_name.into(),
            instance_id: instance_id.into(),
        }
    }
}

impl fmt::Display for WorkflowContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.definition_name, self.instance_id)
    }
}
