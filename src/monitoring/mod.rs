//! Run Monitoring Module
//!
//! - [`ExecutionTimeline`]: Step start times, outcomes and faults

pub mod timeline;

pub use timeline::{EventType, ExecutionTimeline, TimelineEvent};
