//! Shared declarative model for Firn workflow-graph builders.
//!
//! Everything here is pure data plus validation: step descriptions handed to
//! an external orchestration engine, the sanitized column specification used
//! when generating SQL, graph-level defaults, and the assembly error model.
//! Nothing in this crate talks to a warehouse or a scheduler.

pub mod column;
pub mod error;
pub mod graph;
pub mod step;

pub use column::ColumnSpec;
pub use error::BuildError;
pub use graph::{GraphDefaults, GraphSpec};
pub use step::{EntitySet, PollCheck, PollMode, PollStep, SqlStep, Step, TaskGroup};
