//! Declarative step and task-group descriptions.
//!
//! These are the documents handed to the external orchestration engine. The
//! builders in `firn-tasks` produce them; nothing here executes anything.
//! Execution order within a group is expressed through `depends_on` edges,
//! and retry/backoff policy belongs entirely to the engine.

use serde::{Deserialize, Serialize};

/// One SQL execution unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqlStep {
    /// Unique within the enclosing group.
    pub id: String,
    /// Full statement text, possibly multiple `;`-separated statements
    /// executed in one session.
    pub sql: String,
    /// Ids of steps in the same group that must complete first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

/// How the engine re-invokes a polling step between checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollMode {
    /// Hold the worker slot and re-check in place.
    #[default]
    Poke,
    /// Release the slot and reschedule at the next interval.
    Reschedule,
}

/// The set of entities a completion watch expects to observe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntitySet {
    /// An explicit list of entity ids. Duplicates are tolerated on input and
    /// removed at render time.
    Explicit(Vec<String>),
    /// An arbitrary sub-select against an entity registry, returning one
    /// `entity_id` column. The caller owns its correctness.
    Registry(String),
}

/// The per-poll predicate of a [`PollStep`], evaluated by `firn-tasks`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "check")]
pub enum PollCheck {
    /// True when zero expected entities are missing a completion row in the
    /// status table for the run's batch time.
    Completions {
        /// Dotted identifier of the status table.
        status_table: String,
        pipeline_name: String,
        job_name: String,
        entities: EntitySet,
        /// Subtracted from the run's logical time to form the batch-time
        /// filter. Positive values denote runs in the past.
        #[serde(default)]
        execution_delta_secs: i64,
    },
    /// True once wall-clock time reaches logical time plus `n_hours`.
    HoursElapsed { n_hours: i64 },
}

/// A blocking check handed to the engine's retry-until-success primitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollStep {
    pub id: String,
    #[serde(flatten)]
    pub check: PollCheck,
    pub poll_interval_secs: u64,
    #[serde(default)]
    pub mode: PollMode,
}

/// One unit of work within a task group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum Step {
    Sql(SqlStep),
    Poll(PollStep),
}

impl Step {
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Sql(s) => &s.id,
            Self::Poll(p) => &p.id,
        }
    }
}

/// A named, ordered sub-sequence of steps.
///
/// The group id prefixes step ids when the engine flattens the graph, so it
/// must be unique within the enclosing graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskGroup {
    pub id: String,
    pub steps: Vec<Step>,
}

impl TaskGroup {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            steps: Vec::new(),
        }
    }

    pub fn push(&mut self, step: Step) {
        self.steps.push(step);
    }

    /// The SQL steps of this group, in declaration order.
    pub fn sql_steps(&self) -> impl Iterator<Item = &SqlStep> {
        self.steps.iter().filter_map(|s| match s {
            Step::Sql(sql) => Some(sql),
            Step::Poll(_) => None,
        })
    }
}
