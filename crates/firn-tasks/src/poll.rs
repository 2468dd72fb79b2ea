//! Polling step builders and their per-poll evaluation.
//!
//! Everything in this module is experimental. It is intended for pipelines
//! that are not business-critical: if a failed wait could page someone, do
//! not build on these helpers.
//!
//! The builders produce [`PollStep`] descriptions; the external engine owns
//! the polling cadence and calls [`poke`] once per interval. [`poke`] holds
//! no state between invocations: a completion watch issues one read-only
//! aggregate query per call, a time wait compares clocks and touches no
//! warehouse at all.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use firn_types::column::{sanitize_comment, sanitize_identifier};
use firn_types::error::{BuildError, Result};
use firn_types::{EntitySet, PollCheck, PollMode, PollStep};

use crate::format::format_query;

/// One workflow run, as seen by a polling step.
#[derive(Debug, Clone, Copy)]
pub struct RunContext {
    /// The nominal timestamp this run represents, independent of when it
    /// actually executes.
    pub logical_time: DateTime<Utc>,
}

/// Read-only warehouse access needed by completion watches.
///
/// Errors pass through to the engine unmodified; this module never retries.
pub trait WarehouseClient {
    /// Execute an aggregate query returning a single integer.
    async fn query_count(&self, sql: &str) -> anyhow::Result<i64>;
}

/// Build a step that blocks until every expected entity has a completion row
/// in `status_table`.
///
/// The check filters on `batch_time = logical_time - execution_delta`;
/// positive deltas denote runs in the past, e.g. `Duration::days(1)` for
/// yesterday's run. Polls every 60 seconds in poke mode. Any missing entity
/// keeps the step waiting.
///
/// # Errors
///
/// Returns [`BuildError::Validation`] if `id` or `status_table` fails
/// identifier sanitization.
pub fn wait_for_completions(
    id: &str,
    status_table: &str,
    pipeline_name: &str,
    job_name: &str,
    entities: EntitySet,
    execution_delta: Duration,
) -> Result<PollStep> {
    sanitize_identifier("step id", id)?;
    sanitize_status_table(status_table)?;
    Ok(PollStep {
        id: id.to_string(),
        check: PollCheck::Completions {
            status_table: status_table.to_string(),
            pipeline_name: pipeline_name.to_string(),
            job_name: job_name.to_string(),
            entities,
            execution_delta_secs: execution_delta.num_seconds(),
        },
        poll_interval_secs: 60,
        mode: PollMode::Poke,
    })
}

/// Build a step that waits until `n_hours` past the run's logical time.
///
/// Useful to delay one task without shifting the whole graph's schedule: to
/// process a daily report at 03:00 the next day, wait 27 hours. Polls hourly
/// in reschedule mode, and succeeds immediately if the target time has
/// already passed.
///
/// # Errors
///
/// Returns [`BuildError::Validation`] if `id` fails identifier sanitization.
pub fn wait_n_hours(id: &str, n_hours: i64) -> Result<PollStep> {
    sanitize_identifier("step id", id)?;
    Ok(PollStep {
        id: id.to_string(),
        check: PollCheck::HoursElapsed { n_hours },
        poll_interval_secs: 3600,
        mode: PollMode::Reschedule,
    })
}

/// Evaluate a polling step once. True means the step is complete.
///
/// # Errors
///
/// Surfaces warehouse errors unmodified, and check-rendering failures if the
/// step description holds an invalid status table.
pub async fn poke<C: WarehouseClient>(
    step: &PollStep,
    run: &RunContext,
    client: &C,
) -> anyhow::Result<bool> {
    match &step.check {
        PollCheck::HoursElapsed { n_hours } => {
            Ok(hours_elapsed(run.logical_time, Utc::now(), *n_hours))
        }
        PollCheck::Completions {
            status_table,
            pipeline_name,
            job_name,
            entities,
            execution_delta_secs,
        } => {
            let batch_time = run.logical_time - Duration::seconds(*execution_delta_secs);
            let sql = completion_check_sql(
                status_table,
                pipeline_name,
                job_name,
                entities,
                batch_time,
            )?;
            let outstanding = client.query_count(&sql).await?;
            Ok(outstanding == 0)
        }
    }
}

/// True once `now` reaches `logical + n_hours`.
#[must_use]
pub fn hours_elapsed(logical: DateTime<Utc>, now: DateTime<Utc>, n_hours: i64) -> bool {
    now >= logical + Duration::hours(n_hours)
}

/// Render the completion-watch aggregate query.
///
/// Left-joins the expected entities against distinct completions for the
/// batch time and counts the rows with no match; the result is the number of
/// entities still outstanding.
///
/// # Errors
///
/// Returns [`BuildError::Validation`] if `status_table` is not a dotted
/// identifier.
pub fn completion_check_sql(
    status_table: &str,
    pipeline_name: &str,
    job_name: &str,
    entities: &EntitySet,
    batch_time: DateTime<Utc>,
) -> Result<String> {
    sanitize_status_table(status_table)?;
    Ok(format!(
        "WITH\n\
         expected AS ({expected}),\n\
         completions AS (\n\
         \x20   SELECT DISTINCT entity_id\n\
         \x20   FROM {status_table}\n\
         \x20   WHERE batch_time = '{batch_time}'\n\
         \x20     AND pipeline_name = '{pipeline}'\n\
         \x20     AND job_name = '{job}'\n\
         )\n\
         SELECT COUNT_IF(completions.entity_id IS NULL) AS not_complete\n\
         FROM expected\n\
         LEFT JOIN completions ON expected.entity_id = completions.entity_id",
        expected = entity_select(entities),
        batch_time = batch_time.to_rfc3339(),
        pipeline = sanitize_comment(pipeline_name),
        job = sanitize_comment(job_name),
    ))
}

/// Render the expected-entity sub-select.
///
/// Explicit sets are deduplicated and rendered in sorted order as a `VALUES`
/// list with quote-escaped ids; registry sub-selects pass through with only
/// fragment normalization.
#[must_use]
pub fn entity_select(entities: &EntitySet) -> String {
    match entities {
        EntitySet::Explicit(ids) => {
            let values = ids
                .iter()
                .map(|id| sanitize_comment(id))
                .collect::<BTreeSet<_>>()
                .into_iter()
                .map(|id| format!("('{id}')"))
                .collect::<Vec<_>>()
                .join(", ");
            format!("SELECT column1 AS entity_id FROM (VALUES {values})")
        }
        EntitySet::Registry(query) => format_query(query).to_string(),
    }
}

fn sanitize_status_table(status_table: &str) -> Result<()> {
    if status_table.is_empty() {
        return Err(BuildError::validation("status table", "must not be empty"));
    }
    for segment in status_table.split('.') {
        sanitize_identifier("status table", segment)?;
    }
    Ok(())
}
