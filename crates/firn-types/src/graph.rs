//! Graph-level defaults and the workflow-graph spec.
//!
//! [`GraphDefaults`] replaces the ambient "current graph" lookup: builders
//! receive the enclosing graph's declared defaults as an explicit parameter,
//! and explicit per-group values override them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::step::TaskGroup;

/// Connection and destination defaults declared on a workflow graph.
///
/// Every field is overridable; [`GraphDefaults::warehouse_etl`] pre-populates
/// the conventional warehouse-ETL values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphDefaults {
    pub connection_id: String,
    pub warehouse: String,
    pub database: String,
    pub schema: String,
    pub role: String,
    /// Session parameters applied to every connection, e.g. `TIMEZONE`.
    #[serde(default)]
    pub session_parameters: BTreeMap<String, String>,
}

impl GraphDefaults {
    /// Reasonable defaults for warehouse ETL pipelines: the shared ETL
    /// warehouse and the `dw.etl` destination, with the session timezone
    /// pinned to UTC.
    #[must_use]
    pub fn warehouse_etl() -> Self {
        Self {
            connection_id: "warehouse_default".to_string(),
            warehouse: "ANALYTICS_ETL".to_string(),
            database: "DW".to_string(),
            schema: "ETL".to_string(),
            role: "etl_service".to_string(),
            session_parameters: BTreeMap::from([("TIMEZONE".to_string(), "UTC".to_string())]),
        }
    }
}

/// A declarative workflow graph: defaults plus an ordered list of groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSpec {
    pub graph_id: String,
    /// Cron expression; `None` means manually triggered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
    /// Whether missed intervals are backfilled when the graph is unpaused.
    pub catchup: bool,
    pub defaults: GraphDefaults,
    #[serde(default)]
    pub groups: Vec<TaskGroup>,
}

impl GraphSpec {
    /// A graph carrying [`GraphDefaults::warehouse_etl`] and `catchup` off,
    /// so unpausing a graph never silently launches a backfill.
    #[must_use]
    pub fn warehouse_etl(graph_id: impl Into<String>) -> Self {
        Self {
            graph_id: graph_id.into(),
            schedule: None,
            catchup: false,
            defaults: GraphDefaults::warehouse_etl(),
            groups: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_schedule(mut self, cron: impl Into<String>) -> Self {
        self.schedule = Some(cron.into());
        self
    }

    pub fn push_group(&mut self, group: TaskGroup) {
        self.groups.push(group);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn etl_defaults_pin_utc() {
        let defaults = GraphDefaults::warehouse_etl();
        assert_eq!(defaults.session_parameters.get("TIMEZONE").unwrap(), "UTC");
        assert_eq!(defaults.database, "DW");
        assert_eq!(defaults.schema, "ETL");
    }

    #[test]
    fn etl_graph_disables_catchup() {
        let spec = GraphSpec::warehouse_etl("daily_report");
        assert!(!spec.catchup);
        assert!(spec.schedule.is_none());
        assert!(spec.groups.is_empty());
    }

    #[test]
    fn overrides_are_respected() {
        let mut spec = GraphSpec::warehouse_etl("daily_report").with_schedule("0 3 * * *");
        spec.defaults.database = "STAGING".to_string();
        assert_eq!(spec.schedule.as_deref(), Some("0 3 * * *"));
        assert_eq!(spec.defaults.database, "STAGING");
    }

    #[test]
    fn serde_roundtrip() {
        let mut spec = GraphSpec::warehouse_etl("daily_report");
        spec.push_group(TaskGroup::new("load"));
        let json = serde_json::to_string(&spec).unwrap();
        let back: GraphSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(spec, back);
    }
}
