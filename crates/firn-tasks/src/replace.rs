//! The managed-replace assembler.
//!
//! Builds an idempotent two-step SQL group: "create" brings the destination
//! table into existence if absent, "replace" deletes rows matching an
//! explicit predicate and re-inserts them from a source query, inside one
//! session with pinned timezone/timestamp settings. Re-running the group is
//! safe because create is `IF NOT EXISTS` and the delete predicate scopes
//! exactly the rows the insert re-materializes.

use std::collections::HashSet;

use firn_types::column::{sanitize_column_type, sanitize_identifier};
use firn_types::error::{BuildError, Result};
use firn_types::{ColumnSpec, GraphDefaults, SqlStep, Step, TaskGroup};

use crate::format::format_query;
use crate::txn::TransactionPolicy;

/// The destination table's lifetime class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TableType {
    /// A regular permanent table.
    #[default]
    Permanent,
    /// Dropped at session end.
    Temporary,
    /// No fail-safe storage.
    Transient,
}

impl TableType {
    fn keyword(self) -> &'static str {
        match self {
            Self::Permanent => "",
            Self::Temporary => "TEMPORARY ",
            Self::Transient => "TRANSIENT ",
        }
    }
}

/// Builder for a managed create-then-replace task group.
///
/// The destination database and schema are inherited from the enclosing
/// graph's [`GraphDefaults`] unless overridden here. Assembly is pure string
/// and structure construction; all warehouse side effects happen later, when
/// the engine executes the emitted steps.
///
/// ```
/// use firn_tasks::ManagedReplace;
/// use firn_types::{ColumnSpec, GraphDefaults};
///
/// let group = ManagedReplace::new(
///     "daily_sales",
///     "sales_summary",
///     vec![
///         ColumnSpec::new("day", "DATE", "")?,
///         ColumnSpec::new("total", "NUMBER(18, 2)", "")?,
///     ],
///     "SELECT day, SUM(amount) AS total FROM dw.raw.sales GROUP BY day",
/// )
/// .replace_where("day = '{{ ds }}'")
/// .build(&GraphDefaults::warehouse_etl())?;
///
/// assert_eq!(group.steps.len(), 2);
/// # Ok::<(), firn_types::BuildError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ManagedReplace {
    group_id: String,
    table: String,
    database: Option<String>,
    schema: Option<String>,
    columns: Vec<ColumnSpec>,
    select: String,
    replace_where: String,
    pre_insert: String,
    post_insert: String,
    table_type: TableType,
    cluster_by: Vec<String>,
    explicit_transaction: bool,
}

impl ManagedReplace {
    /// Start a builder for `table`, filled from `select`.
    ///
    /// `group_id` becomes the emitted group's id and must be unique within
    /// the enclosing graph.
    #[must_use]
    pub fn new(
        group_id: impl Into<String>,
        table: impl Into<String>,
        columns: Vec<ColumnSpec>,
        select: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            table: table.into(),
            database: None,
            schema: None,
            columns,
            select: select.into(),
            replace_where: String::new(),
            pre_insert: String::new(),
            post_insert: String::new(),
            table_type: TableType::Permanent,
            cluster_by: Vec::new(),
            explicit_transaction: true,
        }
    }

    /// Override the graph's default database.
    #[must_use]
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Override the graph's default schema.
    #[must_use]
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Predicate selecting the rows to delete before the insert. Rows where
    /// it evaluates true are replaced by the select's output. Without it the
    /// group is pure-insert: nothing is deleted.
    #[must_use]
    pub fn replace_where(mut self, predicate: impl Into<String>) -> Self {
        self.replace_where = predicate.into();
        self
    }

    /// Statement(s) run before the delete/insert, inside the same session.
    #[must_use]
    pub fn pre_insert(mut self, sql: impl Into<String>) -> Self {
        self.pre_insert = sql.into();
        self
    }

    /// Statement(s) run after a successful insert, inside the same session.
    #[must_use]
    pub fn post_insert(mut self, sql: impl Into<String>) -> Self {
        self.post_insert = sql.into();
        self
    }

    #[must_use]
    pub fn table_type(mut self, table_type: TableType) -> Self {
        self.table_type = table_type;
        self
    }

    /// Cluster-by expressions, typically a subset of the column list.
    #[must_use]
    pub fn cluster_by(mut self, exprs: Vec<String>) -> Self {
        self.cluster_by = exprs;
        self
    }

    /// Run the replace script with autocommit on and no explicit
    /// transaction. Only for warehouses whose session manager kills
    /// long-running transactions; a mid-script failure then leaves the
    /// delete applied without the insert.
    #[must_use]
    pub fn without_transaction(mut self) -> Self {
        self.explicit_transaction = false;
        self
    }

    /// Validate every input and assemble the two-step group.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Validation`] if the group id, destination
    /// identifiers, columns, or cluster-by expressions fail sanitization;
    /// [`BuildError::Precondition`] if the column list is empty or contains
    /// duplicate names.
    pub fn build(&self, defaults: &GraphDefaults) -> Result<TaskGroup> {
        sanitize_identifier("group id", &self.group_id)?;

        let database = self.database.as_deref().unwrap_or(&defaults.database);
        let schema = self.schema.as_deref().unwrap_or(&defaults.schema);
        sanitize_identifier("database", database)?;
        sanitize_identifier("schema", schema)?;
        sanitize_identifier("table", &self.table)?;
        let full_table_name = format!("{database}.{schema}.{}", self.table);

        if self.columns.is_empty() {
            return Err(BuildError::precondition("output_columns must not be empty"));
        }
        let mut seen = HashSet::new();
        for col in &self.columns {
            if !seen.insert(col.name()) {
                return Err(BuildError::precondition(format!(
                    "duplicate column name {:?} in output_columns",
                    col.name()
                )));
            }
        }
        for expr in &self.cluster_by {
            sanitize_column_type(expr)?;
        }

        let create = self.create_sql(&full_table_name)?;
        let replace = self.replace_sql(&full_table_name);

        let group = TaskGroup {
            id: self.group_id.clone(),
            steps: vec![
                Step::Sql(SqlStep {
                    id: "create".to_string(),
                    sql: create,
                    depends_on: vec![],
                }),
                Step::Sql(SqlStep {
                    id: "replace".to_string(),
                    sql: replace,
                    depends_on: vec!["create".to_string()],
                }),
            ],
        };
        tracing::debug!(
            group = %group.id,
            table = %full_table_name,
            steps = group.steps.len(),
            "assembled managed-replace group"
        );
        Ok(group)
    }

    fn create_sql(&self, full_table_name: &str) -> Result<String> {
        let columns = self
            .columns
            .iter()
            .map(ColumnSpec::clause)
            .collect::<Result<Vec<_>>>()?
            .join(", ");
        let cluster = if self.cluster_by.is_empty() {
            String::new()
        } else {
            format!(" CLUSTER BY ({})", self.cluster_by.join(", "))
        };
        Ok(format!(
            "CREATE {}TABLE IF NOT EXISTS {full_table_name} ({columns}){cluster};",
            self.table_type.keyword()
        ))
    }

    fn replace_sql(&self, full_table_name: &str) -> String {
        let policy = TransactionPolicy::resolve(self.explicit_transaction);
        let col_names = self
            .columns
            .iter()
            .map(ColumnSpec::name)
            .collect::<Vec<_>>()
            .join(", ");

        let mut statements = vec![format!(
            "ALTER SESSION SET\n    TIMEZONE = 'UTC'\n    TIMESTAMP_TYPE_MAPPING = TIMESTAMP_LTZ\n    AUTOCOMMIT = {};",
            policy.autocommit
        )];
        if !policy.start.is_empty() {
            statements.push(policy.start.to_string());
        }
        if !self.pre_insert.is_empty() {
            statements.push(format!("{};", format_query(&self.pre_insert)));
        }
        if !self.replace_where.is_empty() {
            statements.push(format!(
                "DELETE FROM {full_table_name} WHERE {};",
                format_query(&self.replace_where)
            ));
        }
        statements.push(format!(
            "INSERT INTO {full_table_name} ({col_names})\nSELECT {col_names}\nFROM ({});",
            format_query(&self.select)
        ));
        if !self.post_insert.is_empty() {
            statements.push(format!("{};", format_query(&self.post_insert)));
        }
        if !policy.end.is_empty() {
            statements.push(policy.end.to_string());
        }
        statements.push("ALTER SESSION UNSET TIMEZONE, TIMESTAMP_TYPE_MAPPING, AUTOCOMMIT;".to_string());

        statements.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns() -> Vec<ColumnSpec> {
        vec![
            ColumnSpec::new("id", "INT", "").unwrap(),
            ColumnSpec::new("name", "VARCHAR(50)", "").unwrap(),
        ]
    }

    fn sql_of(group: &TaskGroup, id: &str) -> String {
        group
            .sql_steps()
            .find(|s| s.id == id)
            .map(|s| s.sql.clone())
            .unwrap()
    }

    #[test]
    fn replace_depends_on_create() {
        let group = ManagedReplace::new("g", "t", columns(), "SELECT 1, 'x'")
            .build(&GraphDefaults::warehouse_etl())
            .unwrap();
        let replace = group.sql_steps().find(|s| s.id == "replace").unwrap();
        assert_eq!(replace.depends_on, vec!["create"]);
        let create = group.sql_steps().find(|s| s.id == "create").unwrap();
        assert!(create.depends_on.is_empty());
    }

    #[test]
    fn defaults_resolve_destination() {
        let group = ManagedReplace::new("g", "t", columns(), "SELECT 1")
            .build(&GraphDefaults::warehouse_etl())
            .unwrap();
        assert!(sql_of(&group, "create").contains("DW.ETL.t"));
    }

    #[test]
    fn explicit_database_and_schema_override_defaults() {
        let group = ManagedReplace::new("g", "t", columns(), "SELECT 1")
            .database("staging")
            .schema("scratch")
            .build(&GraphDefaults::warehouse_etl())
            .unwrap();
        assert!(sql_of(&group, "create").contains("staging.scratch.t"));
    }

    #[test]
    fn no_predicate_means_no_delete() {
        let group = ManagedReplace::new("g", "t", columns(), "SELECT 1")
            .build(&GraphDefaults::warehouse_etl())
            .unwrap();
        let replace = sql_of(&group, "replace");
        assert!(!replace.contains("DELETE"));
        assert!(replace.contains("INSERT INTO"));
    }

    #[test]
    fn predicate_emits_delete_before_insert() {
        let group = ManagedReplace::new("g", "t", columns(), "SELECT 1")
            .replace_where("batch_day = '2024-01-01';")
            .build(&GraphDefaults::warehouse_etl())
            .unwrap();
        let replace = sql_of(&group, "replace");
        let delete_at = replace
            .find("DELETE FROM DW.ETL.t WHERE batch_day = '2024-01-01';")
            .unwrap();
        let insert_at = replace.find("INSERT INTO").unwrap();
        assert!(delete_at < insert_at);
    }

    #[test]
    fn transaction_markers_follow_the_flag() {
        let with_txn = ManagedReplace::new("g", "t", columns(), "SELECT 1")
            .build(&GraphDefaults::warehouse_etl())
            .unwrap();
        let sql = sql_of(&with_txn, "replace");
        assert!(sql.contains("BEGIN TRANSACTION;"));
        assert!(sql.contains("COMMIT;"));
        assert!(sql.contains("AUTOCOMMIT = FALSE"));

        let without = ManagedReplace::new("g", "t", columns(), "SELECT 1")
            .without_transaction()
            .build(&GraphDefaults::warehouse_etl())
            .unwrap();
        let sql = sql_of(&without, "replace");
        assert!(!sql.contains("BEGIN TRANSACTION"));
        assert!(!sql.contains("COMMIT;"));
        assert!(sql.contains("AUTOCOMMIT = TRUE"));
    }

    #[test]
    fn session_settings_wrap_the_script() {
        let group = ManagedReplace::new("g", "t", columns(), "SELECT 1")
            .build(&GraphDefaults::warehouse_etl())
            .unwrap();
        let sql = sql_of(&group, "replace");
        assert!(sql.starts_with("ALTER SESSION SET"));
        assert!(sql.contains("TIMEZONE = 'UTC'"));
        assert!(sql.contains("TIMESTAMP_TYPE_MAPPING = TIMESTAMP_LTZ"));
        assert!(sql.ends_with("ALTER SESSION UNSET TIMEZONE, TIMESTAMP_TYPE_MAPPING, AUTOCOMMIT;"));
    }

    #[test]
    fn pre_and_post_insert_are_terminated_and_ordered() {
        let group = ManagedReplace::new("g", "t", columns(), "SELECT 1")
            .pre_insert("SET batch = 1;")
            .post_insert("CALL notify()")
            .build(&GraphDefaults::warehouse_etl())
            .unwrap();
        let sql = sql_of(&group, "replace");
        let pre = sql.find("SET batch = 1;").unwrap();
        let insert = sql.find("INSERT INTO").unwrap();
        let post = sql.find("CALL notify();").unwrap();
        assert!(pre < insert && insert < post);
        assert!(!sql.contains(";;"));
    }

    #[test]
    fn table_type_modifier() {
        let group = ManagedReplace::new("g", "t", columns(), "SELECT 1")
            .table_type(TableType::Transient)
            .build(&GraphDefaults::warehouse_etl())
            .unwrap();
        assert!(sql_of(&group, "create").starts_with("CREATE TRANSIENT TABLE IF NOT EXISTS"));
    }

    #[test]
    fn cluster_by_clause() {
        let group = ManagedReplace::new("g", "t", columns(), "SELECT 1")
            .cluster_by(vec!["id".to_string()])
            .build(&GraphDefaults::warehouse_etl())
            .unwrap();
        assert!(sql_of(&group, "create").contains("CLUSTER BY (id)"));
    }

    #[test]
    fn empty_columns_is_a_precondition_error() {
        let err = ManagedReplace::new("g", "t", vec![], "SELECT 1")
            .build(&GraphDefaults::warehouse_etl())
            .unwrap_err();
        assert!(err.is_precondition());
    }

    #[test]
    fn duplicate_columns_are_a_precondition_error() {
        let cols = vec![
            ColumnSpec::new("id", "INT", "").unwrap(),
            ColumnSpec::new("id", "BIGINT", "").unwrap(),
        ];
        let err = ManagedReplace::new("g", "t", cols, "SELECT 1")
            .build(&GraphDefaults::warehouse_etl())
            .unwrap_err();
        assert!(err.is_precondition());
    }

    #[test]
    fn bad_destination_identifier_is_a_validation_error() {
        let err = ManagedReplace::new("g", "t; DROP TABLE x", columns(), "SELECT 1")
            .build(&GraphDefaults::warehouse_etl())
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn bad_cluster_by_expression_is_a_validation_error() {
        let err = ManagedReplace::new("g", "t", columns(), "SELECT 1")
            .cluster_by(vec!["id'; --".to_string()])
            .build(&GraphDefaults::warehouse_etl())
            .unwrap_err();
        assert!(err.is_validation());
    }
}
