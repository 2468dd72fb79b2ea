//! Column specifications and the sanitizers behind them.
//!
//! Everything interpolated into generated DDL outside of caller-owned query
//! fragments passes through this module first: column names, type
//! expressions, comments, and (via the builders) destination identifiers and
//! cluster-by expressions. The sanitizers reject rather than rewrite, so a
//! value that survives them is used verbatim in the emitted SQL.

use serde::{Deserialize, Serialize};

use crate::error::{BuildError, Result};

/// Validate a SQL identifier: `[A-Za-z_]` followed by word characters.
///
/// Also used for destination database/schema/table names. `what` names the
/// input in the error message.
///
/// # Errors
///
/// Returns [`BuildError::Validation`] if `value` is empty, starts with a
/// digit, or contains anything outside `[A-Za-z0-9_]`.
pub fn sanitize_identifier(what: &str, value: &str) -> Result<()> {
    let mut chars = value.chars();
    match chars.next() {
        None => return Err(BuildError::validation(what, "must not be empty")),
        Some(c) if !c.is_ascii_alphabetic() && c != '_' => {
            return Err(BuildError::validation(
                what,
                format!("must start with a letter or underscore, got {value:?}"),
            ));
        }
        Some(_) => {}
    }
    if let Some(bad) = value.chars().find(|c| !c.is_ascii_alphanumeric() && *c != '_') {
        return Err(BuildError::validation(
            what,
            format!("invalid character {bad:?} in {value:?}"),
        ));
    }
    Ok(())
}

/// Validate a column name against the warehouse's identifier format.
///
/// # Errors
///
/// Returns [`BuildError::Validation`] on an empty name, a leading digit, or
/// any character outside `[A-Za-z0-9_]`.
pub fn sanitize_column_name(name: &str) -> Result<()> {
    sanitize_identifier("column name", name)
}

/// Validate a column type expression, e.g. `VARCHAR(50)` or `NUMBER(38, 0)`.
///
/// An empty string passes: the type may be declared later. CREATE TABLE
/// column lists are themselves enclosed in parentheses, so an unbalanced
/// parenthesis here would change the meaning of the enclosing statement.
///
/// # Errors
///
/// Returns [`BuildError::Validation`] if the expression contains characters
/// outside `[A-Za-z0-9_(), ]` or its parentheses are unbalanced.
pub fn sanitize_column_type(type_str: &str) -> Result<()> {
    if type_str.is_empty() {
        return Ok(());
    }

    if let Some(bad) = type_str
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && !matches!(c, '_' | '(' | ')' | ',' | ' '))
    {
        return Err(BuildError::validation(
            "column type",
            format!("invalid character {bad:?} in {type_str:?}"),
        ));
    }

    let mut open = 0_i32;
    for c in type_str.chars() {
        match c {
            '(' => open += 1,
            ')' => {
                open -= 1;
                if open < 0 {
                    return Err(BuildError::validation(
                        "column type",
                        format!("unbalanced parentheses in {type_str:?}"),
                    ));
                }
            }
            _ => {}
        }
    }
    if open != 0 {
        return Err(BuildError::validation(
            "column type",
            format!("unbalanced parentheses in {type_str:?}"),
        ));
    }
    Ok(())
}

/// Escape single quotes in a comment for embedding in `COMMENT '...'`.
///
/// Always succeeds, including on empty input. Not idempotent: applying it to
/// already-escaped output escapes the backslash-quote again. Callers must
/// escape exactly once, at [`ColumnSpec`] construction.
#[must_use]
pub fn sanitize_comment(comment: &str) -> String {
    comment.replace('\'', "\\'")
}

/// A sanitized (name, type, comment) triple for one output column.
///
/// Constructed once per column and immutable afterwards; the raw inputs are
/// validated/escaped at construction so that [`ColumnSpec::clause`] can
/// interpolate them without further checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    name: String,
    #[serde(default)]
    col_type: String,
    #[serde(default)]
    comment: String,
}

impl ColumnSpec {
    /// Build a column spec from raw name, type expression, and comment.
    ///
    /// `col_type` may be empty if the type is declared elsewhere; requesting
    /// [`ColumnSpec::clause`] on such a column is an error.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Validation`] if the name or type fails
    /// sanitization.
    pub fn new(name: &str, col_type: &str, comment: &str) -> Result<Self> {
        sanitize_column_name(name)?;
        sanitize_column_type(col_type)?;
        Ok(Self {
            name: name.to_string(),
            col_type: col_type.to_string(),
            comment: sanitize_comment(comment),
        })
    }

    /// Name-only constructor for column lists whose types are declared
    /// elsewhere.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Validation`] if the name fails sanitization.
    pub fn named(name: &str) -> Result<Self> {
        Self::new(name, "", "")
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn col_type(&self) -> &str {
        &self.col_type
    }

    #[must_use]
    pub fn comment(&self) -> &str {
        &self.comment
    }

    /// Render the column-definition clause: `name type [COMMENT '...']`.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Precondition`] if the type is still empty.
    pub fn clause(&self) -> Result<String> {
        if self.col_type.is_empty() {
            return Err(BuildError::precondition(format!(
                "type required to generate schema clause for column {:?}",
                self.name
            )));
        }
        let mut clause = format!("{} {}", self.name, self.col_type);
        if !self.comment.is_empty() {
            clause.push_str(&format!(" COMMENT '{}'", self.comment));
        }
        Ok(clause.trim_end().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_names_pass() {
        for name in ["id", "_hidden", "col_1", "CamelCase", "a"] {
            assert!(sanitize_column_name(name).is_ok(), "rejected {name}");
        }
    }

    #[test]
    fn invalid_names_fail() {
        for name in ["", "1col", "col-name", "col name", "col;drop", "naïve"] {
            let err = sanitize_column_name(name).unwrap_err();
            assert!(err.is_validation(), "accepted {name:?}");
        }
    }

    #[test]
    fn empty_type_passes() {
        assert!(sanitize_column_type("").is_ok());
    }

    #[test]
    fn balanced_types_pass() {
        for t in ["INT", "VARCHAR(50)", "NUMBER(38, 0)", "ARRAY", "TIMESTAMP_LTZ(9)"] {
            assert!(sanitize_column_type(t).is_ok(), "rejected {t}");
        }
    }

    #[test]
    fn unbalanced_parentheses_fail() {
        for t in ["VARCHAR(", "VARCHAR))", "VARCHAR)(", "NUMBER((38)"] {
            let err = sanitize_column_type(t).unwrap_err();
            assert!(err.is_validation(), "accepted {t:?}");
        }
    }

    #[test]
    fn type_rejects_quotes_and_semicolons() {
        assert!(sanitize_column_type("VARCHAR(50); DROP TABLE t").is_err());
        assert!(sanitize_column_type("VARCHAR('x')").is_err());
    }

    #[test]
    fn comment_escapes_single_quotes() {
        assert_eq!(sanitize_comment("O'Brien's"), "O\\'Brien\\'s");
        assert_eq!(sanitize_comment(""), "");
        assert_eq!(sanitize_comment("no quotes"), "no quotes");
    }

    #[test]
    fn comment_escaping_is_not_idempotent() {
        let once = sanitize_comment("O'Brien");
        let twice = sanitize_comment(&once);
        assert_eq!(once, "O\\'Brien");
        assert_eq!(twice, "O\\\\'Brien");
        assert_ne!(once, twice);
    }

    #[test]
    fn clause_with_comment() {
        let col = ColumnSpec::new("name", "VARCHAR(50)", "customer's name").unwrap();
        assert_eq!(col.clause().unwrap(), "name VARCHAR(50) COMMENT 'customer\\'s name'");
    }

    #[test]
    fn clause_without_comment_has_no_trailing_space() {
        let col = ColumnSpec::new("id", "INT", "").unwrap();
        assert_eq!(col.clause().unwrap(), "id INT");
    }

    #[test]
    fn clause_requires_type() {
        let col = ColumnSpec::named("id").unwrap();
        let err = col.clause().unwrap_err();
        assert!(err.is_precondition());
    }

    #[test]
    fn construction_rejects_bad_type() {
        let err = ColumnSpec::new("id", "INT(", "").unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn serde_roundtrip() {
        let col = ColumnSpec::new("id", "INT", "primary key").unwrap();
        let json = serde_json::to_string(&col).unwrap();
        let back: ColumnSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(col, back);
    }
}
