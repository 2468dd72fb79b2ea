//! Session transaction settings for generated SQL scripts.

/// Resolved transaction markers and autocommit setting for one SQL script.
///
/// Computed from a single flag, consumed during assembly, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionPolicy {
    /// Statement opening the transaction, or `""`.
    pub start: &'static str,
    /// Statement committing the transaction, or `""`.
    pub end: &'static str,
    /// Value for `ALTER SESSION SET AUTOCOMMIT`.
    pub autocommit: &'static str,
}

impl TransactionPolicy {
    /// With `explicit` set, the script runs inside `BEGIN TRANSACTION` /
    /// `COMMIT` with autocommit off. Otherwise autocommit stays on and no
    /// transaction markers are emitted; each statement then commits on its
    /// own, so a mid-script failure leaves earlier statements applied.
    #[must_use]
    pub fn resolve(explicit: bool) -> Self {
        if explicit {
            Self {
                start: "BEGIN TRANSACTION;",
                end: "COMMIT;",
                autocommit: "FALSE",
            }
        } else {
            Self {
                start: "",
                end: "",
                autocommit: "TRUE",
            }
        }
    }
}
