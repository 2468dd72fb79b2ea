//! SQL fragment normalization.

/// Prepare a caller-owned SQL fragment for embedding in a larger statement.
///
/// Trims surrounding whitespace, then strips at most one trailing `;` so the
/// assembler can terminate statements itself without producing `;;`. No
/// validation of the SQL content happens here; the fragment's correctness is
/// the caller's responsibility.
#[must_use]
pub fn format_query(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed.strip_suffix(';').unwrap_or(trimmed)
}
