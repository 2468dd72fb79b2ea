//! Warehouse cost helpers.

/// Emit a SQL `CASE` expression mapping a warehouse size to credits/hour.
///
/// `size_clause` is any SQL expression evaluating to a size name. With
/// `string_literal` set, the input is treated as a literal size name instead:
/// it is single-quote-escaped and wrapped as a SQL string. Unknown sizes map
/// to 0 rather than erroring, so new sizes fail visibly in cost reports.
#[must_use]
pub fn warehouse_size_credits_case(size_clause: &str, string_literal: bool) -> String {
    let clause = if string_literal {
        format!("'{}'", size_clause.replace('\'', "\\'"))
    } else {
        size_clause.to_string()
    };
    format!(
        "CASE {clause}\n\
         \x20   WHEN 'X-Small' THEN 1\n\
         \x20   WHEN 'Small' THEN 2\n\
         \x20   WHEN 'Medium' THEN 4\n\
         \x20   WHEN 'Large' THEN 8\n\
         \x20   WHEN 'X-Large' THEN 16\n\
         \x20   WHEN '2X-Large' THEN 32\n\
         \x20   WHEN '3X-Large' THEN 64\n\
         \x20   WHEN '4X-Large' THEN 128\n\
         \x20   WHEN '5X-Large' THEN 256\n\
         \x20   WHEN '6X-Large' THEN 512\n\
         \x20   WHEN '7X-Large' THEN 1024\n\
         \x20   ELSE 0\n\
         END"
    )
}
