//! SQL identifier sanitization.
//!
//! Table names come from configuration and are spliced into DDL/DML text,
//! because bind parameters cannot stand in for identifiers. Everything outside
//! `[A-Za-z0-9._-]` is dropped.

/// Returns `input` with every character outside `[A-Za-z0-9._-]` removed.
///
/// Total and idempotent. Call it right before building SQL text, not once at
/// startup.
#[must_use]
pub fn sanitize_identifier(input: &str) -> String {
    input.chars().filter(|c| is_identifier_char(*c)).collect()
}

/// Returns true if `c` may appear in an interpolated SQL identifier.
#[must_use]
pub const fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_')
}
