//! Read-only guard for free-form SQL
//!
//! A static classifier: it decides whether text typed by the user would
//! modify the database. Comments are ignored, string literals and quoted
//! identifiers are blanked, and every `;`-separated statement is checked.

use crate::{Result, TesseraError};
use regex::Regex;
use std::sync::LazyLock;

static TEMP_OBJECT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^CREATE\s+(?:(?:GLOBAL|LOCAL)\s+)?TEMP(?:ORARY)?\s+(?:TABLE|VIEW)\b")
        .expect("valid regex")
});

/// Leading keywords that make a statement a write.
const BLOCKED_KEYWORDS: &str = r"(?:(?:INSERT|UPDATE|DELETE|DROP|ALTER|TRUNCATE|REPLACE|MERGE|GRANT|REVOKE|RENAME)\b|CREATE\s+(?:OR\s+REPLACE\s+)?(?:UNIQUE\s+)?(?:TABLE|INDEX|DATABASE|SCHEMA|VIEW|FUNCTION|PROCEDURE|TRIGGER)\b)";

static MUTATION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!("^{}", BLOCKED_KEYWORDS)).expect("valid regex"));

static CTE_MUTATION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?s)^WITH\s+.*\b{}", BLOCKED_KEYWORDS)).expect("valid regex")
});

/// Whether `sql` would modify data or schema.
///
/// Backslash escapes inside literals are dialect-specific, so the text is
/// split both ways and a write found under either reading counts.
pub fn is_query_mutation(sql: &str) -> bool {
    [false, true].into_iter().any(|backslash_escapes| {
        split_statements(sql, backslash_escapes)
            .iter()
            .any(|statement| statement_is_mutation(statement))
    })
}

/// Reject `sql` when it would modify a read-only connection.
pub fn validate_query_for_read_only(sql: &str) -> Result<()> {
    if is_query_mutation(sql) {
        return Err(TesseraError::ReadOnlyViolation(preview(sql)));
    }
    Ok(())
}

fn statement_is_mutation(statement: &str) -> bool {
    let normalized = statement.trim().to_uppercase();
    if normalized.is_empty() || TEMP_OBJECT_REGEX.is_match(&normalized) {
        return false;
    }
    MUTATION_REGEX.is_match(&normalized) || CTE_MUTATION_REGEX.is_match(&normalized)
}

/// Short single-line form for error messages.
fn preview(sql: &str) -> String {
    let line = sql.split_whitespace().collect::<Vec<_>>().join(" ");
    if line.chars().count() > 80 {
        format!("{}...", line.chars().take(80).collect::<String>())
    } else {
        line
    }
}

/// Split on `;`, dropping comments and the contents of quoted text.
fn split_statements(sql: &str, backslash_escapes: bool) -> Vec<String> {
    let chars: Vec<char> = sql.chars().collect();
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        match c {
            '-' if next == Some('-') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
                current.push(' ');
            }
            '/' if next == Some('*') => {
                i += 2;
                while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                    i += 1;
                }
                i += 1;
                current.push(' ');
            }
            '\'' | '"' | '`' => {
                // Doubled quotes close and reopen the literal, which leaves
                // the blanked text unchanged.
                i += 1;
                while i < chars.len() && chars[i] != c {
                    if backslash_escapes && c != '`' && chars[i] == '\\' {
                        i += 1;
                    }
                    i += 1;
                }
                current.push(c);
                current.push(c);
            }
            '[' => {
                while i < chars.len() && chars[i] != ']' {
                    i += 1;
                }
                current.push_str("[]");
            }
            '$' => match dollar_tag(&chars, i) {
                Some(tag) => {
                    i += tag.len();
                    while i < chars.len() && !chars[i..].starts_with(&tag) {
                        i += 1;
                    }
                    i += tag.len() - 1;
                    current.push_str("$$");
                }
                None => current.push(c),
            },
            ';' => statements.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
        i += 1;
    }
    statements.push(current);
    statements
}

/// The `$tag$` opening a dollar-quoted body at `start`, if any.
///
/// `$1` placeholders and `$` inside identifiers do not open one.
fn dollar_tag(chars: &[char], start: usize) -> Option<Vec<char>> {
    if start > 0 {
        let prev = chars[start - 1];
        if prev.is_alphanumeric() || prev == '_' || prev == '$' {
            return None;
        }
    }
    let mut end = start + 1;
    while end < chars.len() && (chars[end].is_alphanumeric() || chars[end] == '_') {
        end += 1;
    }
    let tag = &chars[start + 1..end];
    if chars.get(end) != Some(&'$') || tag.first().is_some_and(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(chars[start..=end].to_vec())
}
