//! Placeholder rewriting for backends that use numbered parameters.
//!
//! Statements are written with `?` placeholders. PostgreSQL expects `$1`,
//! `$2`, ... instead, so the statement is tokenized and only real placeholder
//! tokens are rewritten; a `?` inside a string literal, quoted identifier or
//! comment is left alone.

use crate::error::DriverError;
use sqlparser::dialect::GenericDialect;
use sqlparser::tokenizer::{Token, Tokenizer};

/// Rewrites `?` placeholders in `sql` to `$1..$n`.
///
/// Explicitly numbered `?N` placeholders become `$N`. All other text is kept
/// byte for byte.
pub fn number_placeholders(sql: &str) -> Result<String, DriverError> {
    let dialect = GenericDialect {};
    let tokens = Tokenizer::new(&dialect, sql)
        .tokenize_with_location()
        .map_err(|e| DriverError::Statement(e.to_string()))?;

    let line_starts = line_starts(sql);
    let mut out = String::with_capacity(sql.len() + 8);
    let mut copied_to = 0;
    let mut next = 1;

    for token in tokens {
        let Token::Placeholder(ref placeholder) = token.token else {
            continue;
        };
        let Some(suffix) = placeholder.strip_prefix('?') else {
            continue;
        };

        let offset = byte_offset(
            sql,
            &line_starts,
            token.location.line,
            token.location.column,
        )
        .ok_or_else(|| {
            DriverError::Statement(format!(
                "placeholder position {}:{} is outside the statement",
                token.location.line, token.location.column
            ))
        })?;

        out.push_str(&sql[copied_to..offset]);
        if suffix.is_empty() {
            out.push_str(&format!("${next}"));
            next += 1;
        } else {
            out.push('$');
            out.push_str(suffix);
        }
        copied_to = offset + placeholder.len();
    }

    out.push_str(&sql[copied_to..]);
    Ok(out)
}

/// Byte offsets at which each line of `sql` starts.
fn line_starts(sql: &str) -> Vec<usize> {
    let mut starts = vec![0];
    starts.extend(
        sql.char_indices()
            .filter(|(_, ch)| *ch == '\n')
            .map(|(i, _)| i + 1),
    );
    starts
}

/// Converts a 1-based line/column (in characters) to a byte offset.
fn byte_offset(sql: &str, line_starts: &[usize], line: u64, column: u64) -> Option<usize> {
    let line_start = *line_starts.get(usize::try_from(line).ok()?.checked_sub(1)?)?;
    let column = usize::try_from(column).ok()?.checked_sub(1)?;
    sql[line_start..]
        .char_indices()
        .nth(column)
        .map(|(i, _)| line_start + i)
}
