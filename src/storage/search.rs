//! Substring search over track titles, album names and artist names.

use rusqlite::{params, Connection};

use super::browse::{map_search_result, RESULT_COLUMNS, RESULT_JOINS};
use super::models::SearchResult;
use crate::error::StorageError;
use crate::Result;

/// Search options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOptions {
    /// Maximum number of results. `None` returns every match.
    pub limit: Option<usize>,

    /// Number of matches to skip.
    pub offset: usize,
}

impl SearchOptions {
    /// Create new search options with a limit.
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Default::default()
        }
    }

    /// Skip the first `offset` matches.
    #[must_use]
    pub const fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }
}

/// Find tracks whose title, album or artist contains `query`.
///
/// Matching is case-insensitive (Unicode lowercase on both sides). Results
/// are ordered by artist name, album name, track number and track id. A
/// blank query matches nothing.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn search_tracks(
    conn: &Connection,
    query: &str,
    options: &SearchOptions,
) -> Result<Vec<SearchResult>> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Ok(Vec::new());
    }

    let sql = format!(
        "SELECT {RESULT_COLUMNS} {RESULT_JOINS}
         WHERE instr(casefold(t.name), ?1) > 0
            OR instr(casefold(al.name), ?1) > 0
            OR instr(casefold(ar.name), ?1) > 0
         ORDER BY ar.name, al.name, t.number, t.id
         LIMIT ?2 OFFSET ?3"
    );

    // SQLite treats a negative LIMIT as unbounded.
    let limit = options
        .limit
        .map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));
    let offset = i64::try_from(options.offset).unwrap_or(i64::MAX);

    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| StorageError::Database(format!("failed to prepare search: {e}")))?;

    let results = stmt
        .query_map(params![needle, limit, offset], map_search_result)
        .map_err(|e| StorageError::Database(format!("failed to execute search: {e}")))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| StorageError::Database(format!("failed to read result: {e}")))?;

    tracing::debug!(query, count = results.len(), "Search completed");

    Ok(results)
}
