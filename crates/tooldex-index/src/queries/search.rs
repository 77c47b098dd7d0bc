use rusqlite::{Connection, ToSql};

use super::component::{COLUMNS, collect_rows};
use crate::Result;
use crate::records::{ComponentFilter, ComponentRow};

/// Turn free text into an FTS5 query: every whitespace-separated term is
/// quoted and prefix-matched, and all terms must match.
///
/// Returns `None` when the input holds nothing searchable.
pub fn fts_query(input: &str) -> Option<String> {
    let terms: Vec<String> = input
        .split_whitespace()
        .filter(|term| term.chars().any(char::is_alphanumeric))
        .map(|term| format!("\"{}\"*", term.replace('"', "\"\"")))
        .collect();

    (!terms.is_empty()).then(|| terms.join(" "))
}

/// Ranked full-text search over name, description and install path
pub fn search(conn: &Connection, query: &str, filter: &ComponentFilter) -> Result<Vec<ComponentRow>> {
    let Some(fts) = fts_query(query) else {
        return Ok(Vec::new());
    };

    let (filter_clauses, filter_params) = filter.clauses("c");
    let mut clauses = vec!["components_fts MATCH ?".to_string()];
    clauses.extend(filter_clauses);
    let mut params: Vec<Box<dyn ToSql>> = vec![Box::new(fts)];
    params.extend(filter_params);

    let mut sql = format!(
        "SELECT {} FROM components_fts JOIN components c ON c.id = components_fts.rowid WHERE {} \
         ORDER BY rank, c.platform, c.name, c.type",
        COLUMNS,
        clauses.join(" AND ")
    );
    if let Some(limit) = filter.limit {
        sql.push_str(&format!(" LIMIT {}", limit));
    }

    collect_rows(conn, &sql, &params)
}
