use rusqlite::{Connection, OptionalExtension, Row, ToSql, params};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use tooldex_types::{
    ComponentDetails, ComponentKey, ComponentKind, ComponentRecord, InstallEventKind, Platform,
    ScanResult, format_timestamp, parse_timestamp,
};

use super::event;
use crate::records::{ComponentFilter, ComponentRow, UpsertReport};
use crate::Result;

pub(crate) const COLUMNS: &str = "c.id, c.platform, c.name, c.type, c.origin, c.status, \
     c.version, c.install_path, c.description, c.size_bytes, c.line_count, c.file_count, \
     c.last_modified, c.env_vars, c.error_message, c.metadata_json, \
     c.first_seen, c.last_seen, c.missing_since";

/// Shape of `metadata_json` for rows written by this version
#[derive(Serialize, Deserialize)]
struct StoredMetadata {
    details: ComponentDetails,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    extra: BTreeMap<String, Value>,
}

struct PreviousState {
    id: i64,
    version: Option<String>,
    missing_since: Option<String>,
}

fn to_i64(value: Option<u64>) -> Option<i64> {
    value.and_then(|v| i64::try_from(v).ok())
}

fn to_u64(value: Option<i64>) -> Option<u64> {
    value.and_then(|v| u64::try_from(v).ok())
}

/// Insert or refresh every record of a scan and mark absent components
/// of covered `(platform, kind)` pairs as missing.
///
/// Must run inside the caller's transaction.
pub fn upsert_scan(conn: &Connection, scan: &ScanResult) -> Result<UpsertReport> {
    let now = format_timestamp(&scan.scanned_at);
    let mut report = UpsertReport::default();
    let mut seen = HashSet::new();

    for record in &scan.components {
        if !record.has_valid_identity() {
            tracing::warn!(name = %record.name, kind = %record.kind, "skipping record without identity");
            continue;
        }
        let record = record.clone().redacted();
        let previous = previous_state(conn, &record.key())?;
        let changed = upsert_one(conn, &record, &now)?;

        let id = match &previous {
            Some(prev) => prev.id,
            None => conn.last_insert_rowid(),
        };
        seen.insert(id);

        match previous {
            None => {
                report.inserted += 1;
                event::insert_install_event(
                    conn,
                    id,
                    InstallEventKind::Install,
                    &now,
                    record.version.as_deref(),
                )?;
            }
            Some(_) if !changed => report.unchanged += 1,
            Some(prev) => {
                report.updated += 1;
                let kind = if prev.missing_since.is_some() {
                    Some(InstallEventKind::Install)
                } else if prev.version != record.version {
                    Some(InstallEventKind::Update)
                } else {
                    None
                };
                if let Some(kind) = kind {
                    event::insert_install_event(conn, id, kind, &now, record.version.as_deref())?;
                }
            }
        }
    }

    for (platform, kind) in &scan.coverage {
        let mut stmt = conn.prepare(
            r#"
            SELECT id, version FROM components
            WHERE platform = ?1 AND type = ?2 AND missing_since IS NULL
            ORDER BY name
            "#,
        )?;
        let mut rows = stmt.query(params![platform.as_str(), kind.as_str()])?;
        let mut gone = Vec::new();
        while let Some(row) = rows.next()? {
            let id: i64 = row.get(0)?;
            if !seen.contains(&id) {
                gone.push((id, row.get::<_, Option<String>>(1)?));
            }
        }

        for (id, version) in gone {
            conn.execute(
                "UPDATE components SET missing_since = ?1 WHERE id = ?2",
                params![&now, id],
            )?;
            event::insert_install_event(
                conn,
                id,
                InstallEventKind::Remove,
                &now,
                version.as_deref(),
            )?;
            report.marked_missing += 1;
        }
    }

    Ok(report)
}

fn previous_state(conn: &Connection, key: &ComponentKey) -> Result<Option<PreviousState>> {
    Ok(conn
        .query_row(
            r#"
            SELECT id, version, missing_since FROM components
            WHERE platform = ?1 AND name = ?2 AND type = ?3
            "#,
            params![key.platform.as_str(), &key.name, key.kind.as_str()],
            |row| {
                Ok(PreviousState {
                    id: row.get(0)?,
                    version: row.get(1)?,
                    missing_since: row.get(2)?,
                })
            },
        )
        .optional()?)
}

/// Returns true when a row was inserted or rewritten
fn upsert_one(conn: &Connection, record: &ComponentRecord, now: &str) -> Result<bool> {
    let metadata = serde_json::to_string(&StoredMetadata {
        details: record.details.clone(),
        extra: record.extra.clone(),
    })?;
    let env_vars = serde_json::to_string(&record.env_vars)?;
    let install_path = record
        .install_path
        .as_ref()
        .map(|p| p.to_string_lossy().into_owned());
    let last_modified = record.last_modified.as_ref().map(format_timestamp);

    // Unchanged rows are left alone so rescans cause no churn
    let changes = conn.execute(
        r#"
        INSERT INTO components (
            platform, name, type, origin, status, version, install_path, description,
            size_bytes, line_count, file_count, last_modified, env_vars, error_message,
            metadata_json, first_seen, last_seen
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?16)
        ON CONFLICT(platform, name, type) DO UPDATE SET
            origin = excluded.origin,
            status = excluded.status,
            version = excluded.version,
            install_path = excluded.install_path,
            description = excluded.description,
            size_bytes = excluded.size_bytes,
            line_count = excluded.line_count,
            file_count = excluded.file_count,
            last_modified = excluded.last_modified,
            env_vars = excluded.env_vars,
            error_message = excluded.error_message,
            metadata_json = excluded.metadata_json,
            last_seen = excluded.last_seen,
            missing_since = NULL
        WHERE components.missing_since IS NOT NULL
            OR components.origin IS NOT excluded.origin
            OR components.status IS NOT excluded.status
            OR components.version IS NOT excluded.version
            OR components.install_path IS NOT excluded.install_path
            OR components.description IS NOT excluded.description
            OR components.size_bytes IS NOT excluded.size_bytes
            OR components.line_count IS NOT excluded.line_count
            OR components.file_count IS NOT excluded.file_count
            OR components.last_modified IS NOT excluded.last_modified
            OR components.env_vars IS NOT excluded.env_vars
            OR components.error_message IS NOT excluded.error_message
            OR components.metadata_json IS NOT excluded.metadata_json
        "#,
        params![
            record.platform.as_str(),
            &record.name,
            record.kind.as_str(),
            record.origin.as_str(),
            record.status.as_str(),
            &record.version,
            install_path,
            &record.description,
            to_i64(record.size_bytes),
            to_i64(record.line_count),
            to_i64(record.file_count),
            last_modified,
            env_vars,
            &record.error_message,
            metadata,
            now,
        ],
    )?;

    Ok(changes > 0)
}

pub fn list(conn: &Connection, filter: &ComponentFilter) -> Result<Vec<ComponentRow>> {
    let (clauses, params) = filter.clauses("c");

    let mut sql = format!("SELECT {} FROM components c", COLUMNS);
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY c.platform, c.name, c.type");
    if let Some(limit) = filter.limit {
        sql.push_str(&format!(" LIMIT {}", limit));
    }

    collect_rows(conn, &sql, &params)
}

pub fn count(conn: &Connection, filter: &ComponentFilter) -> Result<usize> {
    let (clauses, params) = filter.clauses("c");

    let mut sql = "SELECT COUNT(*) FROM components c".to_string();
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }

    let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let count: i64 = conn.query_row(&sql, param_refs.as_slice(), |row| row.get(0))?;
    Ok(count as usize)
}

pub fn get(conn: &Connection, key: &ComponentKey) -> Result<Option<ComponentRow>> {
    let sql = format!(
        "SELECT {} FROM components c WHERE c.platform = ?1 AND c.name = ?2 AND c.type = ?3",
        COLUMNS
    );
    let params: Vec<Box<dyn ToSql>> = vec![
        Box::new(key.platform.as_str()),
        Box::new(key.name.clone()),
        Box::new(key.kind.as_str()),
    ];
    Ok(collect_rows(conn, &sql, &params)?.into_iter().next())
}

/// Delete missing components together with their events
pub fn prune_missing(conn: &Connection) -> Result<usize> {
    conn.execute(
        r#"
        DELETE FROM invocations WHERE component_id IN
            (SELECT id FROM components WHERE missing_since IS NOT NULL)
        "#,
        [],
    )?;
    conn.execute(
        r#"
        DELETE FROM installation_events WHERE component_id IN
            (SELECT id FROM components WHERE missing_since IS NOT NULL)
        "#,
        [],
    )?;
    let removed = conn.execute("DELETE FROM components WHERE missing_since IS NOT NULL", [])?;
    Ok(removed)
}

pub(crate) fn collect_rows(
    conn: &Connection,
    sql: &str,
    params: &[Box<dyn ToSql>],
) -> Result<Vec<ComponentRow>> {
    let mut stmt = conn.prepare(sql)?;
    let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let mut rows = stmt.query(param_refs.as_slice())?;

    let mut components = Vec::new();
    while let Some(row) = rows.next()? {
        components.push(read_row(row)?);
    }
    Ok(components)
}

fn read_row(row: &Row<'_>) -> Result<ComponentRow> {
    let platform: Platform = row.get::<_, String>(1)?.parse()?;
    let name: String = row.get(2)?;
    let kind: ComponentKind = row.get::<_, String>(3)?.parse()?;
    let origin: String = row.get(4)?;
    let status: String = row.get(5)?;
    let env_vars: String = row.get(13)?;
    let metadata_json: Option<String> = row.get(15)?;
    let last_modified: Option<String> = row.get(12)?;

    let (details, extra) = decode_metadata(kind, metadata_json.as_deref());

    let mut record = ComponentRecord::new(platform, name, details);
    // Older rows may carry values this version no longer emits
    record.origin = origin.parse().unwrap_or_default();
    record.status = status.parse().unwrap_or_default();
    record.version = row.get(6)?;
    record.install_path = row.get::<_, Option<String>>(7)?.map(Into::into);
    record.description = row.get(8)?;
    record.size_bytes = to_u64(row.get(9)?);
    record.line_count = to_u64(row.get(10)?);
    record.file_count = to_u64(row.get(11)?);
    record.last_modified = last_modified.and_then(|ts| parse_timestamp(&ts).ok());
    record.env_vars = serde_json::from_str(&env_vars).unwrap_or_default();
    record.error_message = row.get(14)?;
    record.extra = extra;

    Ok(ComponentRow {
        id: row.get(0)?,
        record,
        first_seen: row.get(16)?,
        last_seen: row.get(17)?,
        missing_since: row.get(18)?,
    })
}

/// Split `metadata_json` into details and extra.
///
/// Rows migrated from v1 hold a flat attribute blob; it is kept under
/// `extra["legacy_metadata"]` and the details start empty.
fn decode_metadata(
    kind: ComponentKind,
    metadata_json: Option<&str>,
) -> (ComponentDetails, BTreeMap<String, Value>) {
    let empty = || (ComponentDetails::empty(kind), BTreeMap::new());
    let Some(value) = metadata_json.and_then(|s| serde_json::from_str::<Value>(s).ok()) else {
        return empty();
    };

    if value.get("details").is_some() {
        if let Ok(stored) = serde_json::from_value::<StoredMetadata>(value.clone())
            && stored.details.kind() == kind
        {
            return (stored.details, stored.extra);
        }
        return empty();
    }

    let mut extra = BTreeMap::new();
    if value.is_object() {
        extra.insert("legacy_metadata".to_string(), value);
    }
    (ComponentDetails::empty(kind), extra)
}
