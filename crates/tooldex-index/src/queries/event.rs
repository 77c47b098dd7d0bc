use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, ToSql, params};
use tooldex_types::{
    ComponentKey, ComponentKind, InstallEvent, InstallEventKind, InvocationEvent, Platform,
    format_timestamp, parse_timestamp,
};

use crate::Result;
use crate::records::InvocationRow;
use crate::schema::normalized_ts;

/// Row id for an identity.
///
/// Without a platform, a unique match wins; when several platforms have
/// the component, `claude` is preferred, then platform name order.
pub fn resolve_component_id(
    conn: &Connection,
    platform: Option<Platform>,
    name: &str,
    kind: ComponentKind,
) -> Result<Option<i64>> {
    let id: Option<i64> = match platform {
        Some(platform) => conn
            .query_row(
                "SELECT id FROM components WHERE platform = ?1 AND name = ?2 AND type = ?3",
                params![platform.as_str(), name, kind.as_str()],
                |row| row.get(0),
            )
            .optional()?,
        None => conn
            .query_row(
                r#"
                SELECT id FROM components
                WHERE name = ?1 AND type = ?2
                ORDER BY (platform = 'claude') DESC, platform
                LIMIT 1
                "#,
                params![name, kind.as_str()],
                |row| row.get(0),
            )
            .optional()?,
    };
    Ok(id)
}

/// Append an invocation; `false` when the component is unknown
pub fn record_invocation(conn: &Connection, event: &InvocationEvent) -> Result<bool> {
    let Some(component_id) = resolve_component_id(conn, event.platform, &event.name, event.kind)?
    else {
        return Ok(false);
    };

    let session_id = (!event.session_id.is_empty()).then_some(event.session_id.as_str());
    conn.execute(
        r#"
        INSERT INTO invocations (component_id, session_id, timestamp, duration_ms, success, error_message)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
        params![
            component_id,
            session_id,
            format_timestamp(&event.timestamp),
            event.duration_ms.and_then(|d| i64::try_from(d).ok()),
            event.success,
            &event.error_message,
        ],
    )?;
    Ok(true)
}

/// Append an installation event; `false` when the component is unknown
pub fn record_install_event(conn: &Connection, event: &InstallEvent) -> Result<bool> {
    let key = &event.key;
    let Some(component_id) = resolve_component_id(conn, Some(key.platform), &key.name, key.kind)?
    else {
        return Ok(false);
    };

    insert_install_event(
        conn,
        component_id,
        event.kind,
        &format_timestamp(&event.timestamp),
        event.version.as_deref(),
    )?;
    Ok(true)
}

pub(crate) fn insert_install_event(
    conn: &Connection,
    component_id: i64,
    kind: InstallEventKind,
    timestamp: &str,
    version: Option<&str>,
) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO installation_events (component_id, event_type, timestamp, version)
        VALUES (?1, ?2, ?3, ?4)
        "#,
        params![component_id, kind.as_str(), timestamp, version],
    )?;
    Ok(())
}

fn since_clause(column: &str, since: Option<&DateTime<Utc>>) -> (String, Vec<Box<dyn ToSql>>) {
    match since {
        Some(ts) => (
            format!("WHERE {} >= ?1", normalized_ts(column)),
            vec![Box::new(format_timestamp(ts)) as Box<dyn ToSql>],
        ),
        None => (String::new(), Vec::new()),
    }
}

/// Invocations at or after `since` (all when `None`), oldest first
pub fn invocations_since(
    conn: &Connection,
    since: Option<&DateTime<Utc>>,
) -> Result<Vec<InvocationRow>> {
    let (where_clause, params) = since_clause("i.timestamp", since);
    let sql = format!(
        r#"
        SELECT c.platform, c.name, c.type, i.session_id,
               COALESCE({ts}, i.timestamp), i.duration_ms, i.success
        FROM invocations i
        JOIN components c ON c.id = i.component_id
        {where_clause}
        ORDER BY 5, c.platform, c.name, c.type, i.id
        "#,
        ts = normalized_ts("i.timestamp"),
    );

    let mut stmt = conn.prepare(&sql)?;
    let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let mut rows = stmt.query(param_refs.as_slice())?;

    let mut invocations = Vec::new();
    while let Some(row) = rows.next()? {
        let raw_ts: String = row.get(4)?;
        let Ok(timestamp) = parse_timestamp(&raw_ts) else {
            tracing::warn!(timestamp = %raw_ts, "skipping invocation with unreadable timestamp");
            continue;
        };
        let key = ComponentKey::new(
            row.get::<_, String>(0)?.parse::<Platform>()?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?.parse::<ComponentKind>()?,
        );
        invocations.push(InvocationRow {
            key,
            session_id: row.get(3)?,
            timestamp,
            duration_ms: row
                .get::<_, Option<i64>>(5)?
                .and_then(|d| u64::try_from(d).ok()),
            success: row.get::<_, Option<bool>>(6)?.unwrap_or(true),
        });
    }
    Ok(invocations)
}

/// Installation events at or after `since` (all when `None`), oldest first
pub fn install_events_since(
    conn: &Connection,
    since: Option<&DateTime<Utc>>,
) -> Result<Vec<InstallEvent>> {
    let (where_clause, params) = since_clause("e.timestamp", since);
    let sql = format!(
        r#"
        SELECT c.platform, c.name, c.type, e.event_type,
               COALESCE({ts}, e.timestamp), e.version
        FROM installation_events e
        JOIN components c ON c.id = e.component_id
        {where_clause}
        ORDER BY 5, c.platform, c.name, c.type, e.id
        "#,
        ts = normalized_ts("e.timestamp"),
    );

    let mut stmt = conn.prepare(&sql)?;
    let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let mut rows = stmt.query(param_refs.as_slice())?;

    let mut events = Vec::new();
    while let Some(row) = rows.next()? {
        let raw_ts: String = row.get(4)?;
        let raw_kind: String = row.get(3)?;
        let (Ok(timestamp), Ok(kind)) = (
            parse_timestamp(&raw_ts),
            raw_kind.parse::<InstallEventKind>(),
        ) else {
            tracing::warn!(timestamp = %raw_ts, event_type = %raw_kind, "skipping unreadable installation event");
            continue;
        };
        events.push(InstallEvent {
            key: ComponentKey::new(
                row.get::<_, String>(0)?.parse::<Platform>()?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?.parse::<ComponentKind>()?,
            ),
            kind,
            timestamp,
            version: row.get(5)?,
        });
    }
    Ok(events)
}
