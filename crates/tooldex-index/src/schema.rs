use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::{Error, Result};

// Schema version (increment when changing table definitions)
//
// v1: single-platform layout, UNIQUE(name, type), metadata blob only.
//     Files written before versioning existed report user_version 0.
// v2: composite (platform, name, type) identity, first-class columns,
//     missing_since, external-content FTS kept in sync by triggers.
pub const SCHEMA_VERSION: i32 = 2;

// Width-normalised timestamp expression; accepts both RFC 3339 and the
// "YYYY-MM-DD HH:MM:SS" form older writers produced.
pub(crate) fn normalized_ts(column: &str) -> String {
    format!("strftime('%Y-%m-%dT%H:%M:%fZ', {})", column)
}

const COMPONENTS_TABLE: &str = r#"
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    platform TEXT NOT NULL DEFAULT 'claude',
    name TEXT NOT NULL,
    type TEXT NOT NULL,
    origin TEXT NOT NULL DEFAULT 'unknown',
    status TEXT NOT NULL DEFAULT 'active',
    version TEXT,
    install_path TEXT,
    description TEXT,
    size_bytes INTEGER,
    line_count INTEGER,
    file_count INTEGER,
    last_modified TEXT,
    env_vars TEXT NOT NULL DEFAULT '[]',
    error_message TEXT,
    metadata_json TEXT,
    first_seen TEXT NOT NULL,
    last_seen TEXT NOT NULL,
    missing_since TEXT,
    UNIQUE(platform, name, type)
"#;

const EVENT_TABLES: &str = r#"
    CREATE TABLE IF NOT EXISTS invocations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        component_id INTEGER NOT NULL,
        session_id TEXT,
        timestamp TEXT NOT NULL,
        duration_ms INTEGER,
        success BOOLEAN NOT NULL DEFAULT 1,
        error_message TEXT,
        FOREIGN KEY (component_id) REFERENCES components(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS installation_events (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        component_id INTEGER NOT NULL,
        event_type TEXT NOT NULL,
        timestamp TEXT NOT NULL,
        version TEXT,
        metadata_json TEXT,
        FOREIGN KEY (component_id) REFERENCES components(id) ON DELETE CASCADE
    );
"#;

const INDEXES: &str = r#"
    CREATE INDEX IF NOT EXISTS idx_invocations_timestamp ON invocations(timestamp);
    CREATE INDEX IF NOT EXISTS idx_invocations_component ON invocations(component_id);
    CREATE INDEX IF NOT EXISTS idx_events_timestamp ON installation_events(timestamp);
    CREATE INDEX IF NOT EXISTS idx_events_component ON installation_events(component_id);
    CREATE INDEX IF NOT EXISTS idx_components_platform ON components(platform);
    CREATE INDEX IF NOT EXISTS idx_components_type ON components(type);
    CREATE INDEX IF NOT EXISTS idx_components_origin ON components(origin);
"#;

const FTS: &str = r#"
    CREATE VIRTUAL TABLE IF NOT EXISTS components_fts USING fts5(
        name,
        description,
        install_path,
        content='components',
        content_rowid='id'
    );

    CREATE TRIGGER IF NOT EXISTS components_fts_insert AFTER INSERT ON components BEGIN
        INSERT INTO components_fts(rowid, name, description, install_path)
        VALUES (new.id, new.name, new.description, new.install_path);
    END;

    CREATE TRIGGER IF NOT EXISTS components_fts_delete AFTER DELETE ON components BEGIN
        INSERT INTO components_fts(components_fts, rowid, name, description, install_path)
        VALUES ('delete', old.id, old.name, old.description, old.install_path);
    END;

    CREATE TRIGGER IF NOT EXISTS components_fts_update AFTER UPDATE ON components BEGIN
        INSERT INTO components_fts(components_fts, rowid, name, description, install_path)
        VALUES ('delete', old.id, old.name, old.description, old.install_path);
        INSERT INTO components_fts(rowid, name, description, install_path)
        VALUES (new.id, new.name, new.description, new.install_path);
    END;
"#;

/// Bring the store to [`SCHEMA_VERSION`], creating or migrating as needed.
pub fn init_schema(conn: &mut Connection) -> Result<()> {
    let current = read_version(conn)?;

    if current > SCHEMA_VERSION {
        return Err(Error::SchemaTooNew {
            found: current,
            supported: SCHEMA_VERSION,
        });
    }

    if current == 0 && !table_exists(conn, "components")? {
        return create_schema(conn);
    }

    if current < SCHEMA_VERSION {
        // Unversioned files with tables were written by the v1 layout
        let from = current.max(1);
        tracing::info!(from, to = SCHEMA_VERSION, "migrating tooling index");
        return migrate_v1(conn).map_err(|err| match err {
            Error::Database(source) => Error::Migration { from, source },
            other => other,
        });
    }

    Ok(())
}

pub fn read_version(conn: &Connection) -> Result<i32> {
    Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
}

fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type IN ('table', 'view') AND name = ?1",
        [name],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn column_exists(conn: &Connection, table: &str, column: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM pragma_table_info(?1) WHERE name = ?2",
        [table, column],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn create_schema(conn: &mut Connection) -> Result<()> {
    let tx = Transaction::new(conn, TransactionBehavior::Immediate)?;
    tx.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS components ({});",
        COMPONENTS_TABLE
    ))?;
    tx.execute_batch(EVENT_TABLES)?;
    tx.execute_batch(INDEXES)?;
    tx.execute_batch(FTS)?;
    tx.execute(&format!("PRAGMA user_version = {}", SCHEMA_VERSION), [])?;
    tx.commit()?;
    Ok(())
}

/// v1 → v2 in one transaction. Any failure rolls everything back.
fn migrate_v1(conn: &mut Connection) -> Result<()> {
    // Table swaps below leave FK references dangling until the rename
    conn.execute_batch("PRAGMA foreign_keys = OFF;")?;
    let result = run_v1_migration(conn);
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    result
}

fn run_v1_migration(conn: &mut Connection) -> Result<()> {
    let has_platform = column_exists(conn, "components", "platform")?;
    let has_invocations = table_exists(conn, "invocations")?;
    let has_events = table_exists(conn, "installation_events")?;

    let tx = Transaction::new(conn, TransactionBehavior::Immediate)?;

    tx.execute_batch(&format!(
        "DROP TABLE IF EXISTS components_v2; CREATE TABLE components_v2 ({});",
        COMPONENTS_TABLE
    ))?;

    let platform_expr = if has_platform {
        "COALESCE(NULLIF(platform, ''), 'claude')"
    } else {
        "'claude'"
    };
    let meta = |path: &str| {
        format!(
            "CASE WHEN json_valid(metadata_json) THEN json_extract(metadata_json, '{}') END",
            path
        )
    };
    tx.execute(
        &format!(
            r#"
            INSERT INTO components_v2 (
                id, platform, name, type, origin, status, version, install_path,
                description, line_count, file_count, last_modified, env_vars,
                metadata_json, first_seen, last_seen
            )
            SELECT
                id, {platform}, name, type,
                COALESCE(origin, 'unknown'), COALESCE(status, 'active'),
                version, install_path,
                {description}, {lines}, {files},
                {last_modified},
                '[]', metadata_json,
                COALESCE({first_seen}, first_seen),
                COALESCE({last_seen}, last_seen)
            FROM components
            "#,
            platform = platform_expr,
            description = meta("$.description"),
            lines = format!("CAST({} AS INTEGER)", meta("$.total_lines")),
            files = format!("CAST({} AS INTEGER)", meta("$.file_count")),
            last_modified = normalized_ts(&meta("$.last_modified")),
            first_seen = normalized_ts("first_seen"),
            last_seen = normalized_ts("last_seen"),
        ),
        [],
    )?;

    tx.execute_batch(
        r#"
        DROP TRIGGER IF EXISTS components_fts_insert;
        DROP TRIGGER IF EXISTS components_fts_delete;
        DROP TRIGGER IF EXISTS components_fts_update;
        DROP TABLE IF EXISTS components_fts;
        DROP TABLE components;
        ALTER TABLE components_v2 RENAME TO components;
        "#,
    )?;

    tx.execute_batch(EVENT_TABLES)?;

    if has_invocations {
        tx.execute(
            &format!(
                "UPDATE invocations SET timestamp = {ts}, success = COALESCE(success, 1)
                 WHERE {ts} IS NOT NULL",
                ts = normalized_ts("timestamp")
            ),
            [],
        )?;
    }
    if has_events {
        tx.execute(
            &format!(
                r#"
                UPDATE installation_events SET
                    event_type = CASE event_type
                        WHEN 'installed' THEN 'install'
                        WHEN 'updated' THEN 'update'
                        WHEN 'removed' THEN 'remove'
                        ELSE event_type
                    END,
                    timestamp = COALESCE({ts}, timestamp)
                "#,
                ts = normalized_ts("timestamp")
            ),
            [],
        )?;
    }

    tx.execute_batch(INDEXES)?;
    tx.execute_batch(FTS)?;
    tx.execute(
        "INSERT INTO components_fts(components_fts) VALUES ('rebuild')",
        [],
    )?;
    tx.execute(&format!("PRAGMA user_version = {}", SCHEMA_VERSION), [])?;
    tx.commit()?;
    Ok(())
}
