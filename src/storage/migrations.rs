use crate::{WorkflowConfigError, WorkflowConfigResult};
use rusqlite::Connection;

/// Current schema version of presets.db
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

/// Schema version recorded in the DB (0 when the table is missing).
pub fn get_schema_version(conn: &Connection) -> WorkflowConfigResult<u32> {
    let exists: bool = conn
        .query_row(
            "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='schema_version'",
            [],
            |r| r.get(0),
        )
        .map_err(|e| WorkflowConfigError::Storage(e.to_string()))?;

    if !exists {
        return Ok(0);
    }

    let version: u32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |r| r.get(0),
        )
        .map_err(|e| WorkflowConfigError::Storage(e.to_string()))?;

    Ok(version)
}

fn set_schema_version(conn: &Connection, version: u32) -> WorkflowConfigResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_version (version, applied_at) VALUES (?1, datetime('now'))",
        rusqlite::params![version],
    )
    .map_err(|e| WorkflowConfigError::Storage(e.to_string()))?;
    Ok(())
}

// ── Presets DB ──

// Column layout matches the legacy flat preset shape; JSON columns hold
// serialized objects.
const PRESETS_DB_V1: &str = "
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS workflow_configs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    version INTEGER NOT NULL DEFAULT 1,
    is_active INTEGER NOT NULL DEFAULT 0,
    min_hunt_score REAL NOT NULL DEFAULT 97.0,
    ranking_threshold REAL NOT NULL DEFAULT 6.0,
    similarity_threshold REAL NOT NULL DEFAULT 0.5,
    junk_filter_threshold REAL NOT NULL DEFAULT 0.8,
    auto_trigger_hunt_score_threshold REAL NOT NULL DEFAULT 60.0,
    agent_models TEXT NOT NULL DEFAULT '{}',
    agent_prompts TEXT NOT NULL DEFAULT '{}',
    qa_enabled TEXT NOT NULL DEFAULT '{}',
    qa_max_retries INTEGER NOT NULL DEFAULT 5,
    sigma_fallback_enabled INTEGER NOT NULL DEFAULT 0,
    osdetection_fallback_enabled INTEGER NOT NULL DEFAULT 0,
    rank_agent_enabled INTEGER NOT NULL DEFAULT 1,
    extract_agent_settings TEXT NOT NULL DEFAULT '{\"disabled_agents\": []}',
    description TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_workflow_configs_active ON workflow_configs(is_active);
CREATE INDEX IF NOT EXISTS idx_workflow_configs_version ON workflow_configs(version);
";

pub fn migrate_presets_db(conn: &Connection) -> WorkflowConfigResult<()> {
    let version = get_schema_version(conn)?;

    if version < 1 {
        conn.execute_batch(PRESETS_DB_V1).map_err(|e| {
            WorkflowConfigError::Storage(format!("Presets DB V1 migration failed: {}", e))
        })?;
        set_schema_version(conn, 1)?;
    }

    // V2: cmdline attention preprocessor flag
    if version < 2 {
        conn.execute_batch(
            "ALTER TABLE workflow_configs ADD COLUMN cmdline_attention_preprocessor_enabled INTEGER NOT NULL DEFAULT 1;",
        )
        .map_err(|e| {
            WorkflowConfigError::Storage(format!("Presets DB V2 migration failed: {}", e))
        })?;
        set_schema_version(conn, 2)?;
    }

    if version < CURRENT_SCHEMA_VERSION {
        tracing::info!(from = version, to = CURRENT_SCHEMA_VERSION, "Presets DB migrated");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column_names(conn: &Connection) -> Vec<String> {
        let mut stmt = conn.prepare("PRAGMA table_info(workflow_configs)").unwrap();
        stmt.query_map([], |r| r.get::<_, String>(1))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect()
    }

    #[test]
    fn test_fresh_db_reaches_current_version() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), 0);
        migrate_presets_db(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_SCHEMA_VERSION);
        assert!(column_names(&conn)
            .contains(&"cmdline_attention_preprocessor_enabled".to_string()));
    }

    #[test]
    fn test_migration_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate_presets_db(&conn).unwrap();
        migrate_presets_db(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn test_v1_db_upgrades_in_place() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(PRESETS_DB_V1).unwrap();
        set_schema_version(&conn, 1).unwrap();
        conn.execute(
            "INSERT INTO workflow_configs (created_at, updated_at) VALUES ('2024-01-01T00:00:00+00:00', '2024-01-01T00:00:00+00:00')",
            [],
        )
        .unwrap();

        migrate_presets_db(&conn).unwrap();

        let flag: bool = conn
            .query_row(
                "SELECT cmdline_attention_preprocessor_enabled FROM workflow_configs",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert!(flag, "existing rows get the column default");
    }
}
