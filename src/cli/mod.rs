pub mod file;
pub mod store;

use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;
use serde_json::Value;

use workflow_config::storage::database::open_connection;
use workflow_config::storage::migrations::migrate_presets_db;
use workflow_config::storage::path_utils;

/// Read and parse a JSON preset file.
pub fn read_json(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path.display()))
}

/// Pretty-print `value` to `out`, or to stdout when no path is given.
pub fn emit_json(value: &Value, out: Option<&Path>) -> Result<()> {
    let pretty = serde_json::to_string_pretty(value)?;
    match out {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, format!("{}\n", pretty))
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), "Preset written");
        }
        None => println!("{}", pretty),
    }
    Ok(())
}

/// Open the preset store (explicit `--db` or the default location), migrated.
pub fn open_store(db: Option<&Path>) -> Result<Connection> {
    let path = db
        .map(Path::to_path_buf)
        .unwrap_or_else(path_utils::presets_db_path);
    let conn = open_connection(&path)
        .with_context(|| format!("Failed to open preset store {}", path.display()))?;
    migrate_presets_db(&conn).context("Failed to migrate preset store")?;
    Ok(conn)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use serde_json::{json, Value};

    /// Smallest useful legacy preset: one configured agent with its prompt.
    pub fn v1_rank_only() -> Value {
        json!({
            "version": "1.0",
            "description": "Rank only",
            "created_at": "2024-05-01T12:00:00Z",
            "agent_models": {
                "RankAgent_provider": "openai",
                "RankAgent": "gpt-4o-mini",
                "RankAgent_temperature": 0.2,
                "OSDetectionAgent_selected_os": ["Windows"],
            },
            "agent_prompts": {
                "RankAgent": { "prompt": "Rank the article.", "instructions": "Score 1-10." },
            },
            "qa_enabled": { "RankAgent": false },
        })
    }

    pub fn write_json(dir: &std::path::Path, name: &str, value: &Value) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, serde_json::to_string(value).unwrap()).unwrap();
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_read_json_reports_bad_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = read_json(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("Invalid JSON"));
        assert!(read_json(&dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn test_emit_json_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out").join("preset.json");
        emit_json(&json!({ "Version": "2.0" }), Some(&out)).unwrap();
        assert_eq!(read_json(&out).unwrap(), json!({ "Version": "2.0" }));
    }

    #[test]
    fn test_open_store_migrates() {
        let dir = tempfile::tempdir().unwrap();
        let conn = open_store(Some(&dir.path().join("presets.db"))).unwrap();
        let version = workflow_config::storage::migrations::get_schema_version(&conn).unwrap();
        assert_eq!(version, workflow_config::storage::migrations::CURRENT_SCHEMA_VERSION);
    }
}
