use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::{json, Map, Value};

use crate::agent::AgentName;
use crate::config_row::WorkflowConfigRow;
use crate::loader::load_workflow_config;
use crate::schema::WorkflowConfig;
use crate::time_utils;
use crate::{WorkflowConfigError, WorkflowConfigResult};

pub struct ConfigStore;

// ── Row mapping ──

/// Conversion failure that names the offending column.
fn column_error(row: &Row, name: &str, err: impl std::fmt::Display) -> rusqlite::Error {
    let index = row.as_ref().column_index(name).unwrap_or(usize::MAX);
    rusqlite::Error::FromSqlConversionFailure(
        index,
        Type::Text,
        format!("column {}: {}", name, err).into(),
    )
}

fn json_column(row: &Row, name: &str) -> rusqlite::Result<Value> {
    let raw: String = row.get(name)?;
    serde_json::from_str(&raw).map_err(|e| column_error(row, name, e))
}

fn time_column(row: &Row, name: &str) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(name)?;
    time_utils::from_sqlite(&raw).map_err(|e| column_error(row, name, e))
}

fn row_from_sql(row: &Row) -> rusqlite::Result<WorkflowConfigRow> {
    Ok(WorkflowConfigRow {
        id: row.get("id")?,
        version: row.get("version")?,
        is_active: row.get("is_active")?,
        min_hunt_score: row.get("min_hunt_score")?,
        ranking_threshold: row.get("ranking_threshold")?,
        similarity_threshold: row.get("similarity_threshold")?,
        junk_filter_threshold: row.get("junk_filter_threshold")?,
        auto_trigger_hunt_score_threshold: row.get("auto_trigger_hunt_score_threshold")?,
        agent_models: json_column(row, "agent_models")?,
        agent_prompts: json_column(row, "agent_prompts")?,
        qa_enabled: json_column(row, "qa_enabled")?,
        qa_max_retries: row.get("qa_max_retries")?,
        sigma_fallback_enabled: row.get("sigma_fallback_enabled")?,
        osdetection_fallback_enabled: row.get("osdetection_fallback_enabled")?,
        rank_agent_enabled: row.get("rank_agent_enabled")?,
        cmdline_attention_preprocessor_enabled: row.get("cmdline_attention_preprocessor_enabled")?,
        extract_agent_settings: json_column(row, "extract_agent_settings")?,
        description: row.get("description")?,
        created_at: time_column(row, "created_at")?,
        updated_at: time_column(row, "updated_at")?,
    })
}

/// `Metadata.CreatedAt` when it parses, otherwise now.
fn created_at_of(config: &WorkflowConfig) -> DateTime<Utc> {
    config
        .metadata
        .created_at
        .parse::<DateTime<Utc>>()
        .unwrap_or_else(|_| time_utils::now())
}

/// `agent_models` column for `config`.
///
/// A disabled agent with only one of provider/model set is written blank:
/// the column layout has no per-agent flag, so a half-filled pair would read
/// back as enabled.
fn stored_agent_models(config: &WorkflowConfig) -> Map<String, Value> {
    let mut flat = config.flatten_for_llm_service();
    for name in AgentName::ALL {
        let Some(agent) = config.agent(name) else { continue };
        if !agent.enabled && !agent.is_configured() {
            flat.insert(name.model_key().to_string(), json!(""));
            flat.insert(name.provider_key(), json!(""));
        }
    }
    flat
}

// ── CRUD ──

impl ConfigStore {
    /// Persist a validated config as a new row; returns its id.
    ///
    /// `version` is one past the highest stored version. The written row is
    /// loaded back before commit; a row that would not load is rolled back
    /// with `WorkflowConfigError::Validation`.
    pub fn insert(
        conn: &Connection,
        config: &WorkflowConfig,
        activate: bool,
    ) -> WorkflowConfigResult<i64> {
        let now = time_utils::now();
        let created_at = created_at_of(config);
        let rank_agent_enabled = config.agent(AgentName::RankAgent).map_or(true, |a| a.enabled);
        let osdetection_fallback_enabled = config
            .agent(AgentName::OSDetectionFallback)
            .map_or(false, |a| a.enabled);
        let description = Some(config.metadata.description.clone()).filter(|d| !d.is_empty());

        let tx = conn.unchecked_transaction()?;
        let next_version: i64 = tx.query_row(
            "SELECT COALESCE(MAX(version), 0) + 1 FROM workflow_configs",
            [],
            |r| r.get(0),
        )?;

        tx.execute(
            "INSERT INTO workflow_configs (
                version, is_active,
                min_hunt_score, ranking_threshold, similarity_threshold,
                junk_filter_threshold, auto_trigger_hunt_score_threshold,
                agent_models, agent_prompts, qa_enabled, qa_max_retries,
                sigma_fallback_enabled, osdetection_fallback_enabled, rank_agent_enabled,
                cmdline_attention_preprocessor_enabled, extract_agent_settings,
                description, created_at, updated_at
            ) VALUES (
                ?1, 0,
                ?2, ?3, ?4,
                ?5, ?6,
                ?7, ?8, ?9, ?10,
                ?11, ?12, ?13,
                ?14, ?15,
                ?16, ?17, ?18
            )",
            params![
                next_version,
                config.thresholds.min_hunt_score,
                config.thresholds.ranking_threshold,
                config.thresholds.similarity_threshold,
                config.thresholds.junk_filter_threshold,
                config.thresholds.auto_trigger_hunt_score_threshold,
                serde_json::to_string(&stored_agent_models(config))?,
                serde_json::to_string(&config.prompts)?,
                serde_json::to_string(&config.qa.enabled)?,
                config.qa.max_retries,
                config.features.sigma_fallback_enabled,
                osdetection_fallback_enabled,
                rank_agent_enabled,
                config.features.cmdline_attention_preprocessor_enabled,
                serde_json::to_string(&json!({
                    "disabled_agents": config.execution.extract_agent_settings.disabled_agents,
                }))?,
                description,
                time_utils::to_sqlite(&created_at),
                time_utils::to_sqlite(&now),
            ],
        )?;
        let id = tx.last_insert_rowid();

        let stored = tx.query_row(
            "SELECT * FROM workflow_configs WHERE id = ?1",
            params![id],
            row_from_sql,
        )?;
        if let Err(e) = load_workflow_config(&stored) {
            tracing::warn!(id, error = %e, "Stored row does not load back, rolling back");
            return Err(e.into());
        }

        if activate {
            Self::set_active(&tx, id)?;
        }
        tx.commit()?;

        tracing::debug!(id, version = next_version, activate, "Workflow config stored");
        Ok(id)
    }

    pub fn get(conn: &Connection, id: i64) -> WorkflowConfigResult<Option<WorkflowConfigRow>> {
        let row = conn
            .query_row(
                "SELECT * FROM workflow_configs WHERE id = ?1",
                params![id],
                row_from_sql,
            )
            .optional()?;
        Ok(row)
    }

    /// Same as `get`, but a missing row is an error.
    pub fn require(conn: &Connection, id: i64) -> WorkflowConfigResult<WorkflowConfigRow> {
        Self::get(conn, id)?.ok_or_else(|| WorkflowConfigError::NotFound(format!("id {}", id)))
    }

    pub fn get_active(conn: &Connection) -> WorkflowConfigResult<Option<WorkflowConfigRow>> {
        let row = conn
            .query_row(
                "SELECT * FROM workflow_configs WHERE is_active = 1 ORDER BY version DESC LIMIT 1",
                [],
                row_from_sql,
            )
            .optional()?;
        Ok(row)
    }

    /// All rows, newest version first.
    pub fn list(conn: &Connection) -> WorkflowConfigResult<Vec<WorkflowConfigRow>> {
        let mut stmt = conn.prepare("SELECT * FROM workflow_configs ORDER BY version DESC")?;
        let rows = stmt
            .query_map([], row_from_sql)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Make `id` the only active row.
    pub fn activate(conn: &Connection, id: i64) -> WorkflowConfigResult<()> {
        let tx = conn.unchecked_transaction()?;
        Self::set_active(&tx, id)?;
        tx.commit()?;
        tracing::info!(id, "Workflow config activated");
        Ok(())
    }

    fn set_active(conn: &Connection, id: i64) -> WorkflowConfigResult<()> {
        conn.execute(
            "UPDATE workflow_configs SET is_active = 0 WHERE is_active = 1 AND id != ?1",
            params![id],
        )?;
        let changed = conn.execute(
            "UPDATE workflow_configs SET is_active = 1, updated_at = ?2 WHERE id = ?1",
            params![id, time_utils::to_sqlite(&time_utils::now())],
        )?;
        if changed == 0 {
            return Err(WorkflowConfigError::NotFound(format!("id {}", id)));
        }
        Ok(())
    }

    pub fn delete(conn: &Connection, id: i64) -> WorkflowConfigResult<()> {
        let changed = conn.execute("DELETE FROM workflow_configs WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(WorkflowConfigError::NotFound(format!("id {}", id)));
        }
        tracing::debug!(id, "Workflow config deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_workflow_config;
    use crate::error::ValidationError;
    use crate::test_helpers::{agent_value, full_v1_preset, setup_presets_db, valid_v2_value};

    fn valid_config() -> WorkflowConfig {
        WorkflowConfig::validate_value(&valid_v2_value()).unwrap()
    }

    #[test]
    fn test_insert_and_get() {
        let conn = setup_presets_db();
        let id = ConfigStore::insert(&conn, &valid_config(), false).unwrap();
        let row = ConfigStore::get(&conn, id).unwrap().unwrap();
        assert_eq!(row.id, id);
        assert_eq!(row.version, 1);
        assert!(!row.is_active);
        assert_eq!(row.min_hunt_score, 97.0);
        assert_eq!(row.qa_max_retries, 5);
        assert_eq!(row.description.as_deref(), Some("Baseline preset"));
        assert_eq!(time_utils::format_created_at(&row.created_at), "2025-01-15T10:00:00Z");
        assert_eq!(row.agent_models["CmdLineQA"], json!("gpt-4o-mini"));
        assert_eq!(row.extract_agent_settings, json!({ "disabled_agents": [] }));
    }

    #[test]
    fn test_get_nonexistent() {
        let conn = setup_presets_db();
        assert!(ConfigStore::get(&conn, 42).unwrap().is_none());
        assert!(matches!(
            ConfigStore::require(&conn, 42),
            Err(WorkflowConfigError::NotFound(_))
        ));
    }

    #[test]
    fn test_versions_increment() {
        let conn = setup_presets_db();
        let config = valid_config();
        ConfigStore::insert(&conn, &config, false).unwrap();
        ConfigStore::insert(&conn, &config, false).unwrap();
        ConfigStore::insert(&conn, &config, false).unwrap();
        let versions: Vec<i64> = ConfigStore::list(&conn)
            .unwrap()
            .iter()
            .map(|r| r.version)
            .collect();
        assert_eq!(versions, vec![3, 2, 1]);
    }

    #[test]
    fn test_single_active_row() {
        let conn = setup_presets_db();
        let config = valid_config();
        assert!(ConfigStore::get_active(&conn).unwrap().is_none());

        let first = ConfigStore::insert(&conn, &config, true).unwrap();
        let second = ConfigStore::insert(&conn, &config, true).unwrap();
        assert_eq!(ConfigStore::get_active(&conn).unwrap().unwrap().id, second);

        ConfigStore::activate(&conn, first).unwrap();
        let active: Vec<i64> = ConfigStore::list(&conn)
            .unwrap()
            .into_iter()
            .filter(|r| r.is_active)
            .map(|r| r.id)
            .collect();
        assert_eq!(active, vec![first]);
    }

    #[test]
    fn test_activate_missing_keeps_current() {
        let conn = setup_presets_db();
        let id = ConfigStore::insert(&conn, &valid_config(), true).unwrap();
        assert!(matches!(
            ConfigStore::activate(&conn, 999),
            Err(WorkflowConfigError::NotFound(_))
        ));
        assert_eq!(ConfigStore::get_active(&conn).unwrap().unwrap().id, id);
    }

    #[test]
    fn test_delete() {
        let conn = setup_presets_db();
        let id = ConfigStore::insert(&conn, &valid_config(), false).unwrap();
        ConfigStore::delete(&conn, id).unwrap();
        assert!(ConfigStore::get(&conn, id).unwrap().is_none());
        assert!(matches!(
            ConfigStore::delete(&conn, id),
            Err(WorkflowConfigError::NotFound(_))
        ));
    }

    #[test]
    fn test_stored_row_loads_back() {
        let conn = setup_presets_db();
        let config = valid_config();
        let id = ConfigStore::insert(&conn, &config, false).unwrap();
        let row = ConfigStore::require(&conn, id).unwrap();
        assert_eq!(load_workflow_config(&row).unwrap(), config);
    }

    #[test]
    fn test_stored_v1_preset_loads_back() {
        let conn = setup_presets_db();
        let config = load_workflow_config(&full_v1_preset()).unwrap();
        let id = ConfigStore::insert(&conn, &config, true).unwrap();
        let row = ConfigStore::require(&conn, id).unwrap();
        assert!(!row.cmdline_attention_preprocessor_enabled);
        assert!(row.sigma_fallback_enabled);
        assert_eq!(load_workflow_config(&row).unwrap(), config);
    }

    #[test]
    fn test_disabled_sub_agent_is_not_preserved() {
        // The column layout has no per-agent flag for sub-agents.
        let mut value = valid_v2_value();
        value["Agents"]["SigmaAgent"]["Enabled"] = json!(false);
        let config = WorkflowConfig::validate_value(&value).unwrap();

        let conn = setup_presets_db();
        let id = ConfigStore::insert(&conn, &config, false).unwrap();
        let row = ConfigStore::require(&conn, id).unwrap();
        let reloaded = load_workflow_config(&row).unwrap();
        assert!(reloaded.agent(AgentName::SigmaAgent).unwrap().enabled);
    }

    #[test]
    fn test_half_filled_disabled_agent_loads_back() {
        let mut value = valid_v2_value();
        value["Agents"]["SigmaAgent"] = agent_value("openai", "", false);
        let config = WorkflowConfig::validate_value(&value).unwrap();

        let conn = setup_presets_db();
        let id = ConfigStore::insert(&conn, &config, false).unwrap();
        let row = ConfigStore::require(&conn, id).unwrap();
        assert_eq!(row.agent_models["SigmaAgent_provider"], json!(""));
        assert_eq!(row.agent_models["SigmaAgent"], json!(""));

        let reloaded = load_workflow_config(&row).unwrap();
        assert!(!reloaded.agent(AgentName::SigmaAgent).unwrap().enabled);
        assert!(row.to_legacy_response().is_ok());
    }

    #[test]
    fn test_insert_rolls_back_row_that_cannot_load() {
        // Non-canonical agents have no column, so their QA toggle dangles.
        let mut value = valid_v2_value();
        value["Agents"]["Foo"] = agent_value("", "", false);
        value["QA"]["Enabled"]["Foo"] = json!(true);
        let config = WorkflowConfig::validate_value(&value).unwrap();

        let conn = setup_presets_db();
        let err = ConfigStore::insert(&conn, &config, true).unwrap_err();
        assert!(matches!(
            err,
            WorkflowConfigError::Validation(ValidationError::OrphanQaToggle(ref k)) if k == "Foo"
        ));
        assert!(ConfigStore::list(&conn).unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_json_column_is_an_error() {
        let conn = setup_presets_db();
        let id = ConfigStore::insert(&conn, &valid_config(), false).unwrap();

        for column in ["agent_models", "qa_enabled"] {
            conn.execute(
                &format!("UPDATE workflow_configs SET {} = 'not json' WHERE id = ?1", column),
                params![id],
            )
            .unwrap();
            let err = ConfigStore::get(&conn, id).unwrap_err();
            assert!(matches!(err, WorkflowConfigError::Database(_)));
            assert!(err.to_string().contains(column), "{}", err);
            assert!(ConfigStore::list(&conn).is_err());

            conn.execute(
                &format!("UPDATE workflow_configs SET {} = '{{}}' WHERE id = ?1", column),
                params![id],
            )
            .unwrap();
        }
    }

    #[test]
    fn test_corrupt_timestamp_is_an_error() {
        let conn = setup_presets_db();
        let id = ConfigStore::insert(&conn, &valid_config(), false).unwrap();
        conn.execute(
            "UPDATE workflow_configs SET created_at = 'yesterday' WHERE id = ?1",
            params![id],
        )
        .unwrap();
        let err = ConfigStore::require(&conn, id).unwrap_err();
        assert!(err.to_string().contains("created_at"), "{}", err);
    }

    #[test]
    fn test_rank_and_fallback_flags_persist() {
        let mut value = valid_v2_value();
        value["Agents"]["RankAgent"]["Enabled"] = json!(false);
        value["Agents"]["OSDetectionFallback"]["Enabled"] = json!(false);
        let config = WorkflowConfig::validate_value(&value).unwrap();

        let conn = setup_presets_db();
        let id = ConfigStore::insert(&conn, &config, false).unwrap();
        let row = ConfigStore::require(&conn, id).unwrap();
        assert!(!row.rank_agent_enabled);
        assert!(!row.osdetection_fallback_enabled);

        let reloaded = load_workflow_config(&row).unwrap();
        assert!(!reloaded.agent(AgentName::RankAgent).unwrap().enabled);
        assert!(!reloaded.agent(AgentName::OSDetectionFallback).unwrap().enabled);
    }
}
