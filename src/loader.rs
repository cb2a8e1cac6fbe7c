//! Entry points gluing migration + validation to the outside world.
//!
//! Every path runs `migrate_v1_to_v2` followed by strict validation; there is
//! no partial acceptance. Errors are always `ValidationError`.

use std::borrow::Cow;

use serde_json::{json, Map, Value};

use crate::config_row::{ConfigRow, WorkflowConfigRow};
use crate::constants::DEFAULT_EXPORT_DESCRIPTION;
use crate::error::ValidationError;
use crate::migrate::migrate_v1_to_v2;
use crate::schema::WorkflowConfig;
use crate::time_utils;

/// Where a config comes from: a JSON body/file, or a stored row.
#[derive(Clone, Copy)]
pub enum ConfigSource<'a> {
    Value(&'a Value),
    Row(&'a dyn ConfigRow),
}

impl<'a> From<&'a Value> for ConfigSource<'a> {
    fn from(v: &'a Value) -> Self {
        Self::Value(v)
    }
}

impl<'a> From<&'a WorkflowConfigRow> for ConfigSource<'a> {
    fn from(row: &'a WorkflowConfigRow) -> Self {
        Self::Row(row)
    }
}

/// Flatten a row into the v1 object shape, keeping every column that is set.
pub fn normalize_raw_from_db(row: &dyn ConfigRow) -> Value {
    let mut raw = Map::new();

    let mut put = |key: &str, value: Option<Value>| {
        if let Some(v) = value {
            raw.insert(key.to_string(), v);
        }
    };

    put("min_hunt_score", row.min_hunt_score().map(|v| json!(v)));
    put("ranking_threshold", row.ranking_threshold().map(|v| json!(v)));
    put("similarity_threshold", row.similarity_threshold().map(|v| json!(v)));
    put("junk_filter_threshold", row.junk_filter_threshold().map(|v| json!(v)));
    put(
        "auto_trigger_hunt_score_threshold",
        row.auto_trigger_hunt_score_threshold().map(|v| json!(v)),
    );
    put("agent_models", row.agent_models());
    put("agent_prompts", row.agent_prompts());
    put("qa_enabled", row.qa_enabled());
    put("qa_max_retries", row.qa_max_retries().map(|v| json!(v)));
    put("sigma_fallback_enabled", row.sigma_fallback_enabled().map(|v| json!(v)));
    put(
        "osdetection_fallback_enabled",
        row.osdetection_fallback_enabled().map(|v| json!(v)),
    );
    put("rank_agent_enabled", row.rank_agent_enabled().map(|v| json!(v)));
    put(
        "cmdline_attention_preprocessor_enabled",
        row.cmdline_attention_preprocessor_enabled().map(|v| json!(v)),
    );
    put("extract_agent_settings", row.extract_agent_settings());
    put("description", row.description().map(|v| json!(v)));
    put(
        "created_at",
        row.created_at().map(|dt| json!(time_utils::format_created_at(&dt))),
    );

    Value::Object(raw)
}

/// Load any config (v1, v2, or stored row) into a validated `WorkflowConfig`.
pub fn load_workflow_config<'a>(
    source: impl Into<ConfigSource<'a>>,
) -> Result<WorkflowConfig, ValidationError> {
    let raw: Cow<'_, Value> = match source.into() {
        ConfigSource::Value(v) => Cow::Borrowed(v),
        ConfigSource::Row(row) => Cow::Owned(normalize_raw_from_db(row)),
    };
    let migrated = migrate_v1_to_v2(&raw);
    WorkflowConfig::validate_value(&migrated)
}

/// Row → canonical v2 JSON (for API responses needing an untyped structure).
pub fn config_row_to_v2_dict(row: &dyn ConfigRow) -> Result<Value, ValidationError> {
    load_workflow_config(ConfigSource::Row(row))?.to_value()
}

/// Row → flat `agent_models` for the legacy LLM invocation layer.
pub fn config_row_to_flat_agent_models(
    row: &dyn ConfigRow,
) -> Result<Map<String, Value>, ValidationError> {
    Ok(load_workflow_config(ConfigSource::Row(row))?.flatten_for_llm_service())
}

/// Produce a canonical v2 preset file body.
///
/// Fills `Metadata.CreatedAt` / `Metadata.Description` when empty, then
/// re-validates the serialized value, so a successful export is guaranteed to
/// import again.
pub fn export_preset_as_canonical_v2<'a>(
    source: impl Into<ConfigSource<'a>>,
) -> Result<Value, ValidationError> {
    let mut config = load_workflow_config(source)?;

    if config.metadata.created_at.trim().is_empty() {
        config.metadata.created_at = time_utils::format_created_at(&time_utils::now());
    }
    if config.metadata.description.trim().is_empty() {
        config.metadata.description = DEFAULT_EXPORT_DESCRIPTION.to_string();
    }

    let exported = config.to_value()?;
    WorkflowConfig::validate_value(&exported)?;

    tracing::debug!(
        agents = config.agents.len(),
        created_at = %config.metadata.created_at,
        "Exported canonical v2 preset"
    );
    Ok(exported)
}
