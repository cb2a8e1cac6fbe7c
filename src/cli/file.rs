use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

use workflow_config::{export_preset_as_canonical_v2, load_workflow_config, migrate_v1_to_v2};

use super::{emit_json, read_json};

/// `migrate <file>`: migrated v2 value, not yet validated.
pub fn migrate(path: &Path) -> Result<Value> {
    Ok(migrate_v1_to_v2(&read_json(path)?))
}

/// `validate <file>`
pub fn validate(path: &Path) -> Result<()> {
    let raw = read_json(path)?;
    let config = load_workflow_config(&raw)
        .with_context(|| format!("{} failed validation", path.display()))?;
    tracing::debug!(agents = config.agents.len(), "Preset validated");
    Ok(())
}

/// `export <file>`: canonical v2 body, guaranteed to re-import.
pub fn export(path: &Path) -> Result<Value> {
    let raw = read_json(path)?;
    export_preset_as_canonical_v2(&raw)
        .with_context(|| format!("Cannot export {}", path.display()))
}

/// `flatten <file>`: legacy `agent_models` map for the LLM layer.
pub fn flatten(path: &Path) -> Result<Value> {
    let raw = read_json(path)?;
    let config = load_workflow_config(&raw)
        .with_context(|| format!("{} failed validation", path.display()))?;
    Ok(Value::Object(config.flatten_for_llm_service()))
}

pub fn run_migrate(path: &Path) -> Result<()> {
    emit_json(&migrate(path)?, None)
}

pub fn run_validate(path: &Path) -> Result<()> {
    validate(path)?;
    println!("OK");
    Ok(())
}

pub fn run_export(path: &Path, out: Option<&Path>) -> Result<()> {
    emit_json(&export(path)?, out)
}

pub fn run_flatten(path: &Path) -> Result<()> {
    emit_json(&flatten(path)?, None)
}
