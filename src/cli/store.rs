use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;
use serde_json::Value;

use workflow_config::storage::config_store::ConfigStore;
use workflow_config::{export_preset_as_canonical_v2, load_workflow_config};

use super::{emit_json, read_json};

/// `store import <file>`: returns the new row id.
pub fn import(conn: &Connection, path: &Path, activate: bool) -> Result<i64> {
    let raw = read_json(path)?;
    let config = load_workflow_config(&raw)
        .with_context(|| format!("{} failed validation", path.display()))?;
    let id = ConfigStore::insert(conn, &config, activate).context("Failed to store preset")?;
    tracing::info!(id, file = %path.display(), activate, "Preset imported");
    Ok(id)
}

/// `store show <id>`: legacy response shape.
pub fn show(conn: &Connection, id: i64) -> Result<Value> {
    let row = ConfigStore::require(conn, id)?;
    let response = row
        .to_legacy_response()
        .with_context(|| format!("Stored preset {} is invalid", id))?;
    Ok(Value::Object(response))
}

/// `store export <id>`
pub fn export(conn: &Connection, id: i64) -> Result<Value> {
    let row = ConfigStore::require(conn, id)?;
    export_preset_as_canonical_v2(&row).with_context(|| format!("Cannot export preset {}", id))
}

pub fn run_import(conn: &Connection, path: &Path, activate: bool) -> Result<()> {
    let id = import(conn, path, activate)?;
    println!("Imported preset {}{}", id, if activate { " (active)" } else { "" });
    Ok(())
}

pub fn run_list(conn: &Connection) -> Result<()> {
    let rows = ConfigStore::list(conn).context("Failed to list presets")?;

    if rows.is_empty() {
        println!("No presets stored.");
        return Ok(());
    }

    println!(
        "{:>5}  {:>7}  {:<6}  {:<20}  {}",
        "ID", "VERSION", "ACTIVE", "CREATED", "DESCRIPTION"
    );
    println!("{}", "-".repeat(70));

    for row in &rows {
        println!(
            "{:>5}  {:>7}  {:<6}  {:<20}  {}",
            row.id,
            row.version,
            if row.is_active { "yes" } else { "" },
            workflow_config::time_utils::format_created_at(&row.created_at),
            row.description.as_deref().unwrap_or("-"),
        );
    }

    println!("\n{} preset(s)", rows.len());
    Ok(())
}

pub fn run_show(conn: &Connection, id: i64) -> Result<()> {
    emit_json(&show(conn, id)?, None)
}

pub fn run_activate(conn: &Connection, id: i64) -> Result<()> {
    ConfigStore::activate(conn, id)?;
    println!("Preset {} is now active", id);
    Ok(())
}

pub fn run_export(conn: &Connection, id: i64, out: Option<&Path>) -> Result<()> {
    emit_json(&export(conn, id)?, out)
}

pub fn run_delete(conn: &Connection, id: i64) -> Result<()> {
    ConfigStore::delete(conn, id)?;
    println!("Deleted preset {}", id);
    Ok(())
}
