//! Workflow config: schema, legacy migration and validation for agentic
//! workflow presets.
//!
//! Every preset (v1 flat file, v2 file, or stored row) goes through
//! `migrate_v1_to_v2` and strict validation before anyone reads it.

// Foundation
pub mod constants;
pub mod error;
pub mod time_utils;

// Core types
pub mod agent;
pub mod config_row;
pub mod schema;

// Migration and entry points
pub mod loader;
pub mod migrate;

// Sub-systems
pub mod storage;
pub mod tracing_init;

#[cfg(test)]
pub(crate) mod test_helpers;

// Re-exports for convenience
pub use agent::AgentName;
pub use config_row::{ConfigRow, WorkflowConfigRow};
pub use error::{ValidationError, WorkflowConfigError, WorkflowConfigResult};
pub use loader::{
    config_row_to_flat_agent_models, config_row_to_v2_dict, export_preset_as_canonical_v2,
    load_workflow_config, normalize_raw_from_db, ConfigSource,
};
pub use migrate::migrate_v1_to_v2;
pub use schema::WorkflowConfig;
