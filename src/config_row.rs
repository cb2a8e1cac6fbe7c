use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::loader::load_workflow_config;

/// A stored workflow-config row in the legacy column layout (no I/O).
///
/// Every accessor is optional: a row type that lacks a column simply leaves
/// the default `None`, and migration fills in the documented default.
pub trait ConfigRow {
    fn min_hunt_score(&self) -> Option<f64> { None }
    fn ranking_threshold(&self) -> Option<f64> { None }
    fn similarity_threshold(&self) -> Option<f64> { None }
    fn junk_filter_threshold(&self) -> Option<f64> { None }
    fn auto_trigger_hunt_score_threshold(&self) -> Option<f64> { None }
    /// Flat `agent_models` object (legacy key layout).
    fn agent_models(&self) -> Option<Value> { None }
    fn agent_prompts(&self) -> Option<Value> { None }
    fn qa_enabled(&self) -> Option<Value> { None }
    fn qa_max_retries(&self) -> Option<u32> { None }
    fn sigma_fallback_enabled(&self) -> Option<bool> { None }
    fn osdetection_fallback_enabled(&self) -> Option<bool> { None }
    fn rank_agent_enabled(&self) -> Option<bool> { None }
    fn cmdline_attention_preprocessor_enabled(&self) -> Option<bool> { None }
    /// `{"disabled_agents": [...]}`
    fn extract_agent_settings(&self) -> Option<Value> { None }
    fn description(&self) -> Option<String> { None }
    fn created_at(&self) -> Option<DateTime<Utc>> { None }
}

/// Row as persisted by `storage::config_store::ConfigStore`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowConfigRow {
    pub id: i64,
    pub version: i64,
    pub is_active: bool,
    pub min_hunt_score: f64,
    pub ranking_threshold: f64,
    pub similarity_threshold: f64,
    pub junk_filter_threshold: f64,
    pub auto_trigger_hunt_score_threshold: f64,
    pub agent_models: Value,
    pub agent_prompts: Value,
    pub qa_enabled: Value,
    pub qa_max_retries: u32,
    pub sigma_fallback_enabled: bool,
    pub osdetection_fallback_enabled: bool,
    pub rank_agent_enabled: bool,
    pub cmdline_attention_preprocessor_enabled: bool,
    pub extract_agent_settings: Value,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConfigRow for WorkflowConfigRow {
    fn min_hunt_score(&self) -> Option<f64> { Some(self.min_hunt_score) }
    fn ranking_threshold(&self) -> Option<f64> { Some(self.ranking_threshold) }
    fn similarity_threshold(&self) -> Option<f64> { Some(self.similarity_threshold) }
    fn junk_filter_threshold(&self) -> Option<f64> { Some(self.junk_filter_threshold) }
    fn auto_trigger_hunt_score_threshold(&self) -> Option<f64> {
        Some(self.auto_trigger_hunt_score_threshold)
    }
    fn agent_models(&self) -> Option<Value> { Some(self.agent_models.clone()) }
    fn agent_prompts(&self) -> Option<Value> { Some(self.agent_prompts.clone()) }
    fn qa_enabled(&self) -> Option<Value> { Some(self.qa_enabled.clone()) }
    fn qa_max_retries(&self) -> Option<u32> { Some(self.qa_max_retries) }
    fn sigma_fallback_enabled(&self) -> Option<bool> { Some(self.sigma_fallback_enabled) }
    fn osdetection_fallback_enabled(&self) -> Option<bool> {
        Some(self.osdetection_fallback_enabled)
    }
    fn rank_agent_enabled(&self) -> Option<bool> { Some(self.rank_agent_enabled) }
    fn cmdline_attention_preprocessor_enabled(&self) -> Option<bool> {
        Some(self.cmdline_attention_preprocessor_enabled)
    }
    fn extract_agent_settings(&self) -> Option<Value> {
        Some(self.extract_agent_settings.clone())
    }
    fn description(&self) -> Option<String> { self.description.clone() }
    fn created_at(&self) -> Option<DateTime<Utc>> { Some(self.created_at) }
}

impl WorkflowConfigRow {
    /// Flat response shape of the pre-v2 HTTP API, computed from the
    /// validated config rather than the raw columns.
    pub fn to_legacy_response(&self) -> Result<Map<String, Value>, ValidationError> {
        let config = load_workflow_config(self)?;
        Ok(config.to_legacy_response_dict(
            self.id,
            self.version,
            self.is_active,
            self.created_at,
            self.updated_at,
        ))
    }
}
