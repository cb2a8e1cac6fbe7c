//! Canonical (v2) workflow configuration: strict schema + cross-field checks.
//!
//! Validation is two-phase:
//!   1. serde deserialization into strict structs (types, required fields,
//!      `deny_unknown_fields` everywhere, `Version == "2.0"`)
//!   2. `WorkflowConfig::validate`: referential invariants between sections

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Map, Value};

use crate::agent::{implied_base_name, AgentName};
use crate::constants::*;
use crate::error::ValidationError;

// ============================================================================
// VERSION
// ============================================================================

/// The literal `"2.0"`. Any other value fails deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SchemaVersion;

impl SchemaVersion {
    pub fn as_str(&self) -> &'static str {
        CANONICAL_VERSION
    }
}

impl Serialize for SchemaVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(CANONICAL_VERSION)
    }
}

impl<'de> Deserialize<'de> for SchemaVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        if s == CANONICAL_VERSION {
            Ok(SchemaVersion)
        } else {
            Err(serde::de::Error::custom(format!(
                "unsupported Version '{}', expected \"{}\"",
                s, CANONICAL_VERSION
            )))
        }
    }
}

// ============================================================================
// SECTIONS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct Metadata {
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub description: String,
}

/// Global numeric knobs for ranking and hunt triggering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields, default)]
pub struct Thresholds {
    pub min_hunt_score: f64,
    pub ranking_threshold: f64,
    pub similarity_threshold: f64,
    pub junk_filter_threshold: f64,
    pub auto_trigger_hunt_score_threshold: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_hunt_score: DEFAULT_MIN_HUNT_SCORE,
            ranking_threshold: DEFAULT_RANKING_THRESHOLD,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            junk_filter_threshold: DEFAULT_JUNK_FILTER_THRESHOLD,
            auto_trigger_hunt_score_threshold: DEFAULT_AUTO_TRIGGER_HUNT_SCORE_THRESHOLD,
        }
    }
}

/// One LLM invocation role. `Provider`/`Model` may be empty only while disabled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct AgentConfig {
    pub provider: String,
    pub model: String,
    pub temperature: f64,
    pub top_p: f64,
    pub enabled: bool,
}

impl AgentConfig {
    /// Both provider and model are non-empty. Whitespace counts as a value.
    pub fn is_configured(&self) -> bool {
        !self.provider.is_empty() && !self.model.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields, default)]
pub struct Embeddings {
    pub os_detection: String,
    pub sigma: String,
}

impl Default for Embeddings {
    fn default() -> Self {
        Self {
            os_detection: DEFAULT_OS_DETECTION_EMBEDDING.to_string(),
            sigma: DEFAULT_SIGMA_EMBEDDING.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields, default)]
pub struct QaConfig {
    pub enabled: BTreeMap<String, bool>,
    pub max_retries: u32,
}

impl Default for QaConfig {
    fn default() -> Self {
        Self {
            enabled: BTreeMap::new(),
            max_retries: DEFAULT_QA_MAX_RETRIES,
        }
    }
}

/// Workflow-wide toggles. Agent enablement lives on `AgentConfig`, not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields, default)]
pub struct Features {
    pub sigma_fallback_enabled: bool,
    pub cmdline_attention_preprocessor_enabled: bool,
}

impl Features {
    /// Keys accepted under `Features`; anything else is stripped on normalization.
    pub const KEYS: [&'static str; 2] = [
        "SigmaFallbackEnabled",
        "CmdlineAttentionPreprocessorEnabled",
    ];
}

impl Default for Features {
    fn default() -> Self {
        Self {
            sigma_fallback_enabled: DEFAULT_SIGMA_FALLBACK_ENABLED,
            cmdline_attention_preprocessor_enabled: DEFAULT_CMDLINE_ATTENTION_PREPROCESSOR_ENABLED,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct PromptBlock {
    pub prompt: String,
    pub instructions: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields, default)]
pub struct ExtractAgentSettings {
    pub disabled_agents: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields, default)]
pub struct Execution {
    pub extract_agent_settings: ExtractAgentSettings,
    pub os_detection_selected_os: Vec<String>,
}

impl Default for Execution {
    fn default() -> Self {
        Self {
            extract_agent_settings: ExtractAgentSettings::default(),
            os_detection_selected_os: vec![DEFAULT_SELECTED_OS.to_string()],
        }
    }
}

// ============================================================================
// ROOT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct WorkflowConfig {
    pub version: SchemaVersion,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub thresholds: Thresholds,
    pub agents: BTreeMap<String, AgentConfig>,
    #[serde(default)]
    pub embeddings: Embeddings,
    #[serde(rename = "QA", default)]
    pub qa: QaConfig,
    #[serde(default)]
    pub features: Features,
    #[serde(default)]
    pub prompts: BTreeMap<String, PromptBlock>,
    #[serde(default)]
    pub execution: Execution,
}

impl WorkflowConfig {
    /// Root keys of the canonical file format, in document order.
    pub const ROOT_KEYS: [&'static str; 9] = [
        "Version",
        "Metadata",
        "Thresholds",
        "Agents",
        "Embeddings",
        "QA",
        "Features",
        "Prompts",
        "Execution",
    ];

    /// Deserialize strictly, then run the cross-field checks.
    pub fn validate_value(value: &Value) -> Result<Self, ValidationError> {
        let config = WorkflowConfig::deserialize(value)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize back to the canonical JSON shape.
    pub fn to_value(&self) -> Result<Value, ValidationError> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn agent(&self, name: AgentName) -> Option<&AgentConfig> {
        self.agents.get(name.as_str())
    }

    /// Cross-field invariants. Stops at the first violation.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.validate_qa_toggles()?;
        self.validate_prompt_keys()?;
        self.validate_enabled_agents()?;
        self.validate_qa_pairs()?;
        self.validate_prompt_coverage()?;
        Ok(())
    }

    fn validate_qa_toggles(&self) -> Result<(), ValidationError> {
        match self.qa.enabled.keys().find(|k| !self.agents.contains_key(*k)) {
            Some(orphan) => Err(ValidationError::OrphanQaToggle(orphan.clone())),
            None => Ok(()),
        }
    }

    fn validate_prompt_keys(&self) -> Result<(), ValidationError> {
        match self.prompts.keys().find(|k| !AgentName::is_canonical(k)) {
            Some(stray) => Err(ValidationError::UnknownPromptKey(stray.clone())),
            None => Ok(()),
        }
    }

    fn validate_enabled_agents(&self) -> Result<(), ValidationError> {
        for (name, agent) in &self.agents {
            if agent.enabled && !agent.is_configured() {
                return Err(ValidationError::EnabledWithoutModel(name.clone()));
            }
        }
        Ok(())
    }

    fn validate_qa_pairs(&self) -> Result<(), ValidationError> {
        // Configured base agents need their grader.
        for base in AgentName::ALL {
            let Some(qa) = base.qa_agent() else { continue };
            let Some(agent) = self.agent(base) else { continue };
            if agent.enabled && agent.is_configured() && self.agent(qa).is_none() {
                return Err(ValidationError::MissingQaAgent {
                    base: base.to_string(),
                    qa: qa.to_string(),
                });
            }
        }

        // And no grader without something to grade.
        for name in self.agents.keys() {
            let is_qa = name
                .parse::<AgentName>()
                .map(|a| a.is_qa())
                .unwrap_or_else(|_| name.ends_with("QA"));
            if !is_qa {
                continue;
            }
            if let Some(base) = implied_base_name(name) {
                if !self.agents.contains_key(&base) {
                    return Err(ValidationError::OrphanQaAgent {
                        qa: name.clone(),
                        base,
                    });
                }
            }
        }
        Ok(())
    }

    fn validate_prompt_coverage(&self) -> Result<(), ValidationError> {
        for (name, agent) in &self.agents {
            if !agent.is_configured() || self.prompts.contains_key(name) {
                continue;
            }
            if name == AgentName::OSDetectionFallback.as_str() && !agent.enabled {
                continue;
            }
            return Err(ValidationError::MissingPrompt(name.clone()));
        }
        Ok(())
    }

    // ========================================================================
    // LEGACY PROJECTIONS
    // ========================================================================

    /// Flat `agent_models` map for the LLM invocation layer.
    ///
    /// Only canonical agents are emitted; the key layout is fixed by
    /// `AgentName::flat_prefix` / `AgentName::model_key`. Temperature and
    /// top_p always come out as floats, so a legacy integer `0` reads back
    /// as `0.0`.
    pub fn flatten_for_llm_service(&self) -> Map<String, Value> {
        let mut flat = Map::new();

        for name in AgentName::ALL {
            let Some(agent) = self.agent(name) else { continue };
            flat.insert(name.model_key().to_string(), json!(agent.model));
            flat.insert(name.provider_key(), json!(agent.provider));
            flat.insert(name.temperature_key(), json!(agent.temperature));
            flat.insert(name.top_p_key(), json!(agent.top_p));
        }

        flat.insert(LEGACY_OS_EMBEDDING_KEY.to_string(), json!(self.embeddings.os_detection));
        flat.insert(LEGACY_SIGMA_EMBEDDING_KEY.to_string(), json!(self.embeddings.sigma));

        if !self.execution.os_detection_selected_os.is_empty() {
            flat.insert(
                LEGACY_SELECTED_OS_KEY.to_string(),
                json!(self.execution.os_detection_selected_os),
            );
        }

        flat
    }

    /// Flat response shape of the pre-v2 HTTP API.
    pub fn to_legacy_response_dict(
        &self,
        id: i64,
        version: i64,
        is_active: bool,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Map<String, Value> {
        let rank_agent_enabled = self.agent(AgentName::RankAgent).map_or(true, |a| a.enabled);
        let osdetection_fallback_enabled = self
            .agent(AgentName::OSDetectionFallback)
            .map_or(false, |a| a.enabled);

        let mut out = Map::new();
        out.insert("id".into(), json!(id));
        out.insert("version".into(), json!(version));
        out.insert("min_hunt_score".into(), json!(self.thresholds.min_hunt_score));
        out.insert("ranking_threshold".into(), json!(self.thresholds.ranking_threshold));
        out.insert("similarity_threshold".into(), json!(self.thresholds.similarity_threshold));
        out.insert("junk_filter_threshold".into(), json!(self.thresholds.junk_filter_threshold));
        out.insert(
            "auto_trigger_hunt_score_threshold".into(),
            json!(self.thresholds.auto_trigger_hunt_score_threshold),
        );
        out.insert("description".into(), json!(self.metadata.description));
        out.insert("is_active".into(), json!(is_active));
        out.insert("agent_models".into(), Value::Object(self.flatten_for_llm_service()));
        out.insert("agent_prompts".into(), json!(self.prompts));
        out.insert("qa_enabled".into(), json!(self.qa.enabled));
        out.insert("qa_max_retries".into(), json!(self.qa.max_retries));
        out.insert("sigma_fallback_enabled".into(), json!(self.features.sigma_fallback_enabled));
        out.insert("osdetection_fallback_enabled".into(), json!(osdetection_fallback_enabled));
        out.insert("rank_agent_enabled".into(), json!(rank_agent_enabled));
        out.insert(
            "cmdline_attention_preprocessor_enabled".into(),
            json!(self.features.cmdline_attention_preprocessor_enabled),
        );
        out.insert(
            "extract_agent_settings".into(),
            json!({ "disabled_agents": self.execution.extract_agent_settings.disabled_agents }),
        );
        out.insert("created_at".into(), json!(created_at.to_rfc3339()));
        out.insert("updated_at".into(), json!(updated_at.to_rfc3339()));
        out
    }
}
