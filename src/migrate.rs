//! v1 (flat) → v2 (nested) migration, and re-normalization of v2 input.
//!
//! Pure and infallible: missing or malformed legacy data degrades to the
//! documented defaults, and anything still inconsistent is left for
//! `WorkflowConfig::validate_value` to reject.

use std::collections::BTreeSet;

use serde_json::{json, Map, Value};

use crate::agent::AgentName;
use crate::constants::*;
use crate::schema::{Embeddings, Execution, Features, Metadata, QaConfig, Thresholds, WorkflowConfig};

/// Threshold fields: (canonical key, legacy snake_case key, default).
const THRESHOLD_FIELDS: [(&str, &str, f64); 5] = [
    ("MinHuntScore", "min_hunt_score", DEFAULT_MIN_HUNT_SCORE),
    ("RankingThreshold", "ranking_threshold", DEFAULT_RANKING_THRESHOLD),
    ("SimilarityThreshold", "similarity_threshold", DEFAULT_SIMILARITY_THRESHOLD),
    ("JunkFilterThreshold", "junk_filter_threshold", DEFAULT_JUNK_FILTER_THRESHOLD),
    (
        "AutoTriggerHuntScoreThreshold",
        "auto_trigger_hunt_score_threshold",
        DEFAULT_AUTO_TRIGGER_HUNT_SCORE_THRESHOLD,
    ),
];

/// Legacy `Features` flags that really describe agent enablement.
const FEATURE_AGENT_FLAGS: [(&str, AgentName); 2] = [
    ("RankAgentEnabled", AgentName::RankAgent),
    ("OsDetectionFallbackEnabled", AgentName::OSDetectionFallback),
];

/// Migrate any config object into the v2 shape expected by the schema.
///
/// Objects tagged `Version`/`version` `"2.0"` go through strict
/// normalization; everything else is treated as legacy v1. A non-object
/// input is treated as an empty v1 object.
pub fn migrate_v1_to_v2(raw: &Value) -> Value {
    let empty = Map::new();
    let obj = raw.as_object().unwrap_or(&empty);

    if is_v2(obj) {
        normalize_v2_strict(obj)
    } else {
        FlatMigration::new(obj).run()
    }
}

fn is_v2(obj: &Map<String, Value>) -> bool {
    ["Version", "version"]
        .iter()
        .any(|k| obj.get(*k).and_then(|v| v.as_str()) == Some(CANONICAL_VERSION))
}

// ============================================================================
// LENIENT READERS
// ============================================================================

fn lenient_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn lenient_u32(v: &Value) -> Option<u32> {
    match v {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64))
            .and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn lenient_bool(v: &Value) -> Option<bool> {
    match v {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(true),
            "false" | "0" | "no" | "off" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn lenient_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn string_list(v: &Value) -> Option<Vec<String>> {
    match v {
        Value::Array(items) => Some(items.iter().filter_map(lenient_string).collect()),
        Value::String(s) if !s.trim().is_empty() => Some(vec![s.clone()]),
        _ => None,
    }
}

/// `{prompt, instructions}` from either an object or a bare prompt string.
fn prompt_block(v: &Value) -> Value {
    match v {
        Value::Object(o) => json!({
            "prompt": o.get("prompt").and_then(lenient_string).unwrap_or_default(),
            "instructions": o.get("instructions").and_then(lenient_string).unwrap_or_default(),
        }),
        Value::String(s) => json!({ "prompt": s, "instructions": "" }),
        _ => json!({ "prompt": "", "instructions": "" }),
    }
}

fn canonical_qa_key(key: &str) -> &str {
    if key == LEGACY_OS_DETECTION_AGENT {
        AgentName::OSDetectionFallback.as_str()
    } else {
        key
    }
}

// ============================================================================
// v1 → v2
// ============================================================================

struct FlatMigration<'a> {
    raw: &'a Map<String, Value>,
    agent_models: Option<&'a Map<String, Value>>,
    agent_prompts: Option<&'a Map<String, Value>>,
    /// Every legacy key actually read, for the deprecation notice.
    consumed: BTreeSet<String>,
    dropped: BTreeSet<String>,
}

impl<'a> FlatMigration<'a> {
    fn new(raw: &'a Map<String, Value>) -> Self {
        Self {
            raw,
            agent_models: raw.get("agent_models").and_then(|v| v.as_object()),
            agent_prompts: raw.get("agent_prompts").and_then(|v| v.as_object()),
            consumed: BTreeSet::new(),
            dropped: BTreeSet::new(),
        }
    }

    fn top(&mut self, key: &str) -> Option<&'a Value> {
        let raw: &'a Map<String, Value> = self.raw;
        let v = raw.get(key).filter(|v| !v.is_null())?;
        self.consumed.insert(key.to_string());
        Some(v)
    }

    fn model(&mut self, key: &str) -> Option<&'a Value> {
        let models: &'a Map<String, Value> = self.agent_models?;
        let v = models.get(key).filter(|v| !v.is_null())?;
        self.consumed.insert(format!("agent_models.{}", key));
        Some(v)
    }

    fn run(mut self) -> Value {
        if self.raw.contains_key("version") {
            self.consumed.insert("version".into());
        }

        let out = json!({
            "Version": CANONICAL_VERSION,
            "Metadata": self.metadata(),
            "Thresholds": self.thresholds(),
            "Agents": self.agents(),
            "Embeddings": self.embeddings(),
            "QA": self.qa(),
            "Features": self.features(),
            "Prompts": self.prompts(),
            "Execution": self.execution(),
        });

        if !self.consumed.is_empty() {
            tracing::info!(
                count = self.consumed.len(),
                legacy_keys = ?self.consumed,
                dropped = ?self.dropped,
                "Migrated legacy v1 workflow config; re-export as v2 to retire these keys"
            );
        }
        out
    }

    fn metadata(&mut self) -> Value {
        json!({
            "CreatedAt": self.top("created_at").and_then(lenient_string).unwrap_or_default(),
            "Description": self.top("description").and_then(lenient_string).unwrap_or_default(),
        })
    }

    /// Nested `thresholds` object wins over flat top-level keys.
    fn thresholds(&mut self) -> Value {
        let raw: &'a Map<String, Value> = self.raw;
        let nested = raw.get("thresholds").and_then(|v| v.as_object());
        let mut out = Map::new();

        for (canonical, legacy, default) in THRESHOLD_FIELDS {
            let from_nested = nested.and_then(|t| {
                [legacy, canonical]
                    .into_iter()
                    .find_map(|k| t.get(k).and_then(lenient_f64).map(|v| (k, v)))
            });
            let value = match from_nested {
                Some((k, v)) => {
                    self.consumed.insert(format!("thresholds.{}", k));
                    v
                }
                None => self.top(legacy).and_then(lenient_f64).unwrap_or(default),
            };
            out.insert(canonical.to_string(), json!(value));
        }
        Value::Object(out)
    }

    fn agents(&mut self) -> Value {
        let mut out = Map::new();

        for name in AgentName::ALL {
            let provider = self
                .model(&name.provider_key())
                .and_then(lenient_string)
                .unwrap_or_default();
            let model = self
                .model(name.model_key())
                .and_then(lenient_string)
                .unwrap_or_default();
            let temperature = self
                .model(&name.temperature_key())
                .and_then(lenient_f64)
                .unwrap_or(DEFAULT_TEMPERATURE);
            let top_p = self
                .model(&name.top_p_key())
                .and_then(lenient_f64)
                .unwrap_or(DEFAULT_TOP_P);

            // Legacy v1 has no per-agent flag; an agent with nothing set at
            // all is treated as switched off instead of pseudo-enabled.
            let untouched = provider.is_empty() && model.is_empty();
            let enabled = match name {
                AgentName::RankAgent => self
                    .top("rank_agent_enabled")
                    .and_then(lenient_bool)
                    .unwrap_or(!untouched),
                AgentName::OSDetectionFallback => self
                    .top("osdetection_fallback_enabled")
                    .and_then(lenient_bool)
                    .unwrap_or(false),
                _ => !untouched,
            };

            out.insert(
                name.to_string(),
                json!({
                    "Provider": provider,
                    "Model": model,
                    "Temperature": temperature,
                    "TopP": top_p,
                    "Enabled": enabled,
                }),
            );
        }
        Value::Object(out)
    }

    fn embeddings(&mut self) -> Value {
        json!({
            "OsDetection": self
                .model(LEGACY_OS_EMBEDDING_KEY)
                .and_then(lenient_string)
                .unwrap_or_else(|| DEFAULT_OS_DETECTION_EMBEDDING.to_string()),
            "Sigma": self
                .model(LEGACY_SIGMA_EMBEDDING_KEY)
                .and_then(lenient_string)
                .unwrap_or_else(|| DEFAULT_SIGMA_EMBEDDING.to_string()),
        })
    }

    fn qa(&mut self) -> Value {
        let mut enabled = Map::new();
        if let Some(toggles) = self.top("qa_enabled").and_then(|v| v.as_object()) {
            let has_canonical_os = toggles.contains_key(AgentName::OSDetectionFallback.as_str());
            for (key, value) in toggles {
                // An explicit canonical key beats the renamed legacy one.
                if key == LEGACY_OS_DETECTION_AGENT && has_canonical_os {
                    continue;
                }
                enabled.insert(
                    canonical_qa_key(key).to_string(),
                    json!(lenient_bool(value).unwrap_or(false)),
                );
            }
        }

        json!({
            "Enabled": enabled,
            "MaxRetries": self
                .top("qa_max_retries")
                .and_then(lenient_u32)
                .unwrap_or(DEFAULT_QA_MAX_RETRIES),
        })
    }

    fn features(&mut self) -> Value {
        json!({
            "SigmaFallbackEnabled": self
                .top("sigma_fallback_enabled")
                .and_then(lenient_bool)
                .unwrap_or(DEFAULT_SIGMA_FALLBACK_ENABLED),
            "CmdlineAttentionPreprocessorEnabled": self
                .top("cmdline_attention_preprocessor_enabled")
                .and_then(lenient_bool)
                .unwrap_or(DEFAULT_CMDLINE_ATTENTION_PREPROCESSOR_ENABLED),
        })
    }

    fn prompts(&mut self) -> Value {
        let mut out = Map::new();
        let Some(prompts) = self.agent_prompts else {
            return Value::Object(out);
        };
        self.consumed.insert("agent_prompts".into());

        for (key, value) in prompts {
            if AgentName::is_canonical(key) {
                out.insert(key.clone(), prompt_block(value));
            } else if key != LEGACY_EXTRACT_AGENT_SETTINGS {
                self.dropped.insert(format!("agent_prompts.{}", key));
            }
        }
        Value::Object(out)
    }

    fn execution(&mut self) -> Value {
        let disabled_agents = match self
            .top("extract_agent_settings")
            .and_then(|v| v.get("disabled_agents"))
            .and_then(string_list)
        {
            Some(list) => list,
            // Older presets parked the setting under agent_prompts.
            None => match self
                .agent_prompts
                .and_then(|p| p.get(LEGACY_EXTRACT_AGENT_SETTINGS))
                .and_then(|v| v.get("disabled_agents"))
                .and_then(string_list)
            {
                Some(list) => {
                    self.consumed
                        .insert(format!("agent_prompts.{}", LEGACY_EXTRACT_AGENT_SETTINGS));
                    list
                }
                None => Vec::new(),
            },
        };

        let selected_os = self
            .model(LEGACY_SELECTED_OS_KEY)
            .or_else(|| self.top(LEGACY_SELECTED_OS_KEY))
            .and_then(string_list)
            .unwrap_or_else(|| vec![DEFAULT_SELECTED_OS.to_string()]);

        json!({
            "ExtractAgentSettings": { "DisabledAgents": disabled_agents },
            "OsDetectionSelectedOs": selected_os,
        })
    }
}

// ============================================================================
// v2 → v2 (strict normalization)
// ============================================================================

fn default_section(key: &str) -> Value {
    let section = match key {
        "Metadata" => serde_json::to_value(Metadata::default()),
        "Thresholds" => serde_json::to_value(Thresholds::default()),
        "Embeddings" => serde_json::to_value(Embeddings::default()),
        "QA" => serde_json::to_value(QaConfig::default()),
        "Features" => serde_json::to_value(Features::default()),
        "Execution" => serde_json::to_value(Execution::default()),
        _ => Ok(Value::Object(Map::new())),
    };
    section.unwrap_or_else(|_| Value::Object(Map::new()))
}

fn normalize_v2_strict(raw: &Map<String, Value>) -> Value {
    let mut out = raw.clone();
    let mut dropped: Vec<String> = Vec::new();

    if let Some(v) = out.remove("version") {
        out.entry("Version").or_insert(v);
    }

    // Agent enablement moved from Features onto the agents themselves.
    let mut folded: Vec<(AgentName, Value)> = Vec::new();
    if let Some(features) = out.get_mut("Features").and_then(|v| v.as_object_mut()) {
        for (key, agent) in FEATURE_AGENT_FLAGS {
            if let Some(flag) = features.remove(key) {
                folded.push((agent, flag));
            }
        }
        features.retain(|k, _| {
            let keep = Features::KEYS.contains(&k.as_str());
            if !keep {
                dropped.push(format!("Features.{}", k));
            }
            keep
        });
    }
    for (agent, flag) in folded {
        let target = out
            .get_mut("Agents")
            .and_then(|a| a.get_mut(agent.as_str()))
            .and_then(|a| a.as_object_mut());
        if let (Some(target), Some(flag)) = (target, lenient_bool(&flag)) {
            target.insert("Enabled".into(), json!(flag));
        }
    }

    if let Some(enabled) = out
        .get_mut("QA")
        .and_then(|q| q.get_mut("Enabled"))
        .and_then(|e| e.as_object_mut())
    {
        if let Some(v) = enabled.remove(LEGACY_OS_DETECTION_AGENT) {
            enabled
                .entry(AgentName::OSDetectionFallback.as_str())
                .or_insert(v);
        }
    }

    if let Some(prompts) = out.get_mut("Prompts").and_then(|p| p.as_object_mut()) {
        prompts.retain(|k, _| {
            let keep = AgentName::is_canonical(k);
            if !keep {
                dropped.push(format!("Prompts.{}", k));
            }
            keep
        });
    }

    for key in WorkflowConfig::ROOT_KEYS {
        if !out.contains_key(key) {
            out.insert(key.to_string(), default_section(key));
        }
    }

    if !dropped.is_empty() {
        tracing::warn!(keys = ?dropped, "Stripped non-canonical keys while normalizing v2 config");
    }

    Value::Object(out)
}
