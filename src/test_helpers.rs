//! Shared test utilities: preset fixtures, DB setup.
//!
//! Available only under `#[cfg(test)]`.

use rusqlite::Connection;
use serde_json::{json, Map, Value};

use crate::agent::AgentName;

// ============================================================================
// v2 fixtures
// ============================================================================

/// A canonical `AgentConfig` object.
pub fn agent_value(provider: &str, model: &str, enabled: bool) -> Value {
    json!({
        "Provider": provider,
        "Model": model,
        "Temperature": 0.0,
        "TopP": 0.9,
        "Enabled": enabled,
    })
}

/// A v2 preset that passes every invariant: all 11 agents configured and
/// enabled, one prompt block per agent.
pub fn valid_v2_value() -> Value {
    let mut agents = Map::new();
    let mut prompts = Map::new();
    for name in AgentName::ALL {
        agents.insert(name.to_string(), agent_value("openai", "gpt-4o-mini", true));
        prompts.insert(
            name.to_string(),
            json!({
                "prompt": format!("You are {}.", name),
                "instructions": "Respond in JSON.",
            }),
        );
    }

    json!({
        "Version": "2.0",
        "Metadata": {
            "CreatedAt": "2025-01-15T10:00:00Z",
            "Description": "Baseline preset",
        },
        "Thresholds": {
            "MinHuntScore": 97.0,
            "RankingThreshold": 6.0,
            "SimilarityThreshold": 0.5,
            "JunkFilterThreshold": 0.8,
            "AutoTriggerHuntScoreThreshold": 60.0,
        },
        "Agents": agents,
        "Embeddings": {
            "OsDetection": "ibm-research/CTI-BERT",
            "Sigma": "ibm-research/CTI-BERT",
        },
        "QA": {
            "Enabled": { "RankAgent": true, "CmdlineExtract": false },
            "MaxRetries": 5,
        },
        "Features": {
            "SigmaFallbackEnabled": false,
            "CmdlineAttentionPreprocessorEnabled": true,
        },
        "Prompts": prompts,
        "Execution": {
            "ExtractAgentSettings": { "DisabledAgents": [] },
            "OsDetectionSelectedOs": ["Windows"],
        },
    })
}

// ============================================================================
// v1 fixtures
// ============================================================================

/// Distinct (provider, model, temperature, top_p) per agent, so a round trip
/// can tell agents apart.
pub fn v1_agent_values(name: AgentName) -> (&'static str, String, f64, f64) {
    let i = name as usize as f64;
    let provider = match name.category() {
        crate::agent::AgentCategory::Main => "openai",
        crate::agent::AgentCategory::SubAgent => "anthropic",
        crate::agent::AgentCategory::Qa => "openai",
        crate::agent::AgentCategory::OsFallback => "lmstudio",
    };
    (provider, format!("model-{}", name), i / 10.0, 0.5 + i / 100.0)
}

/// A legacy flat preset with every one of the 11 agents populated.
pub fn full_v1_preset() -> Value {
    let mut agent_models = Map::new();
    let mut agent_prompts = Map::new();
    for name in AgentName::ALL {
        let (provider, model, temperature, top_p) = v1_agent_values(name);
        agent_models.insert(name.model_key().to_string(), json!(model));
        agent_models.insert(name.provider_key(), json!(provider));
        agent_models.insert(name.temperature_key(), json!(temperature));
        agent_models.insert(name.top_p_key(), json!(top_p));
        agent_prompts.insert(
            name.to_string(),
            json!({ "prompt": format!("prompt for {}", name), "instructions": "" }),
        );
    }
    agent_models.insert("OSDetectionAgent_embedding".into(), json!("ibm-research/CTI-BERT"));
    agent_models.insert("SigmaEmbeddingModel".into(), json!("sentence-transformers/all-mpnet-base-v2"));
    agent_models.insert("OSDetectionAgent_selected_os".into(), json!(["Windows", "Linux"]));
    agent_prompts.insert(
        "ExtractAgentSettings".into(),
        json!({ "disabled_agents": ["HuntQueriesExtract"] }),
    );

    json!({
        "version": "1.0",
        "description": "Legacy preset",
        "created_at": "2024-11-02T08:30:00Z",
        "thresholds": {
            "min_hunt_score": 92.5,
            "ranking_threshold": 7.0,
            "similarity_threshold": 0.6,
            "junk_filter_threshold": 0.75,
            "auto_trigger_hunt_score_threshold": 55.0,
        },
        "agent_models": agent_models,
        "agent_prompts": agent_prompts,
        "qa_enabled": { "RankAgent": true, "CmdlineExtract": true, "OSDetectionAgent": false },
        "qa_max_retries": 3,
        "rank_agent_enabled": true,
        "osdetection_fallback_enabled": true,
        "sigma_fallback_enabled": true,
        "cmdline_attention_preprocessor_enabled": false,
        "extract_agent_settings": { "disabled_agents": ["HuntQueriesExtract"] },
    })
}

// ============================================================================
// DB setup
// ============================================================================

/// In-memory presets DB with all migrations applied.
pub fn setup_presets_db() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch("PRAGMA foreign_keys=ON;").unwrap();
    crate::storage::migrations::migrate_presets_db(&conn).unwrap();
    conn
}
