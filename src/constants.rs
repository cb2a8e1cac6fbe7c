// === Versions ===
pub const CANONICAL_VERSION: &str = "2.0";

// === Threshold defaults ===
pub const DEFAULT_MIN_HUNT_SCORE: f64 = 97.0;
pub const DEFAULT_RANKING_THRESHOLD: f64 = 6.0;
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.5;
pub const DEFAULT_JUNK_FILTER_THRESHOLD: f64 = 0.8;
pub const DEFAULT_AUTO_TRIGGER_HUNT_SCORE_THRESHOLD: f64 = 60.0;

// === Agent sampling defaults (legacy flat keys) ===
pub const DEFAULT_TEMPERATURE: f64 = 0.0;
pub const DEFAULT_TOP_P: f64 = 0.9;

// === QA ===
pub const DEFAULT_QA_MAX_RETRIES: u32 = 5;

// === Embeddings ===
pub const DEFAULT_OS_DETECTION_EMBEDDING: &str = "ibm-research/CTI-BERT";
pub const DEFAULT_SIGMA_EMBEDDING: &str = "ibm-research/CTI-BERT";

// === Features ===
pub const DEFAULT_SIGMA_FALLBACK_ENABLED: bool = false;
pub const DEFAULT_CMDLINE_ATTENTION_PREPROCESSOR_ENABLED: bool = true;

// === Execution ===
pub const DEFAULT_SELECTED_OS: &str = "Windows";

// === Export ===
pub const DEFAULT_EXPORT_DESCRIPTION: &str = "Exported preset";
/// `Metadata.CreatedAt` format for exported presets.
pub const CREATED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

// === Legacy flat keys outside the per-agent prefixes ===
pub const LEGACY_OS_EMBEDDING_KEY: &str = "OSDetectionAgent_embedding";
pub const LEGACY_SIGMA_EMBEDDING_KEY: &str = "SigmaEmbeddingModel";
pub const LEGACY_SELECTED_OS_KEY: &str = "OSDetectionAgent_selected_os";
pub const LEGACY_OS_DETECTION_AGENT: &str = "OSDetectionAgent";
pub const LEGACY_EXTRACT_AGENT_SETTINGS: &str = "ExtractAgentSettings";

// === SQLite Tuning ===
pub const SQLITE_BUSY_TIMEOUT_MS: u32 = 5_000;
