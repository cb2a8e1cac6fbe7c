use thiserror::Error;

/// Structural or cross-field violation found while validating a workflow config.
///
/// This is the single error type surfaced by the loader entry points, so callers
/// can tell "malformed preset" apart from storage or I/O failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Wrong type, missing required field, unknown key or bad `Version`.
    #[error("Invalid workflow config: {0}")]
    Schema(String),

    #[error("QA.Enabled key '{0}' is not in Agents")]
    OrphanQaToggle(String),

    #[error("Prompts key '{0}' is not a canonical agent name")]
    UnknownPromptKey(String),

    #[error("Agent '{0}' is Enabled but missing Provider or Model")]
    EnabledWithoutModel(String),

    #[error("Missing QA agent for {base}: expected {qa} in Agents")]
    MissingQaAgent { base: String, qa: String },

    #[error("QA agent '{qa}' has no base agent: expected {base} in Agents")]
    OrphanQaAgent { qa: String, base: String },

    #[error("Missing prompt block for agent {0}")]
    MissingPrompt(String),
}

impl From<serde_json::Error> for ValidationError {
    fn from(e: serde_json::Error) -> Self {
        Self::Schema(e.to_string())
    }
}

#[derive(Error, Debug)]
pub enum WorkflowConfigError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Config not found: {0}")]
    NotFound(String),

    /// Business-logic storage errors (invalid state, failed migration, etc.)
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Raw database errors from rusqlite
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

pub type WorkflowConfigResult<T> = Result<T, WorkflowConfigError>;
