use std::path::PathBuf;

/// Env var overriding the data directory.
pub const DATA_DIR_ENV: &str = "WORKFLOW_CONFIG_HOME";

/// Cross-platform data directory.
/// Linux: ~/.config/workflow-config/
/// macOS: ~/Library/Application Support/workflow-config/
/// Windows: %APPDATA%/workflow-config/
///
/// `WORKFLOW_CONFIG_HOME` wins when set and non-empty.
pub fn data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }
    let base = dirs::config_dir().unwrap_or_else(|| {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
    });
    base.join("workflow-config")
}

/// Preset store: {data_dir}/presets.db
pub fn presets_db_path() -> PathBuf {
    data_dir().join("presets.db")
}
