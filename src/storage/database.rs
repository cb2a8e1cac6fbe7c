use crate::constants::SQLITE_BUSY_TIMEOUT_MS;
use crate::{WorkflowConfigError, WorkflowConfigResult};
use rusqlite::Connection;

/// Open the presets database with the common pragmas.
pub fn open_connection(path: &std::path::Path) -> WorkflowConfigResult<Connection> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let conn = Connection::open(path).map_err(|e| {
        WorkflowConfigError::Storage(format!("Failed to open {}: {}", path.display(), e))
    })?;

    tracing::debug!(path = %path.display(), "Database connection opened");

    configure_common(&conn)?;
    Ok(conn)
}

/// Pragmas applied to every connection:
/// - journal_mode = WAL
/// - busy_timeout = SQLITE_BUSY_TIMEOUT_MS
/// - synchronous = NORMAL
/// - foreign_keys = ON
fn configure_common(conn: &Connection) -> WorkflowConfigResult<()> {
    conn.execute_batch(&format!(
        "PRAGMA journal_mode = WAL;
         PRAGMA busy_timeout = {};
         PRAGMA synchronous = NORMAL;
         PRAGMA foreign_keys = ON;",
        SQLITE_BUSY_TIMEOUT_MS,
    ))
    .map_err(|e| WorkflowConfigError::Storage(format!("Failed to configure pragmas: {}", e)))?;
    Ok(())
}
