//! Log export commands.

use serde::Serialize;
use tracing::{error, info, warn};

use crate::observability;
use crate::AppState;

/// Response wrapper for log export
#[derive(Debug, Serialize)]
pub struct LogsExportResponse {
    pub success: bool,
    pub filename: Option<String>,
    pub content: Option<String>,
    pub error: Option<String>,
}

/// Exports backend logs for support.
pub async fn export_logs(state: &AppState) -> Result<LogsExportResponse, String> {
    match observability::collect_logs(&state.config.log_dir()) {
        Ok(export) => Ok(LogsExportResponse {
            success: true,
            filename: Some(export.filename),
            content: Some(export.content),
            error: None,
        }),
        Err(err) => Ok(LogsExportResponse {
            success: false,
            filename: None,
            content: None,
            error: Some(err),
        }),
    }
}

/// Forwards a frontend log line into the backend log file.
pub async fn log_frontend_message(level: String, message: String) -> Result<(), String> {
    match level.to_ascii_lowercase().as_str() {
        "error" => error!(target: "frontend", "{}", message),
        "warn" | "warning" => warn!(target: "frontend", "{}", message),
        _ => info!(target: "frontend", "{}", message),
    }
    Ok(())
}
