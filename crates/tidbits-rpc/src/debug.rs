//! Debug logging for the RPC loop.
//!
//! Appends one JSONL entry per handled request when a debug log path is
//! configured, for diagnosing what agents actually sent.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Environment variable naming the debug log file.
pub const DEBUG_LOG_ENV: &str = "TIDBITS_RPC_DEBUG";

/// Debug log entry for one request
#[derive(Debug, Serialize)]
pub struct RequestDebugLog {
    /// Timestamp
    pub timestamp: DateTime<Utc>,
    /// Request id as sent
    pub request_id: Value,
    /// Method name as sent
    pub method: String,
    /// Params summary (truncated for large inputs)
    pub params_summary: String,
    /// "ok" or "error"
    pub outcome: String,
    /// Error text returned to the caller
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RequestDebugLog {
    pub fn new(request_id: Value, method: &str) -> Self {
        Self {
            timestamp: Utc::now(),
            request_id,
            method: method.to_string(),
            params_summary: String::new(),
            outcome: String::new(),
            error: None,
        }
    }

    pub fn with_params(mut self, params: &Value) -> Self {
        let summary = params.to_string();
        // Truncate to 200 chars to avoid huge logs
        self.params_summary = if summary.chars().count() > 200 {
            let head: String = summary.chars().take(200).collect();
            format!("{}...", head)
        } else {
            summary
        };
        self
    }

    pub fn with_outcome(mut self, error: Option<&str>) -> Self {
        self.outcome = if error.is_some() { "error" } else { "ok" }.to_string();
        self.error = error.map(str::to_string);
        self
    }

    /// Append the entry to `path`.
    pub fn write(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;

        let json = serde_json::to_string(self).unwrap_or_default();
        writeln!(file, "{}", json)?;

        Ok(())
    }
}

/// Debug log path from the environment, if debugging is enabled.
pub fn debug_log_path() -> Option<PathBuf> {
    std::env::var_os(DEBUG_LOG_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_debug_log_serialization() {
        let log = RequestDebugLog::new(json!(7), "tidbits.upvote")
            .with_params(&json!({"memory_id": "m1"}))
            .with_outcome(Some("not found: m1"));

        let json = serde_json::to_string(&log).unwrap();
        assert!(json.contains("tidbits.upvote"));
        assert!(json.contains("\"outcome\":\"error\""));
        assert!(json.contains("not found: m1"));
    }

    #[test]
    fn test_truncation() {
        let long = json!({"content": "a".repeat(500)});
        let log = RequestDebugLog::new(Value::Null, "tidbits.create").with_params(&long);

        assert!(log.params_summary.len() <= 203); // 200 + "..."
    }

    #[test]
    fn test_write_appends_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs").join("rpc.jsonl");

        for i in 0..2 {
            RequestDebugLog::new(json!(i), "tidbits.list")
                .with_outcome(None)
                .write(&path)
                .unwrap();
        }
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(!contents.contains("\"error\""));
    }
}
