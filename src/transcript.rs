use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Append-only JSON-lines log of console events
pub struct Transcript {
    pub path: PathBuf,
    session_id: String,
    file: File,
}

#[derive(Serialize)]
struct Event<'a> {
    ts: DateTime<Utc>,
    session_id: &'a str,
    #[serde(rename = "type")]
    event_type: &'a str,
    #[serde(flatten)]
    data: serde_json::Value,
}

impl Transcript {
    pub fn new(path: &Path, session_id: &str) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            session_id: session_id.to_string(),
            file,
        })
    }

    pub fn log(&mut self, event_type: &str, data: serde_json::Value) -> Result<()> {
        let event = Event {
            ts: Utc::now(),
            session_id: &self.session_id,
            event_type,
            data,
        };
        let line = serde_json::to_string(&event)?;
        writeln!(self.file, "{}", line)?;
        self.file.flush()?;
        Ok(())
    }

    /// Log a route decision for a navigation
    pub fn navigation(
        &mut self,
        requested: &str,
        resolved: &str,
        outcome: &str,
        role: &str,
        authenticated: bool,
    ) -> Result<()> {
        self.log(
            "navigation",
            serde_json::json!({
                "requested": requested,
                "resolved": resolved,
                "outcome": outcome,
                "role": role,
                "authenticated": authenticated,
            }),
        )
    }

    pub fn login(&mut self, role: &str) -> Result<()> {
        self.log("login", serde_json::json!({ "role": role }))
    }

    pub fn logout(&mut self) -> Result<()> {
        self.log("logout", serde_json::json!({}))
    }

    /// Log a screen action and its result message
    pub fn action(&mut self, view: &str, action: &str, message: Option<&str>) -> Result<()> {
        self.log(
            "action",
            serde_json::json!({
                "view": view,
                "action": action,
                "message": message,
            }),
        )
    }

    pub fn storage_warning(&mut self, message: &str) -> Result<()> {
        self.log("storage_warning", serde_json::json!({ "message": message }))
    }

    pub fn api_error(&mut self, view: &str, error: &str) -> Result<()> {
        self.log(
            "api_error",
            serde_json::json!({
                "view": view,
                "error": error,
            }),
        )
    }
}
