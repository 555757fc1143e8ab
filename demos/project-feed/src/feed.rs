//! Input format: one dispatch request per line
//!
//! ```text
//! # comments and blank lines are ignored
//! {"action": "loadStats", "payload": {"project": "api"}}
//! {"action": "setActive"}
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DispatchRequest {
    pub action: String,
    #[serde(default)]
    pub payload: Value,
}

/// Parse one input line; `None` for blank lines and comments
pub fn parse_line(line: &str) -> Result<Option<DispatchRequest>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let request = serde_json::from_str(line)
        .with_context(|| format!("invalid dispatch request: {line}"))?;
    Ok(Some(request))
}
