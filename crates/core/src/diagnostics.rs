//! Recovering a structured diagnostic report from a worker log.
//!
//! The diagnostic script prints its JSON between two sentinel lines. The
//! log around it is arbitrary worker output, and a long-lived log may hold
//! the blocks of several earlier runs.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

pub const DIAGNOSTIC_START_MARKER: &str = "=== DIAGNOSTIC_JSON_START ===";
pub const DIAGNOSTIC_END_MARKER: &str = "=== DIAGNOSTIC_JSON_END ===";

/// Issue reported when no fenced block could be recovered.
pub const UNPARSED_ISSUE: &str = "Could not parse diagnostic output from log";

/// Block between the markers. Each marker may carry a log-line prefix.
const DIAGNOSTIC_BLOCK_PATTERN: &str =
    r"(?s)=== DIAGNOSTIC_JSON_START ===[^\n]*\n(.*?)\n[^\n]*=== DIAGNOSTIC_JSON_END ===";

static DIAGNOSTIC_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(DIAGNOSTIC_BLOCK_PATTERN).expect("valid regex"));

/// Return the last fenced block in `log` that parses as JSON.
pub fn extract_fenced_json(log: &str) -> Option<serde_json::Value> {
    DIAGNOSTIC_BLOCK_RE
        .captures_iter(log)
        .filter_map(|caps| caps.get(1))
        .filter_map(|m| serde_json::from_str(innermost_block(m.as_str())).ok())
        .last()
}

/// A start marker without an end swallows the next block's start marker;
/// keep only what follows the last one.
fn innermost_block(body: &str) -> &str {
    match body.rfind(DIAGNOSTIC_START_MARKER) {
        Some(pos) => {
            let rest = &body[pos..];
            rest.find('\n').map_or("", |nl| &rest[nl + 1..])
        }
        None => body,
    }
}

/// Armature and animation sanity report produced by the diagnostic script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticReport {
    /// `ok` or `error`.
    pub status: String,
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub armatures: Vec<serde_json::Value>,
    #[serde(default)]
    pub meshes: Vec<serde_json::Value>,
    #[serde(default)]
    pub actions: Vec<serde_json::Value>,
    #[serde(default)]
    pub vertex_deformation_test: Option<serde_json::Value>,
}

impl DiagnosticReport {
    /// Soft-failure report used when the log holds no usable block.
    pub fn unparsed() -> Self {
        Self {
            status: "error".to_string(),
            issues: vec![UNPARSED_ISSUE.to_string()],
            warnings: Vec::new(),
            armatures: Vec::new(),
            meshes: Vec::new(),
            actions: Vec::new(),
            vertex_deformation_test: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }

    /// Parse the report out of a worker log, falling back to [`Self::unparsed`].
    pub fn from_log(log: &str) -> Self {
        extract_fenced_json(log)
            .and_then(|value| serde_json::from_value(value).ok())
            .unwrap_or_else(Self::unparsed)
    }
}
