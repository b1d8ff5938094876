//! Job identifiers.
//!
//! A [`JobId`] names both the queue file and every output artifact of a
//! job, so it doubles as a path component. Parsing only rejects values that
//! would escape or hide inside the shared directories; the id is otherwise
//! opaque.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Length of a generated id (leading hex digits of a UUID v4).
const GENERATED_ID_LEN: usize = 8;

/// Upper bound for caller-chosen ids.
const MAX_ID_LEN: usize = 128;

/// Opaque short identifier, unique per outstanding job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct JobId(String);

impl JobId {
    /// Generate a fresh random id.
    pub fn generate() -> Self {
        let mut id = uuid::Uuid::new_v4().simple().to_string();
        id.truncate(GENERATED_ID_LEN);
        Self(id)
    }

    /// Accept a caller-chosen id.
    ///
    /// Rules:
    /// - Must not be empty or longer than `MAX_ID_LEN` bytes.
    /// - Must not start with `.` (hidden / temp files in the queue).
    /// - Must not contain path separators or control characters.
    pub fn parse(raw: impl Into<String>) -> Result<Self, CoreError> {
        let raw = raw.into();
        validate_job_id(&raw)?;
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn validate_job_id(raw: &str) -> Result<(), CoreError> {
    if raw.is_empty() {
        return Err(CoreError::Validation("Job id must not be empty".to_string()));
    }
    if raw.len() > MAX_ID_LEN {
        return Err(CoreError::Validation(format!(
            "Job id must not exceed {MAX_ID_LEN} characters"
        )));
    }
    if raw.starts_with('.') {
        return Err(CoreError::Validation(format!(
            "Job id '{raw}' must not start with '.'"
        )));
    }
    if raw
        .chars()
        .any(|c| c == '/' || c == '\\' || c.is_control())
    {
        return Err(CoreError::Validation(format!(
            "Job id '{raw}' may not contain path separators or control characters"
        )));
    }
    Ok(())
}

impl TryFrom<String> for JobId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl TryFrom<&str> for JobId {
    type Error = CoreError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl FromStr for JobId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<JobId> for String {
    fn from(id: JobId) -> Self {
        id.0
    }
}

impl AsRef<str> for JobId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
