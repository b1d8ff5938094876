//! Job descriptors and their two wire encodings.
//!
//! A [`JobDescriptor`] is written once by the submitter and never touched
//! again; the file in the queue directory is the single source of truth.
//! The encoding is chosen by the job's kind (see [`EnvelopeStyle`]):
//!
//! - Flat: `{"job_id": .., "created_at": .., <parameters at top level>}`.
//!   The kind is not written; a worker tells the shapes apart by the
//!   `render_animation` flag and the presence of `script`, and so does
//!   [`JobDescriptor::from_json`].
//! - Nested: `{"job_id": .., "job_type": .., "created_at": .., "params": {..}}`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::builders::{FIELD_RENDER_ANIMATION, FIELD_SCRIPT};
use crate::error::CoreError;
use crate::ids::JobId;
use crate::kind::{EnvelopeStyle, JobKind};
use crate::params::{ParamValue, Parameters};

/// Immutable description of one unit of work.
#[derive(Debug, Clone, PartialEq)]
pub struct JobDescriptor {
    job_id: JobId,
    kind: JobKind,
    created_at: DateTime<Utc>,
    parameters: Parameters,
}

#[derive(Serialize, Deserialize)]
struct FlatJobEnvelope {
    job_id: JobId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    fields: Parameters,
}

#[derive(Serialize, Deserialize)]
struct NestedJobEnvelope {
    job_id: JobId,
    job_type: String,
    created_at: DateTime<Utc>,
    #[serde(default)]
    params: Parameters,
}

impl JobDescriptor {
    pub fn new(
        job_id: JobId,
        kind: JobKind,
        created_at: DateTime<Utc>,
        parameters: Parameters,
    ) -> Self {
        Self {
            job_id,
            kind,
            created_at,
            parameters,
        }
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    pub fn kind(&self) -> JobKind {
        self.kind
    }

    /// Advisory creation time; used for staleness, never for ordering.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn parameter(&self, key: &str) -> Option<&ParamValue> {
        self.parameters.get(key)
    }

    pub fn style(&self) -> EnvelopeStyle {
        self.kind.style()
    }

    /// Serialize to the envelope the job's kind dictates (pretty-printed).
    ///
    /// Flat jobs whose parameters would be read back as a different kind
    /// are rejected, since the flat wire format has no kind field.
    pub fn to_json(&self) -> Result<Vec<u8>, CoreError> {
        let bytes = match self.style() {
            EnvelopeStyle::Flat => {
                let inferred = infer_flat_kind(&self.parameters);
                if inferred != self.kind {
                    return Err(CoreError::Validation(format!(
                        "Parameters of a {} job would be read back as {inferred}",
                        self.kind
                    )));
                }
                if self.parameters.contains_key("job_id")
                    || self.parameters.contains_key("created_at")
                {
                    return Err(CoreError::Validation(
                        "Flat job parameters may not shadow 'job_id' or 'created_at'".to_string(),
                    ));
                }
                serde_json::to_vec_pretty(&FlatJobEnvelope {
                    job_id: self.job_id.clone(),
                    created_at: Some(self.created_at),
                    fields: self.parameters.clone(),
                })?
            }
            EnvelopeStyle::Nested => serde_json::to_vec_pretty(&NestedJobEnvelope {
                job_id: self.job_id.clone(),
                job_type: self.kind.as_str().to_string(),
                created_at: self.created_at,
                params: self.parameters.clone(),
            })?,
        };
        Ok(bytes)
    }

    /// Parse an envelope of the given family.
    ///
    /// A flat envelope without `created_at` (older submitters never wrote
    /// one) is stamped with the current time.
    pub fn from_json(style: EnvelopeStyle, bytes: &[u8]) -> Result<Self, CoreError> {
        match style {
            EnvelopeStyle::Flat => {
                let envelope: FlatJobEnvelope = serde_json::from_slice(bytes)?;
                let kind = infer_flat_kind(&envelope.fields);
                Ok(Self {
                    job_id: envelope.job_id,
                    kind,
                    created_at: envelope.created_at.unwrap_or_else(Utc::now),
                    parameters: envelope.fields,
                })
            }
            EnvelopeStyle::Nested => {
                let envelope: NestedJobEnvelope = serde_json::from_slice(bytes)?;
                let kind = JobKind::from_name(&envelope.job_type)?;
                if kind.style() != EnvelopeStyle::Nested {
                    return Err(CoreError::Validation(format!(
                        "Job type '{kind}' is not encoded in the nested envelope"
                    )));
                }
                Ok(Self {
                    job_id: envelope.job_id,
                    kind,
                    created_at: envelope.created_at,
                    parameters: envelope.params,
                })
            }
        }
    }
}

/// Recover the kind of a flat job from its fields.
fn infer_flat_kind(fields: &Parameters) -> JobKind {
    let animated = fields
        .get(FIELD_RENDER_ANIMATION)
        .and_then(ParamValue::as_bool)
        .unwrap_or(false);
    let scripted = fields.get(FIELD_SCRIPT).is_some_and(|v| !v.is_null());

    if animated {
        JobKind::AnimationRender
    } else if scripted {
        JobKind::ScriptedRun
    } else {
        JobKind::RenderBlend
    }
}
