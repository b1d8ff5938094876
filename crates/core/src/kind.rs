//! Job kinds and the envelope family each one is encoded with.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Wire encoding of a job/result pair.
///
/// Each family pairs with a distinct worker implementation; the two are
/// not interchangeable on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeStyle {
    /// Top-level optional fields per feature (scene-file render worker).
    Flat,
    /// `{job_id, job_type, created_at, params}` (engine scene-capture worker).
    Nested,
}

impl EnvelopeStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flat => "flat",
            Self::Nested => "nested",
        }
    }
}

impl fmt::Display for EnvelopeStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Discriminator selecting how a job's parameters are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Render or export a scene file.
    RenderBlend,
    /// Run a script against a scene file.
    ScriptedRun,
    /// Render an animation action to a frame sequence.
    AnimationRender,
    /// Render a biome showcase scene.
    BiomeShowcase,
    /// Render one asset on a presentation ground.
    SingleAsset,
    /// Capture frames of an asset animation.
    AnimationCapture,
}

impl JobKind {
    pub const ALL: [JobKind; 6] = [
        Self::RenderBlend,
        Self::ScriptedRun,
        Self::AnimationRender,
        Self::BiomeShowcase,
        Self::SingleAsset,
        Self::AnimationCapture,
    ];

    /// Envelope family this kind is encoded with.
    pub fn style(self) -> EnvelopeStyle {
        match self {
            Self::RenderBlend | Self::ScriptedRun | Self::AnimationRender => EnvelopeStyle::Flat,
            Self::BiomeShowcase | Self::SingleAsset | Self::AnimationCapture => {
                EnvelopeStyle::Nested
            }
        }
    }

    /// Wire name (the nested envelope's `job_type`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RenderBlend => "render_blend",
            Self::ScriptedRun => "scripted_run",
            Self::AnimationRender => "animation_render",
            Self::BiomeShowcase => "biome_showcase",
            Self::SingleAsset => "single_asset",
            Self::AnimationCapture => "animation_capture",
        }
    }

    /// Parse a wire name.
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == name)
            .ok_or_else(|| CoreError::UnknownKind(name.to_string()))
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
