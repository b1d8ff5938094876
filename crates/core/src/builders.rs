//! Typed builders for every supported job shape.
//!
//! Each builder is a thin mapping from kind-specific arguments to the
//! generic [`JobDescriptor`]. String-valued presets (engine, camera, biome,
//! density, render mode, ...) are passed through verbatim: any value is
//! accepted here and the worker decides what it understands.

use chrono::Utc;

use crate::ids::JobId;
use crate::job::JobDescriptor;
use crate::kind::JobKind;
use crate::params::{ParamValue, Parameters};

// ---------------------------------------------------------------------------
// Flat field names
// ---------------------------------------------------------------------------

pub const FIELD_BLEND_FILE: &str = "blend_file";
pub const FIELD_RENDER_ENGINE: &str = "render_engine";
pub const FIELD_OUTPUT_FORMAT: &str = "output_format";
pub const FIELD_SCRIPT: &str = "script";
pub const FIELD_SCRIPT_ARGS: &str = "script_args";
pub const FIELD_GENERATE_PREVIEWS: &str = "generate_previews";
pub const FIELD_PREVIEW_ANGLES: &str = "preview_angles";
pub const FIELD_PREVIEW_RESOLUTION: &str = "preview_resolution";
pub const FIELD_GENERATE_CONTACT_SHEET: &str = "generate_contact_sheet";
pub const FIELD_RENDER_ANIMATION: &str = "render_animation";
pub const FIELD_FRAME_START: &str = "frame_start";
pub const FIELD_FRAME_END: &str = "frame_end";
pub const FIELD_ACTION_NAME: &str = "action_name";
pub const FIELD_ANIMATION_ANGLES: &str = "animation_angles";

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

pub const DEFAULT_RENDER_ENGINE: &str = "BLENDER_EEVEE";
pub const DEFAULT_OUTPUT_FORMAT: &str = "glb";
pub const DEFAULT_PREVIEW_RESOLUTION: u32 = 512;
pub const DEFAULT_ANIMATION_RESOLUTION: u32 = 256;

/// Ground-level and 45° elevated views around the asset, plus top and bottom.
pub const DEFAULT_PREVIEW_ANGLES: [&str; 18] = [
    "front",
    "back",
    "left",
    "right",
    "front_left",
    "front_right",
    "back_left",
    "back_right",
    "front_above",
    "back_above",
    "left_above",
    "right_above",
    "front_left_above",
    "front_right_above",
    "back_left_above",
    "back_right_above",
    "top",
    "bottom",
];

pub const DEFAULT_ANIMATION_ANGLES: [&str; 3] = ["front34", "side", "top"];

pub const DEFAULT_SHOWCASE_CAMERA: &str = "front";
pub const DEFAULT_ASSET_CAMERA: &str = "front_34_elevated";
pub const DEFAULT_RENDER_MODE: &str = "normal";

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

/// Something that can be turned into a [`JobDescriptor`] of a fixed kind.
pub trait JobBuilder: Sized {
    const KIND: JobKind;

    /// Kind-specific parameters, with defaults applied.
    fn into_parameters(self) -> Parameters;

    /// Build with a freshly generated id.
    fn build(self) -> JobDescriptor {
        self.build_with_id(JobId::generate())
    }

    /// Build with a caller-chosen id.
    fn build_with_id(self, job_id: JobId) -> JobDescriptor {
        JobDescriptor::new(job_id, Self::KIND, Utc::now(), self.into_parameters())
    }
}

/// Every flat job carries the full field set; unset features are `null`
/// or their default so the worker can read one fixed shape.
fn flat_base(blend_file: String, render_engine: String) -> Parameters {
    let mut p = Parameters::new();
    p.insert(FIELD_BLEND_FILE.into(), blend_file.into());
    p.insert(FIELD_RENDER_ENGINE.into(), render_engine.into());
    p.insert(FIELD_OUTPUT_FORMAT.into(), DEFAULT_OUTPUT_FORMAT.into());
    p.insert(FIELD_SCRIPT.into(), ParamValue::Null);
    p.insert(FIELD_SCRIPT_ARGS.into(), Vec::<String>::new().into());
    p.insert(FIELD_GENERATE_PREVIEWS.into(), false.into());
    p.insert(
        FIELD_PREVIEW_ANGLES.into(),
        strings(&DEFAULT_PREVIEW_ANGLES).into(),
    );
    p.insert(
        FIELD_PREVIEW_RESOLUTION.into(),
        DEFAULT_PREVIEW_RESOLUTION.into(),
    );
    p.insert(FIELD_GENERATE_CONTACT_SHEET.into(), false.into());
    p.insert(FIELD_RENDER_ANIMATION.into(), false.into());
    p.insert(FIELD_FRAME_START.into(), ParamValue::Null);
    p.insert(FIELD_FRAME_END.into(), ParamValue::Null);
    p.insert(FIELD_ACTION_NAME.into(), ParamValue::Null);
    p.insert(
        FIELD_ANIMATION_ANGLES.into(),
        strings(&DEFAULT_ANIMATION_ANGLES).into(),
    );
    p
}

// ---------------------------------------------------------------------------
// Flat family
// ---------------------------------------------------------------------------

/// Render or export a scene file.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderBlend {
    pub blend_file: String,
    pub render_engine: String,
    /// `glb`, `png` or `blend` by convention.
    pub output_format: String,
    pub generate_previews: bool,
    pub preview_angles: Vec<String>,
    pub preview_resolution: u32,
    pub generate_contact_sheet: bool,
}

impl RenderBlend {
    pub fn new(blend_file: impl Into<String>) -> Self {
        Self {
            blend_file: blend_file.into(),
            render_engine: DEFAULT_RENDER_ENGINE.to_string(),
            output_format: DEFAULT_OUTPUT_FORMAT.to_string(),
            generate_previews: false,
            preview_angles: strings(&DEFAULT_PREVIEW_ANGLES),
            preview_resolution: DEFAULT_PREVIEW_RESOLUTION,
            generate_contact_sheet: false,
        }
    }
}

impl JobBuilder for RenderBlend {
    const KIND: JobKind = JobKind::RenderBlend;

    fn into_parameters(self) -> Parameters {
        let mut p = flat_base(self.blend_file, self.render_engine);
        p.insert(FIELD_OUTPUT_FORMAT.into(), self.output_format.into());
        p.insert(FIELD_GENERATE_PREVIEWS.into(), self.generate_previews.into());
        p.insert(FIELD_PREVIEW_ANGLES.into(), self.preview_angles.into());
        p.insert(
            FIELD_PREVIEW_RESOLUTION.into(),
            self.preview_resolution.into(),
        );
        p.insert(
            FIELD_GENERATE_CONTACT_SHEET.into(),
            self.generate_contact_sheet.into(),
        );
        p
    }
}

/// Run a script inside the render tool against a scene file.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptedRun {
    pub blend_file: String,
    /// Path of the script as seen by the worker.
    pub script: String,
    pub script_args: Vec<String>,
}

impl ScriptedRun {
    pub fn new(blend_file: impl Into<String>, script: impl Into<String>) -> Self {
        Self {
            blend_file: blend_file.into(),
            script: script.into(),
            script_args: Vec::new(),
        }
    }
}

impl JobBuilder for ScriptedRun {
    const KIND: JobKind = JobKind::ScriptedRun;

    fn into_parameters(self) -> Parameters {
        let mut p = flat_base(self.blend_file, DEFAULT_RENDER_ENGINE.to_string());
        p.insert(FIELD_SCRIPT.into(), self.script.into());
        p.insert(FIELD_SCRIPT_ARGS.into(), self.script_args.into());
        p
    }
}

/// Render an animation action to a frame sequence.
///
/// `None` for the action or frame bounds lets the worker use the active
/// action and its own frame range.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationRender {
    pub blend_file: String,
    pub action_name: Option<String>,
    pub frame_start: Option<i64>,
    pub frame_end: Option<i64>,
    pub render_engine: String,
    /// Square output resolution in pixels.
    pub resolution: u32,
    pub animation_angles: Vec<String>,
}

impl AnimationRender {
    pub fn new(blend_file: impl Into<String>) -> Self {
        Self {
            blend_file: blend_file.into(),
            action_name: None,
            frame_start: None,
            frame_end: None,
            render_engine: DEFAULT_RENDER_ENGINE.to_string(),
            resolution: DEFAULT_ANIMATION_RESOLUTION,
            animation_angles: strings(&DEFAULT_ANIMATION_ANGLES),
        }
    }
}

impl JobBuilder for AnimationRender {
    const KIND: JobKind = JobKind::AnimationRender;

    fn into_parameters(self) -> Parameters {
        let mut p = flat_base(self.blend_file, self.render_engine);
        p.insert(FIELD_RENDER_ANIMATION.into(), true.into());
        p.insert(FIELD_ACTION_NAME.into(), self.action_name.into());
        p.insert(FIELD_FRAME_START.into(), self.frame_start.into());
        p.insert(FIELD_FRAME_END.into(), self.frame_end.into());
        // The worker reads the frame size from the preview resolution field.
        p.insert(FIELD_PREVIEW_RESOLUTION.into(), self.resolution.into());
        p.insert(FIELD_ANIMATION_ANGLES.into(), self.animation_angles.into());
        p
    }
}

// ---------------------------------------------------------------------------
// Nested family
// ---------------------------------------------------------------------------

/// Render a biome showcase scene.
#[derive(Debug, Clone, PartialEq)]
pub struct BiomeShowcase {
    pub biome: String,
    pub camera: String,
    pub distance: f64,
    /// e.g. `sparse`, `medium`, `dense`, `extreme`.
    pub density: String,
    pub seed: i64,
    pub include_player: bool,
    pub include_flora: bool,
    pub dusk_lighting: bool,
    pub render_mode: String,
    pub hero_player: bool,
    /// Enemy type spawned as the hero subject; empty for none.
    pub hero_enemy: String,
    pub output_width: u32,
    pub output_height: u32,
}

impl BiomeShowcase {
    pub fn new(biome: impl Into<String>) -> Self {
        Self {
            biome: biome.into(),
            camera: DEFAULT_SHOWCASE_CAMERA.to_string(),
            distance: 48.0,
            density: "medium".to_string(),
            seed: 42,
            include_player: false,
            include_flora: false,
            dusk_lighting: false,
            render_mode: DEFAULT_RENDER_MODE.to_string(),
            hero_player: false,
            hero_enemy: String::new(),
            output_width: 1024,
            output_height: 768,
        }
    }
}

impl JobBuilder for BiomeShowcase {
    const KIND: JobKind = JobKind::BiomeShowcase;

    fn into_parameters(self) -> Parameters {
        let mut p = Parameters::new();
        p.insert("biome".into(), self.biome.into());
        p.insert("camera".into(), self.camera.into());
        p.insert("distance".into(), self.distance.into());
        p.insert("density".into(), self.density.into());
        p.insert("seed".into(), self.seed.into());
        p.insert("include_player".into(), self.include_player.into());
        p.insert("include_flora".into(), self.include_flora.into());
        p.insert("dusk_lighting".into(), self.dusk_lighting.into());
        p.insert("render_mode".into(), self.render_mode.into());
        p.insert("hero_player".into(), self.hero_player.into());
        p.insert("hero_enemy".into(), self.hero_enemy.into());
        p.insert("output_width".into(), self.output_width.into());
        p.insert("output_height".into(), self.output_height.into());
        p
    }
}

/// Render a single asset on a presentation ground.
#[derive(Debug, Clone, PartialEq)]
pub struct SingleAsset {
    /// Engine resource path, e.g. `res://assets/...`.
    pub asset_path: String,
    /// Biome providing lighting and ground colours.
    pub biome: String,
    pub camera: String,
    pub distance: f64,
    /// e.g. `flat`, `procedural`, `slope`.
    pub terrain_mode: String,
    pub render_mode: String,
    pub output_width: u32,
    pub output_height: u32,
}

impl SingleAsset {
    pub fn new(asset_path: impl Into<String>, biome: impl Into<String>) -> Self {
        Self {
            asset_path: asset_path.into(),
            biome: biome.into(),
            camera: DEFAULT_ASSET_CAMERA.to_string(),
            distance: 24.0,
            terrain_mode: "flat".to_string(),
            render_mode: DEFAULT_RENDER_MODE.to_string(),
            output_width: 512,
            output_height: 512,
        }
    }
}

impl JobBuilder for SingleAsset {
    const KIND: JobKind = JobKind::SingleAsset;

    fn into_parameters(self) -> Parameters {
        let mut p = Parameters::new();
        p.insert("asset_path".into(), self.asset_path.into());
        p.insert("biome".into(), self.biome.into());
        p.insert("camera".into(), self.camera.into());
        p.insert("distance".into(), self.distance.into());
        p.insert("terrain_mode".into(), self.terrain_mode.into());
        p.insert("render_mode".into(), self.render_mode.into());
        p.insert("output_width".into(), self.output_width.into());
        p.insert("output_height".into(), self.output_height.into());
        p
    }
}

/// Capture frames of an asset animation for GIFs and contact sheets.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationCapture {
    pub asset_path: String,
    pub animation_name: String,
    pub fps: u32,
    pub output_width: u32,
    pub output_height: u32,
    pub camera: String,
}

impl AnimationCapture {
    pub fn new(asset_path: impl Into<String>, animation_name: impl Into<String>) -> Self {
        Self {
            asset_path: asset_path.into(),
            animation_name: animation_name.into(),
            fps: 24,
            output_width: 512,
            output_height: 512,
            camera: DEFAULT_ASSET_CAMERA.to_string(),
        }
    }
}

impl JobBuilder for AnimationCapture {
    const KIND: JobKind = JobKind::AnimationCapture;

    fn into_parameters(self) -> Parameters {
        let mut p = Parameters::new();
        p.insert("asset_path".into(), self.asset_path.into());
        p.insert("animation_name".into(), self.animation_name.into());
        p.insert("fps".into(), self.fps.into());
        p.insert("output_width".into(), self.output_width.into());
        p.insert("output_height".into(), self.output_height.into());
        p.insert("camera".into(), self.camera.into());
        p
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_blend_applies_defaults() {
        let job = RenderBlend::new("/scenes/tree.blend").build();
        assert_eq!(job.kind(), JobKind::RenderBlend);
        assert_eq!(
            job.parameter(FIELD_RENDER_ENGINE).and_then(ParamValue::as_str),
            Some(DEFAULT_RENDER_ENGINE)
        );
        assert_eq!(
            job.parameter(FIELD_OUTPUT_FORMAT).and_then(ParamValue::as_str),
            Some("glb")
        );
        assert_eq!(
            job.parameter(FIELD_PREVIEW_ANGLES)
                .and_then(ParamValue::as_list)
                .map(<[String]>::len),
            Some(18)
        );
        assert!(job.parameter(FIELD_SCRIPT).is_some_and(ParamValue::is_null));
    }

    #[test]
    fn animation_render_maps_resolution_onto_preview_field() {
        let job = AnimationRender {
            resolution: 128,
            action_name: Some("Idle".into()),
            ..AnimationRender::new("/wolf.blend")
        }
        .build();
        assert_eq!(job.parameter(FIELD_PREVIEW_RESOLUTION), Some(&ParamValue::Int(128)));
        assert_eq!(job.parameter(FIELD_RENDER_ANIMATION), Some(&ParamValue::Bool(true)));
        assert_eq!(job.parameter(FIELD_ACTION_NAME), Some(&ParamValue::Text("Idle".into())));
        assert!(job.parameter(FIELD_FRAME_START).is_some_and(ParamValue::is_null));
    }

    #[test]
    fn scripted_run_carries_script_and_args() {
        let job = ScriptedRun {
            script_args: vec!["--flag".into()],
            ..ScriptedRun::new("/a.blend", "/tmp/s.py")
        }
        .build();
        assert_eq!(job.kind(), JobKind::ScriptedRun);
        assert_eq!(job.parameter(FIELD_SCRIPT), Some(&ParamValue::Text("/tmp/s.py".into())));
        assert_eq!(
            job.parameter(FIELD_SCRIPT_ARGS),
            Some(&ParamValue::List(vec!["--flag".into()]))
        );
    }

    #[test]
    fn biome_showcase_defaults() {
        let job = BiomeShowcase::new("tundra").build();
        let p = job.parameters();
        assert_eq!(p["camera"], ParamValue::Text("front".into()));
        assert_eq!(p["distance"], ParamValue::Float(48.0));
        assert_eq!(p["density"], ParamValue::Text("medium".into()));
        assert_eq!(p["seed"], ParamValue::Int(42));
        assert_eq!(p["hero_enemy"], ParamValue::Text(String::new()));
        assert_eq!(p["output_width"], ParamValue::Int(1024));
        assert_eq!(p["output_height"], ParamValue::Int(768));
        assert_eq!(p.len(), 13);
    }

    #[test]
    fn unknown_preset_strings_pass_through() {
        let job = BiomeShowcase {
            camera: "drone_orbit_v2".into(),
            density: "ludicrous".into(),
            ..BiomeShowcase::new("not_a_real_biome")
        }
        .build();
        assert_eq!(job.parameters()["camera"], ParamValue::Text("drone_orbit_v2".into()));
        assert_eq!(job.parameters()["biome"], ParamValue::Text("not_a_real_biome".into()));

        let job = RenderBlend {
            render_engine: "SOME_FUTURE_ENGINE".into(),
            ..RenderBlend::new("/x.blend")
        }
        .build();
        assert_eq!(
            job.parameter(FIELD_RENDER_ENGINE).and_then(ParamValue::as_str),
            Some("SOME_FUTURE_ENGINE")
        );
    }

    #[test]
    fn single_asset_and_capture_defaults() {
        let asset = SingleAsset::new("res://rock.glb", "desert").build();
        assert_eq!(asset.parameters()["camera"], ParamValue::Text(DEFAULT_ASSET_CAMERA.into()));
        assert_eq!(asset.parameters()["distance"], ParamValue::Float(24.0));
        assert_eq!(asset.parameters()["terrain_mode"], ParamValue::Text("flat".into()));

        let capture = AnimationCapture::new("res://wolf.glb", "run").build();
        assert_eq!(capture.kind(), JobKind::AnimationCapture);
        assert_eq!(capture.parameters()["fps"], ParamValue::Int(24));
    }

    #[test]
    fn build_with_id_keeps_caller_id() {
        let id = JobId::parse("abc123").expect("valid");
        let job = SingleAsset::new("res://rock.glb", "desert").build_with_id(id.clone());
        assert_eq!(job.job_id(), &id);
    }
}
