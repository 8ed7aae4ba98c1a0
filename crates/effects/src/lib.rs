#![deny(unsafe_code)]
//! Effect registry: maps effect names to configured animations drawing on a
//! CPU [`RasterCanvas`].
//!
//! This crate sits between `particle-fx-core` (which defines [`Effect`] and
//! the host capabilities) and the CLI. Every effect is a preset
//! [`FieldConfig`] (or [`FallingTextConfig`]) with JSON params merged on
//! top, so one dispatch point serves scenes, the CLI and tests.

pub mod font;
pub mod raster;

#[cfg(feature = "physics")]
pub mod falling_text;
#[cfg(feature = "physics")]
pub mod world;

#[cfg(feature = "png")]
pub mod snapshot;

use serde_json::Value;

use particle_fx_core::animation::{Animation, FrameInfo, TickError};
use particle_fx_core::color::Rgba;
use particle_fx_core::config::{FieldConfig, RadiusRange};
use particle_fx_core::effect::Effect;
use particle_fx_core::error::EngineError;
use particle_fx_core::field::Scatter;
use particle_fx_core::palette::{Coloring, Palette};
use particle_fx_core::params;
use particle_fx_core::particle::Mode;
use particle_fx_core::pointer::{PointerEvent, PointerStart};
use particle_fx_core::render::Bounds;
use particle_fx_core::scene::Scene;
use particle_fx_core::source::{Density, GridSource, ImageSource, PixelMask, Source, TextSource};
use particle_fx_core::trigger::TriggerPolicy;

#[cfg(feature = "physics")]
use falling_text::{FallingText, FallingTextConfig};
pub use raster::RasterCanvas;

#[cfg(feature = "physics")]
const EFFECT_NAMES: &[&str] = &["image-particle", "text-particle", "dot-matrix", "falling-text"];
#[cfg(not(feature = "physics"))]
const EFFECT_NAMES: &[&str] = &["image-particle", "text-particle", "dot-matrix"];

/// Params consumed by the registry rather than the effect config.
const REGISTRY_KEYS: &[&str] = &["background", "text", "image", "max_size", "palette", "trigger"];

const DARK_SLATE: &str = "#1f242d";

/// Every available effect, each drawing on its own canvas.
#[derive(Debug)]
pub enum EffectKind {
    /// An image decoded into gold particles that gather after half a second.
    ImageParticle(Effect<RasterCanvas>),
    /// Text rasterized into neon particles.
    TextParticle(Effect<RasterCanvas>),
    /// A dot and digit lattice lit around the pointer.
    DotMatrix(Effect<RasterCanvas>),
    #[cfg(feature = "physics")]
    FallingText(FallingText<RasterCanvas>),
}

impl EffectKind {
    /// Constructs an effect by name.
    ///
    /// Returns `EngineError::UnknownEffect` if the name is not recognized.
    /// `image-particle` needs an `image` path param and the `png` feature;
    /// use [`EffectKind::image_particle`] to pass a decoded mask instead.
    pub fn from_name(
        name: &str,
        width: usize,
        height: usize,
        seed: u64,
        params: &Value,
    ) -> Result<Self, EngineError> {
        if !(params.is_null() || params.is_object()) {
            return Err(EngineError::InvalidConfig(
                "params must be a JSON object".to_string(),
            ));
        }
        match name {
            "image-particle" => {
                let mask = load_image_param(params)?;
                Self::image_particle(mask, width, height, seed, params)
            }
            "text-particle" => {
                let text = params::param_str(params, "text").unwrap_or("hello.world");
                let canvas = canvas(width, height, params, "#000000")?;
                let config = text_preset().with_overrides(&overrides(params)?)?;
                let source = Source::Text(TextSource::new(text));
                Ok(EffectKind::TextParticle(Effect::new(
                    config, source, canvas, seed,
                )?))
            }
            "dot-matrix" => {
                let canvas = canvas(width, height, params, DARK_SLATE)?;
                let config = dot_matrix_preset().with_overrides(&overrides(params)?)?;
                let source = Source::Grid(GridSource::default());
                Ok(EffectKind::DotMatrix(Effect::new(
                    config, source, canvas, seed,
                )?))
            }
            #[cfg(feature = "physics")]
            "falling-text" => {
                let canvas = canvas(width, height, params, DARK_SLATE)?;
                let mut config = FallingTextConfig::default().with_overrides(&overrides(params)?)?;
                if let Some(text) = params::param_str(params, "text") {
                    config.text = text.to_string();
                }
                Ok(EffectKind::FallingText(FallingText::new(config, canvas, seed)?))
            }
            _ => Err(EngineError::UnknownEffect(name.to_string())),
        }
    }

    /// The image-particle effect over an already decoded image.
    pub fn image_particle(
        mask: PixelMask,
        width: usize,
        height: usize,
        seed: u64,
        params: &Value,
    ) -> Result<Self, EngineError> {
        let canvas = canvas(width, height, params, DARK_SLATE)?;
        let config = image_preset().with_overrides(&overrides(params)?)?;
        let mut image = ImageSource::new(mask);
        if let Some(max) = params.get("max_size").and_then(Value::as_u64) {
            image = image.with_max_size(max as usize);
        }
        Ok(EffectKind::ImageParticle(Effect::new(
            config,
            Source::Image(image),
            canvas,
            seed,
        )?))
    }

    /// Builds the effect a scene names, at the scene's size and seed.
    pub fn from_scene(scene: &Scene) -> Result<Self, EngineError> {
        scene.validate()?;
        Self::from_name(
            &scene.effect,
            scene.width,
            scene.height,
            scene.seed,
            &scene.params,
        )
    }

    /// Returns a slice of all recognized effect names.
    pub fn list_effects() -> &'static [&'static str] {
        EFFECT_NAMES
    }

    pub fn name(&self) -> &'static str {
        match self {
            EffectKind::ImageParticle(_) => "image-particle",
            EffectKind::TextParticle(_) => "text-particle",
            EffectKind::DotMatrix(_) => "dot-matrix",
            #[cfg(feature = "physics")]
            EffectKind::FallingText(_) => "falling-text",
        }
    }

    pub fn canvas(&self) -> &RasterCanvas {
        match self {
            EffectKind::ImageParticle(e)
            | EffectKind::TextParticle(e)
            | EffectKind::DotMatrix(e) => e.target(),
            #[cfg(feature = "physics")]
            EffectKind::FallingText(e) => e.target(),
        }
    }

    /// The last rendered frame over the effect's background.
    pub fn frame(&self) -> PixelMask {
        self.canvas().flattened()
    }
}

impl Animation for EffectKind {
    fn tick(&mut self, frame: FrameInfo) -> Result<(), TickError> {
        match self {
            EffectKind::ImageParticle(e)
            | EffectKind::TextParticle(e)
            | EffectKind::DotMatrix(e) => e.tick(frame),
            #[cfg(feature = "physics")]
            EffectKind::FallingText(e) => e.tick(frame),
        }
    }

    fn resize(&mut self, bounds: Bounds) -> Result<(), EngineError> {
        match self {
            EffectKind::ImageParticle(e)
            | EffectKind::TextParticle(e)
            | EffectKind::DotMatrix(e) => e.resize(bounds),
            #[cfg(feature = "physics")]
            EffectKind::FallingText(e) => e.resize(bounds),
        }
    }

    fn pointer(&mut self, event: PointerEvent) {
        match self {
            EffectKind::ImageParticle(e)
            | EffectKind::TextParticle(e)
            | EffectKind::DotMatrix(e) => e.pointer(event),
            #[cfg(feature = "physics")]
            EffectKind::FallingText(e) => e.pointer(event),
        }
    }

    fn visibility(&mut self, fraction: f64) {
        match self {
            EffectKind::ImageParticle(e)
            | EffectKind::TextParticle(e)
            | EffectKind::DotMatrix(e) => e.visibility(fraction),
            #[cfg(feature = "physics")]
            EffectKind::FallingText(e) => e.visibility(fraction),
        }
    }
}

fn image_preset() -> FieldConfig {
    FieldConfig {
        trigger: TriggerPolicy::Timer { delay_ms: 500 },
        scatter: Scatter::Targets { spread: 20.0 },
        ..FieldConfig::default()
    }
}

fn text_preset() -> FieldConfig {
    FieldConfig {
        density: Density::Columns(200),
        mode: Mode::Converging,
        alpha_threshold: 200,
        palette: Palette::neon(),
        coloring: Coloring::Random,
        radius: RadiusRange { min: 1.0, max: 4.0 },
        scatter: Scatter::Canvas,
        convergence_factor: 0.03,
        pointer_radius: 75.0,
        pointer_strength: 1.5,
        friction: 0.95,
        ..FieldConfig::default()
    }
}

fn dot_matrix_preset() -> FieldConfig {
    FieldConfig {
        density: Density::Columns(24),
        mode: Mode::Converging,
        pointer_radius: 250.0,
        pointer_strength: 0.0,
        glow: true,
        radius: RadiusRange::fixed(5.0),
        glyph_size: 18.0,
        glyph_ratio: 0.3,
        palette: Palette::matrix(),
        coloring: Coloring::ByShape,
        pointer_start: PointerStart::Center,
        scatter: Scatter::None,
        ..FieldConfig::default()
    }
}

fn canvas(
    width: usize,
    height: usize,
    params: &Value,
    default_background: &str,
) -> Result<RasterCanvas, EngineError> {
    let background = params::param_str(params, "background").unwrap_or(default_background);
    RasterCanvas::new(width, height, Rgba::from_hex(background)?)
}

/// Config overrides from `params`: registry keys dropped, palette and
/// trigger names expanded into their config form.
fn overrides(params: &Value) -> Result<Value, EngineError> {
    let mut out = params::without(params, REGISTRY_KEYS);
    match params.get("palette") {
        Some(Value::String(name)) => {
            out["palette"] = serde_json::to_value(Palette::from_name(name)?)?;
        }
        Some(other) => out["palette"] = other.clone(),
        None => {}
    }
    match params.get("trigger") {
        Some(Value::String(name)) => {
            let policy = TriggerPolicy::from_name(name)
                .ok_or_else(|| EngineError::InvalidConfig(format!("unknown trigger '{name}'")))?;
            out["trigger"] = serde_json::to_value(policy)?;
        }
        Some(other) => out["trigger"] = other.clone(),
        None => {}
    }
    Ok(out)
}

#[cfg(feature = "png")]
fn load_image_param(params: &Value) -> Result<PixelMask, EngineError> {
    let path = params::param_str(params, "image").ok_or_else(|| {
        EngineError::InvalidConfig("image-particle needs an `image` path param".to_string())
    })?;
    snapshot::load_mask(std::path::Path::new(path))
}

#[cfg(not(feature = "png"))]
fn load_image_param(_params: &Value) -> Result<PixelMask, EngineError> {
    Err(EngineError::InvalidConfig(
        "image-particle by path needs the `png` feature".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use particle_fx_core::animation::ManualScheduler;
    use particle_fx_core::mount::Mount;
    use particle_fx_core::vector::Vector2;
    use serde_json::json;

    fn logo() -> PixelMask {
        let mut mask = PixelMask::new(20, 20).unwrap();
        for y in 5..15 {
            for x in 5..15 {
                mask.set_pixel(x, y, Rgba::rgb(240, 200, 60));
            }
        }
        mask
    }

    fn field_len(kind: &EffectKind) -> usize {
        match kind {
            EffectKind::ImageParticle(e)
            | EffectKind::TextParticle(e)
            | EffectKind::DotMatrix(e) => e.field().len(),
            #[cfg(feature = "physics")]
            EffectKind::FallingText(e) => e.words().len(),
        }
    }

    #[test]
    fn from_name_builds_every_listed_effect_but_image() {
        for name in EffectKind::list_effects() {
            if *name == "image-particle" {
                continue;
            }
            let kind = EffectKind::from_name(name, 120, 80, 42, &json!({})).unwrap();
            assert_eq!(kind.name(), *name);
            assert!(field_len(&kind) > 0, "{name} is empty");
        }
    }

    #[test]
    fn from_name_unknown_returns_error() {
        let result = EffectKind::from_name("nonexistent", 32, 32, 42, &json!({}));
        assert!(matches!(result, Err(EngineError::UnknownEffect(_))));
    }

    #[test]
    fn image_particle_needs_an_image() {
        let result = EffectKind::from_name("image-particle", 32, 32, 42, &json!({}));
        assert!(matches!(result, Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn image_particle_from_mask() {
        let kind = EffectKind::image_particle(logo(), 40, 40, 1, &json!({})).unwrap();
        assert!(field_len(&kind) > 0);
        assert_eq!(kind.canvas().background(), Rgba::from_hex(DARK_SLATE).unwrap());
    }

    #[test]
    fn params_override_presets() {
        let kind = EffectKind::from_name(
            "dot-matrix",
            100,
            100,
            1,
            &json!({"density": {"columns": 5}, "background": "#ffffff"}),
        )
        .unwrap();
        // a 5 column lattice over 100 px has 6 points per side
        assert_eq!(field_len(&kind), 36);
        assert_eq!(kind.canvas().background(), Rgba::WHITE);
    }

    #[test]
    fn palette_and_trigger_accept_names() {
        let kind = EffectKind::image_particle(
            logo(),
            40,
            40,
            1,
            &json!({"palette": "mono", "coloring": {"kind": "cycle"}, "trigger": "click"}),
        )
        .unwrap();
        let EffectKind::ImageParticle(effect) = kind else {
            panic!("wrong kind");
        };
        assert_eq!(effect.config().palette, Palette::mono());
        assert_eq!(effect.config().trigger, TriggerPolicy::Click);
    }

    #[test]
    fn bad_params_are_rejected() {
        let unknown_trigger =
            EffectKind::from_name("dot-matrix", 10, 10, 1, &json!({"trigger": "never"}));
        assert!(matches!(unknown_trigger, Err(EngineError::InvalidConfig(_))));
        let unknown_palette =
            EffectKind::from_name("dot-matrix", 10, 10, 1, &json!({"palette": "nope"}));
        assert!(unknown_palette.is_err());
        let not_object = EffectKind::from_name("dot-matrix", 10, 10, 1, &json!([1, 2]));
        assert!(matches!(not_object, Err(EngineError::InvalidConfig(_))));
        let bad_color =
            EffectKind::from_name("dot-matrix", 10, 10, 1, &json!({"background": "red"}));
        assert!(matches!(bad_color, Err(EngineError::InvalidColor(_))));
    }

    #[test]
    fn zero_size_is_rejected() {
        let result = EffectKind::from_name("dot-matrix", 0, 10, 1, &json!({}));
        assert!(matches!(result, Err(EngineError::InvalidDimensions)));
    }

    #[test]
    fn determinism_same_seed() {
        let run = || {
            let kind = EffectKind::from_name("text-particle", 160, 60, 99, &json!({})).unwrap();
            let mut mount = Mount::new(ManualScheduler::default(), kind);
            mount.run_frames(10).unwrap();
            mount.unmount().unwrap().frame()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn rendered_frames_show_particles_over_background() {
        let kind = EffectKind::image_particle(logo(), 40, 40, 3, &json!({})).unwrap();
        let mut mount = Mount::new(ManualScheduler::default(), kind);
        mount.run_frames(5).unwrap();
        let kind = mount.unmount().unwrap();
        let background = kind.canvas().background();
        let frame = kind.frame();
        assert_eq!(frame.coverage(254), 40 * 40);
        let lit = (0..40)
            .flat_map(|y| (0..40).map(move |x| (x, y)))
            .filter(|&(x, y)| frame.pixel(x, y) != Some(background))
            .count();
        assert!(lit > 0);
    }

    #[test]
    fn from_scene_uses_scene_size() {
        let mut scene = Scene::new("dot-matrix", 64, 48, 5);
        scene.params = json!({"density": {"columns": 4}});
        let kind = EffectKind::from_scene(&scene).unwrap();
        assert_eq!(kind.canvas().pixels().width(), 64);
        assert_eq!(kind.canvas().pixels().height(), 48);
    }

    #[test]
    fn animation_delegates_pointer_and_resize() {
        let mut kind = EffectKind::from_name("dot-matrix", 100, 100, 1, &json!({})).unwrap();
        kind.pointer(PointerEvent::Move(Vector2::new(10.0, 10.0)));
        kind.visibility(0.5);
        kind.resize(Bounds::new(50.0, 30.0).unwrap()).unwrap();
        assert_eq!(kind.canvas().pixels().width(), 50);
    }

    #[test]
    fn object_safety() {
        let kind = EffectKind::from_name("dot-matrix", 16, 16, 42, &json!({})).unwrap();
        let mut boxed: Box<dyn Animation> = Box::new(kind);
        boxed
            .tick(FrameInfo {
                timestamp: 0.0,
                dt: 1.0 / 60.0,
                index: 0,
            })
            .unwrap();
    }

    #[cfg(feature = "png")]
    #[test]
    fn image_particle_loads_path_param() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logo.png");
        snapshot::write_png(&logo(), &path).unwrap();
        let kind = EffectKind::from_name(
            "image-particle",
            40,
            40,
            1,
            &json!({"image": path.to_str().unwrap(), "max_size": 10}),
        )
        .unwrap();
        assert!(field_len(&kind) > 0);
    }

    #[cfg(feature = "physics")]
    #[test]
    fn falling_text_takes_text_param() {
        let kind = EffectKind::from_name(
            "falling-text",
            300,
            200,
            1,
            &json!({"text": "one two three", "gravity": 0.5, "palette": "neon"}),
        )
        .unwrap();
        let EffectKind::FallingText(fx) = kind else {
            panic!("wrong kind");
        };
        assert_eq!(fx.words().len(), 3);
        assert_eq!(fx.config().gravity, 0.5);
        assert_eq!(fx.config().palette, Palette::neon());
    }
}
