//! Words that drop, tumble and bounce once triggered.
//!
//! The text is laid out as centered, wrapped lines of word boxes. Until the
//! trigger fires the words sit in that layout; afterwards each word is a
//! rigid box in a [`PhysicsWorld`] (a [`RapierWorld`] unless another is
//! chosen) and the pointer shoves nearby words away.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use particle_fx_core::animation::{Animation, FrameInfo, TickError};
use particle_fx_core::color::Rgba;
use particle_fx_core::error::EngineError;
use particle_fx_core::palette::Palette;
use particle_fx_core::params;
use particle_fx_core::particle::FRAME_SECONDS;
use particle_fx_core::physics::{BodySpec, BodyState, Material, PhysicsWorld, WorldSetup};
use particle_fx_core::pointer::{PointerEvent, PointerTracker};
use particle_fx_core::prng::Xorshift64;
use particle_fx_core::render::{Bounds, RenderTarget, TextStyle};
use particle_fx_core::trigger::{Signals, Trigger, TriggerPolicy};
use particle_fx_core::vector::{self, Vector2};

use crate::font;
use crate::world::RapierWorld;

/// Space above the first line, in pixels.
const TOP_PADDING: f64 = 32.0;
/// Word box padding and spacing, as fractions of the font size.
const PAD_X: f64 = 0.5;
const PAD_Y: f64 = 0.25;
const GAP: f64 = 0.25;
/// Largest initial sideways speed, pixels per second.
const MAX_SPREAD: f64 = 150.0;
/// Largest initial spin, radians per second.
const MAX_SPIN: f64 = 1.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FallingTextConfig {
    pub text: String,
    pub font_size: f64,
    /// Multiple of Earth gravity.
    pub gravity: f64,
    pub restitution: f64,
    pub friction: f64,
    pub air_friction: f64,
    pub trigger: TriggerPolicy,
    pub palette: Palette,
    pub pointer_radius: f64,
    /// Velocity change, in pixels per second per frame, for a word right
    /// under the pointer.
    pub pointer_strength: f64,
    pub wall_thickness: f64,
}

impl Default for FallingTextConfig {
    fn default() -> Self {
        Self {
            text: "JavaScript TypeScript React Vue Next.js Node.js Tailwind Git Docker Linux"
                .to_string(),
            font_size: 24.0,
            gravity: 1.0,
            restitution: 0.8,
            friction: 0.2,
            air_friction: 0.01,
            trigger: TriggerPolicy::Immediate,
            palette: Palette::pastel(),
            pointer_radius: 80.0,
            pointer_strength: 60.0,
            wall_thickness: 50.0,
        }
    }
}

fn check(ok: bool, msg: impl FnOnce() -> String) -> Result<(), EngineError> {
    if ok {
        Ok(())
    } else {
        Err(EngineError::InvalidConfig(msg()))
    }
}

impl FallingTextConfig {
    /// Returns a copy with `overrides` (a JSON object) merged on top.
    pub fn with_overrides(&self, overrides: &Value) -> Result<Self, EngineError> {
        if overrides.is_null() {
            return Ok(self.clone());
        }
        if !overrides.is_object() {
            return Err(EngineError::InvalidConfig(
                "overrides must be a JSON object".to_string(),
            ));
        }
        let mut merged = serde_json::to_value(self)?;
        params::merge(&mut merged, overrides);
        let config: Self = serde_json::from_value(merged)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        let fs = self.font_size;
        check(fs.is_finite() && fs > 0.0, || {
            format!("font_size must be finite and > 0, got {fs}")
        })?;
        let g = self.gravity;
        check(g.is_finite(), || format!("gravity must be finite, got {g}"))?;
        let e = self.restitution;
        check((0.0..=1.0).contains(&e), || {
            format!("restitution must be in [0, 1], got {e}")
        })?;
        let f = self.friction;
        check(f.is_finite() && f >= 0.0, || {
            format!("friction must be finite and >= 0, got {f}")
        })?;
        let a = self.air_friction;
        check((0.0..1.0).contains(&a), || {
            format!("air_friction must be in [0, 1), got {a}")
        })?;
        let r = self.pointer_radius;
        check(r.is_finite() && r >= 0.0, || {
            format!("pointer_radius must be finite and >= 0, got {r}")
        })?;
        let s = self.pointer_strength;
        check(s.is_finite(), || {
            format!("pointer_strength must be finite, got {s}")
        })?;
        let t = self.wall_thickness;
        check(t.is_finite() && t > 0.0, || {
            format!("wall_thickness must be finite and > 0, got {t}")
        })?;
        if let TriggerPolicy::Visibility { threshold, .. } = self.trigger {
            check((0.0..=1.0).contains(&threshold), || {
                format!("visibility threshold must be in [0, 1], got {threshold}")
            })?;
        }
        Ok(())
    }

    fn material(&self) -> Material {
        Material {
            restitution: self.restitution,
            friction: self.friction,
            air_friction: self.air_friction,
        }
    }
}

/// A word and the box it rests in before physics takes over.
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub text: String,
    pub color: Rgba,
    pub center: Vector2,
    pub half_extents: Vector2,
}

/// Centers and half extents of word boxes, wrapped to `width` and centered
/// line by line. A word wider than a line gets a line of its own.
pub fn layout(words: &[&str], font_size: f64, width: f64) -> Vec<(Vector2, Vector2)> {
    let gap = font_size * GAP;
    let height = font_size * (1.0 + 2.0 * PAD_Y);
    let widths: Vec<f64> = words
        .iter()
        .map(|w| font::text_width(w, font_size) + 2.0 * font_size * PAD_X)
        .collect();

    let mut lines: Vec<Vec<usize>> = Vec::new();
    let mut line_width = 0.0;
    for (i, w) in widths.iter().enumerate() {
        match lines.last_mut() {
            Some(line) if line_width + gap + w <= width => {
                line.push(i);
                line_width += gap + w;
            }
            _ => {
                lines.push(vec![i]);
                line_width = *w;
            }
        }
    }

    let mut boxes = vec![(Vector2::ZERO, Vector2::ZERO); words.len()];
    for (row, line) in lines.iter().enumerate() {
        let total: f64 = line.iter().map(|&i| widths[i]).sum::<f64>()
            + gap * (line.len().saturating_sub(1)) as f64;
        let y = TOP_PADDING + row as f64 * (height + gap) + height / 2.0;
        let mut x = (width - total) / 2.0;
        for &i in line {
            boxes[i] = (
                Vector2::new(x + widths[i] / 2.0, y),
                Vector2::new(widths[i] / 2.0, height / 2.0),
            );
            x += widths[i] + gap;
        }
    }
    boxes
}

/// One color per word: palette order while it lasts, random picks after.
pub fn word_colors(count: usize, palette: &Palette, rng: &mut Xorshift64) -> Vec<Rgba> {
    (0..count)
        .map(|i| {
            palette
                .colors()
                .get(i)
                .copied()
                .unwrap_or_else(|| palette.pick(rng))
        })
        .collect()
}

#[derive(Debug)]
pub struct FallingText<R, W = RapierWorld> {
    config: FallingTextConfig,
    target: R,
    words: Vec<Word>,
    world: Option<W>,
    pointer: PointerTracker,
    trigger: Trigger,
    rng: Xorshift64,
    seed: u64,
    started_at: Option<f64>,
    visible_fraction: f64,
}

impl<R: RenderTarget, W: PhysicsWorld> FallingText<R, W> {
    pub fn new(config: FallingTextConfig, target: R, seed: u64) -> Result<Self, EngineError> {
        config.validate()?;
        let mut rng = Xorshift64::new(seed);
        let words = build_words(&config, target.bounds(), &mut rng);
        let trigger = Trigger::new(config.trigger);
        Ok(Self {
            config,
            target,
            words,
            world: None,
            pointer: PointerTracker::default(),
            trigger,
            rng,
            seed,
            started_at: None,
            visible_fraction: 1.0,
        })
    }

    pub fn config(&self) -> &FallingTextConfig {
        &self.config
    }

    pub fn words(&self) -> &[Word] {
        &self.words
    }

    /// Whether the trigger has fired and physics is running.
    pub fn is_falling(&self) -> bool {
        self.world.is_some()
    }

    /// Current pose of every word.
    pub fn poses(&self) -> Vec<BodyState> {
        match &self.world {
            Some(world) => world.bodies(),
            None => self
                .words
                .iter()
                .map(|w| BodyState {
                    position: w.center,
                    rotation: 0.0,
                })
                .collect(),
        }
    }

    pub fn target(&self) -> &R {
        &self.target
    }

    pub fn target_mut(&mut self) -> &mut R {
        &mut self.target
    }

    /// The running world, once the trigger has fired.
    pub fn world(&self) -> Option<&W> {
        self.world.as_ref()
    }

    pub fn pointer_tracker_mut(&mut self) -> &mut PointerTracker {
        &mut self.pointer
    }

    pub fn into_target(self) -> R {
        self.target
    }

    fn start(&mut self) {
        let specs: Vec<BodySpec> = self
            .words
            .iter()
            .map(|w| BodySpec {
                center: w.center,
                half_extents: w.half_extents,
                velocity: Vector2::new(self.rng.next_signed(MAX_SPREAD), 0.0),
                angular_velocity: self.rng.next_signed(MAX_SPIN),
            })
            .collect();
        self.world = Some(W::create(&WorldSetup {
            bounds: self.target.bounds(),
            gravity: self.config.gravity,
            wall_thickness: self.config.wall_thickness,
            material: self.config.material(),
            bodies: &specs,
        }));
        debug!(words = specs.len(), "falling text started");
    }

    /// Pushes words within the pointer radius away from the pointer,
    /// harder the closer they are.
    fn repel(&mut self, frames: f64) {
        let pointer = self.pointer.snapshot();
        let radius = self.config.pointer_radius;
        let Some(world) = self.world.as_mut() else {
            return;
        };
        if !pointer.active || radius <= 0.0 {
            return;
        }
        for (i, body) in world.bodies().iter().enumerate() {
            let d = body.position.distance(pointer.position);
            if d < radius {
                let push = vector::direction(pointer.position, body.position)
                    * self.config.pointer_strength
                    * (1.0 - d / radius)
                    * frames;
                world.apply_impulse(i, push);
            }
        }
    }
}

fn build_words(config: &FallingTextConfig, bounds: Bounds, rng: &mut Xorshift64) -> Vec<Word> {
    let texts: Vec<&str> = config.text.split_whitespace().collect();
    let boxes = layout(&texts, config.font_size, bounds.width);
    let colors = word_colors(texts.len(), &config.palette, rng);
    texts
        .into_iter()
        .zip(boxes)
        .zip(colors)
        .map(|((text, (center, half_extents)), color)| Word {
            text: text.to_string(),
            color,
            center,
            half_extents,
        })
        .collect()
}

impl<R: RenderTarget, W: PhysicsWorld> Animation for FallingText<R, W> {
    fn tick(&mut self, frame: FrameInfo) -> Result<(), TickError> {
        let started = *self.started_at.get_or_insert(frame.timestamp);
        let signals = Signals {
            elapsed_ms: frame.timestamp - started,
            visible_fraction: self.visible_fraction,
            pointer_active: self.pointer.is_active(),
            pressed: self.pointer.take_press(),
        };
        if self.trigger.activate(&signals) && self.world.is_none() {
            self.start();
        }
        self.repel(frame.dt / FRAME_SECONDS);
        if let Some(world) = self.world.as_mut() {
            world.advance(frame.dt);
        }

        self.target.clear()?;
        for (word, pose) in self.words.iter().zip(self.poses()) {
            let style = TextStyle::new(self.config.font_size, word.color).rotated(pose.rotation);
            self.target.draw_text(&word.text, pose.position, style)?;
        }
        Ok(())
    }

    /// Lays the words out again for the new size. Words that were already
    /// falling restart from the new layout.
    fn resize(&mut self, bounds: Bounds) -> Result<(), EngineError> {
        self.target.resize(bounds)?;
        self.rng = Xorshift64::new(self.seed);
        self.words = build_words(&self.config, bounds, &mut self.rng);
        if self.world.is_some() {
            self.start();
        }
        Ok(())
    }

    fn pointer(&mut self, event: PointerEvent) {
        self.pointer.handle(event);
    }

    fn visibility(&mut self, fraction: f64) {
        self.visible_fraction = if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::RasterCanvas;
    use particle_fx_core::physics::testing::DriftWorld;

    fn frame(index: u64) -> FrameInfo {
        FrameInfo {
            timestamp: index as f64 * 1000.0 * FRAME_SECONDS,
            dt: FRAME_SECONDS,
            index,
        }
    }

    fn falling(config: FallingTextConfig) -> FallingText<RasterCanvas> {
        let canvas = RasterCanvas::new(400, 300, Rgba::TRANSPARENT).unwrap();
        FallingText::new(config, canvas, 7).unwrap()
    }

    fn drifting(config: FallingTextConfig) -> FallingText<RasterCanvas, DriftWorld> {
        let canvas = RasterCanvas::new(400, 300, Rgba::TRANSPARENT).unwrap();
        FallingText::new(config, canvas, 7).unwrap()
    }

    fn mean_y(fx: &FallingText<RasterCanvas>) -> f64 {
        let poses = fx.poses();
        poses.iter().map(|p| p.position.y).sum::<f64>() / poses.len() as f64
    }

    #[test]
    fn layout_wraps_and_centers_lines() {
        // each "ABC" box: 17 units of 2 px + 14 px padding = 48 px
        let boxes = layout(&["ABC", "ABC", "ABC"], 14.0, 110.0);
        assert_eq!(boxes.len(), 3);
        // two fit on the first line (48 + 3.5 + 48), the third wraps
        assert_eq!(boxes[0].0.y, boxes[1].0.y);
        assert!(boxes[2].0.y > boxes[0].0.y);
        let first_line_mid = (boxes[0].0.x + boxes[1].0.x) / 2.0;
        assert!((first_line_mid - 55.0).abs() < 1e-9);
        assert!((boxes[2].0.x - 55.0).abs() < 1e-9);
        assert!((boxes[0].1.x - 24.0).abs() < 1e-9);
    }

    #[test]
    fn layout_gives_oversized_words_their_own_line() {
        let boxes = layout(&["A", "WIDEWIDEWIDE", "A"], 14.0, 60.0);
        let rows: Vec<f64> = boxes.iter().map(|(c, _)| c.y).collect();
        assert!(rows[0] < rows[1] && rows[1] < rows[2]);
    }

    #[test]
    fn colors_follow_palette_then_pick_from_it() {
        let palette = Palette::pastel();
        let mut rng = Xorshift64::new(1);
        let colors = word_colors(palette.len() + 4, &palette, &mut rng);
        assert_eq!(&colors[..palette.len()], palette.colors());
        assert!(colors[palette.len()..]
            .iter()
            .all(|c| palette.colors().contains(c)));

        let few = word_colors(2, &palette, &mut rng);
        assert_eq!(few, palette.colors()[..2].to_vec());
    }

    #[test]
    fn words_rest_until_click() {
        let mut fx = drifting(FallingTextConfig {
            trigger: TriggerPolicy::Click,
            ..FallingTextConfig::default()
        });
        let resting = fx.poses();
        for i in 0..10 {
            fx.tick(frame(i)).unwrap();
        }
        assert!(!fx.is_falling());
        assert_eq!(fx.poses(), resting);

        fx.pointer(PointerEvent::Press(Vector2::new(200.0, 150.0)));
        fx.tick(frame(10)).unwrap();
        assert!(fx.is_falling());
        assert_eq!(fx.world().unwrap().elapsed, FRAME_SECONDS);
    }

    #[test]
    fn bodies_start_at_word_boxes_with_bounded_spread() {
        let mut fx = drifting(FallingTextConfig::default());
        fx.tick(frame(0)).unwrap();
        let specs = &fx.world().unwrap().specs;
        assert_eq!(specs.len(), fx.words().len());
        for (spec, word) in specs.iter().zip(fx.words()) {
            assert_eq!(spec.center, word.center);
            assert_eq!(spec.half_extents, word.half_extents);
            assert_eq!(spec.velocity.y, 0.0);
            assert!(spec.velocity.x.abs() <= MAX_SPREAD);
            assert!(spec.angular_velocity.abs() <= MAX_SPIN);
        }
    }

    #[test]
    fn poses_come_from_the_world_once_falling() {
        let mut fx = drifting(FallingTextConfig::default());
        for i in 0..6 {
            fx.tick(frame(i)).unwrap();
        }
        let expected = fx.world().unwrap().bodies();
        assert_eq!(fx.poses(), expected);
        // 6 frames at 100 px/s
        let drop = expected[0].position.y - fx.words()[0].center.y;
        assert!((drop - 10.0).abs() < 1e-9, "drop = {drop}");
    }

    #[test]
    fn pointer_impulse_scales_with_proximity() {
        let mut fx = drifting(FallingTextConfig {
            text: "PUSH".to_string(),
            ..FallingTextConfig::default()
        });
        let word = fx.words()[0].center;
        fx.pointer(PointerEvent::Move(word - Vector2::new(20.0, 0.0)));
        fx.tick(frame(0)).unwrap();

        let impulses = &fx.world().unwrap().impulses;
        assert_eq!(impulses.len(), 1);
        let (index, push) = impulses[0];
        assert_eq!(index, 0);
        // strength 60 at a quarter of the way into an 80 px radius
        assert!((push.x - 45.0).abs() < 1e-9, "push = {push:?}");
        assert!(push.y.abs() < 1e-9);
    }

    #[test]
    fn words_outside_radius_or_without_pointer_are_left_alone() {
        let mut fx = drifting(FallingTextConfig {
            text: "PUSH".to_string(),
            ..FallingTextConfig::default()
        });
        fx.tick(frame(0)).unwrap();
        let word = fx.words()[0].center;
        fx.pointer(PointerEvent::Move(word + Vector2::new(500.0, 0.0)));
        fx.tick(frame(1)).unwrap();
        fx.pointer(PointerEvent::Leave);
        fx.tick(frame(2)).unwrap();
        assert!(fx.world().unwrap().impulses.is_empty());
    }

    #[test]
    fn words_fall_and_stay_on_the_surface() {
        let mut fx = falling(FallingTextConfig {
            restitution: 0.0,
            ..FallingTextConfig::default()
        });
        let before = mean_y(&fx);
        for i in 0..120 {
            fx.tick(frame(i)).unwrap();
        }
        assert!(mean_y(&fx) > before + 30.0);
        for pose in fx.poses() {
            assert!((-5.0..=405.0).contains(&pose.position.x), "{pose:?}");
            assert!((-5.0..=305.0).contains(&pose.position.y), "{pose:?}");
        }
    }

    #[test]
    fn pointer_shoves_nearby_words() {
        let config = FallingTextConfig {
            text: "PUSH".to_string(),
            gravity: 0.0,
            ..FallingTextConfig::default()
        };
        let mut calm = falling(config.clone());
        let mut shoved = falling(config);
        let word = shoved.words()[0].center;
        shoved.pointer(PointerEvent::Move(word - Vector2::new(20.0, 0.0)));
        for i in 0..20 {
            calm.tick(frame(i)).unwrap();
            shoved.tick(frame(i)).unwrap();
        }
        let dx = shoved.poses()[0].position.x - calm.poses()[0].position.x;
        assert!(dx > 5.0, "dx = {dx}");
    }

    #[test]
    fn each_word_is_drawn() {
        let mut fx = falling(FallingTextConfig {
            text: "HELLO WORLD".to_string(),
            ..FallingTextConfig::default()
        });
        fx.tick(frame(0)).unwrap();
        assert!(fx.target().pixels().coverage(0) > 0);
        assert_eq!(fx.words().len(), 2);
    }

    #[test]
    fn resize_relays_out_words() {
        let mut fx = drifting(FallingTextConfig::default());
        for i in 0..5 {
            fx.tick(frame(i)).unwrap();
        }
        fx.resize(Bounds::new(200.0, 600.0).unwrap()).unwrap();
        assert!(fx.is_falling());
        assert!(fx.words().iter().all(|w| w.center.x < 200.0));
        assert_eq!(fx.target().pixels().width(), 200);

        // the world is rebuilt from the new layout
        let world = fx.world().unwrap();
        assert_eq!(world.elapsed, 0.0);
        let centers: Vec<Vector2> = world.specs.iter().map(|s| s.center).collect();
        let words: Vec<Vector2> = fx.words().iter().map(|w| w.center).collect();
        assert_eq!(centers, words);
    }

    #[test]
    fn resize_before_trigger_keeps_words_resting() {
        let mut fx = drifting(FallingTextConfig {
            trigger: TriggerPolicy::Click,
            ..FallingTextConfig::default()
        });
        fx.resize(Bounds::new(200.0, 600.0).unwrap()).unwrap();
        assert!(!fx.is_falling());
        assert!(fx.world().is_none());
    }

    #[test]
    fn overrides_are_validated() {
        let base = FallingTextConfig::default();
        let tuned = base
            .with_overrides(&serde_json::json!({"gravity": 0.5, "text": "a b"}))
            .unwrap();
        assert_eq!(tuned.gravity, 0.5);
        assert!(base
            .with_overrides(&serde_json::json!({"air_friction": 1.0}))
            .is_err());
        assert!(base
            .with_overrides(&serde_json::json!({"bogus": 1}))
            .is_err());
    }

    #[test]
    fn empty_text_has_no_words() {
        let mut fx = falling(FallingTextConfig {
            text: "   ".to_string(),
            ..FallingTextConfig::default()
        });
        fx.tick(frame(0)).unwrap();
        assert!(fx.words().is_empty());
        assert!(fx.poses().is_empty());
    }
}
