//! A particle field wired to its inputs and drawing surface.

use tracing::{debug, warn};

use crate::animation::{Animation, FrameInfo, TickError};
use crate::config::FieldConfig;
use crate::error::EngineError;
use crate::field::Field;
use crate::pointer::{PointerEvent, PointerStart, PointerTracker};
use crate::render::{Bounds, RenderTarget};
use crate::source::Source;
use crate::trigger::{Signals, Trigger};
use crate::vector::Vector2;

/// Field + pointer + trigger + surface, driven as one [`Animation`].
#[derive(Debug)]
pub struct Effect<R> {
    config: FieldConfig,
    source: Source,
    target: R,
    field: Field,
    pointer: PointerTracker,
    trigger: Trigger,
    seed: u64,
    started_at: Option<f64>,
    visible_fraction: f64,
}

impl<R: RenderTarget> Effect<R> {
    /// Builds the field at the target's current size.
    ///
    /// Configuration and source errors are returned here; nothing is
    /// scheduled until the effect is handed to a loop.
    pub fn new(
        config: FieldConfig,
        source: Source,
        mut target: R,
        seed: u64,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let bounds = target.bounds();
        let field = Field::build(&source, &config, bounds, &mut target, seed)?;
        let pointer = start_pointer(config.pointer_start, Vector2::ZERO, bounds);
        let trigger = Trigger::new(config.trigger);
        Ok(Self {
            config,
            source,
            target,
            field,
            pointer,
            trigger,
            seed,
            started_at: None,
            visible_fraction: 1.0,
        })
    }

    pub fn field(&self) -> &Field {
        &self.field
    }

    pub fn config(&self) -> &FieldConfig {
        &self.config
    }

    pub fn target(&self) -> &R {
        &self.target
    }

    pub fn target_mut(&mut self) -> &mut R {
        &mut self.target
    }

    pub fn pointer_tracker(&self) -> &PointerTracker {
        &self.pointer
    }

    pub fn pointer_tracker_mut(&mut self) -> &mut PointerTracker {
        &mut self.pointer
    }

    pub fn trigger(&self) -> &Trigger {
        &self.trigger
    }

    /// Releases the drawing surface.
    pub fn into_target(self) -> R {
        self.target
    }
}

fn start_pointer(start: PointerStart, origin: Vector2, bounds: Bounds) -> PointerTracker {
    match start {
        PointerStart::Inactive => PointerTracker::new(origin),
        PointerStart::Center => PointerTracker::centered(origin, bounds.center()),
    }
}

impl<R: RenderTarget> Animation for Effect<R> {
    fn tick(&mut self, frame: FrameInfo) -> Result<(), TickError> {
        let started = *self.started_at.get_or_insert(frame.timestamp);
        let signals = Signals {
            elapsed_ms: frame.timestamp - started,
            visible_fraction: self.visible_fraction,
            pointer_active: self.pointer.is_active(),
            pressed: self.pointer.take_press(),
        };
        let mode = self.trigger.mode(&signals, self.config.mode);
        self.field.set_mode(mode);

        let pointer = self.pointer.snapshot();
        self.field.tick(frame.dt, pointer);

        self.target.clear()?;
        self.field.render(&mut self.target, pointer)?;
        Ok(())
    }

    /// Resizes the surface and rebuilds every particle from the source.
    ///
    /// On failure the surface is put back to the field's size, so the
    /// previous particles still match it.
    fn resize(&mut self, bounds: Bounds) -> Result<(), EngineError> {
        let previous = self.field.bounds();
        self.target.resize(bounds)?;
        let field = match Field::build(
            &self.source,
            &self.config,
            bounds,
            &mut self.target,
            self.seed,
        ) {
            Ok(field) => field,
            Err(err) => {
                if let Err(restore) = self.target.resize(previous) {
                    warn!(error = %restore, "surface not restored after failed rebuild");
                }
                return Err(err);
            }
        };
        self.field = field;
        if self.config.pointer_start == PointerStart::Center {
            self.pointer = start_pointer(PointerStart::Center, self.pointer.origin(), bounds);
        }
        debug!(
            width = bounds.width,
            height = bounds.height,
            particles = self.field.len(),
            "effect rebuilt"
        );
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
