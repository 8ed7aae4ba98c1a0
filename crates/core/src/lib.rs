#![deny(unsafe_code)]
//! Core of the particle-fx animation engine.
//!
//! Provides [`Particle`] and [`Field`] (particles sampled from a text, image
//! or grid [`Source`]), [`PointerTracker`], [`Trigger`] policies, the
//! [`RenderTarget`] and [`Scheduler`] host capabilities, the
//! [`AnimationLoop`] state machine, the [`Effect`] composition and the
//! scoped [`Mount`], plus colors, palettes, configuration and the
//! deterministic [`Xorshift64`] PRNG.

pub mod animation;
pub mod color;
pub mod config;
pub mod effect;
pub mod error;
pub mod field;
pub mod mount;
pub mod palette;
pub mod params;
pub mod particle;
pub mod physics;
pub mod pointer;
pub mod prng;
pub mod render;
pub mod scene;
pub mod source;
pub mod trigger;
pub mod vector;

pub use animation::{
    Animation, AnimationLoop, FrameHandle, FrameInfo, ManualScheduler, Scheduler, TickError,
};
pub use color::Rgba;
pub use config::{FieldConfig, RadiusRange};
pub use effect::Effect;
pub use error::EngineError;
pub use field::{Field, Scatter};
pub use mount::Mount;
pub use palette::{Coloring, Palette};
pub use particle::{Dynamics, Mode, Particle};
pub use physics::{BodySpec, BodyState, Material, PhysicsWorld, WorldSetup};
pub use pointer::{Pointer, PointerEvent, PointerStart, PointerTracker};
pub use prng::Xorshift64;
pub use render::{Bounds, RenderError, RenderTarget, TextAlign, TextStyle};
pub use scene::Scene;
pub use source::{Density, GridSource, ImageSource, PixelMask, Sample, Sampling, Source, TextSource};
pub use trigger::{Signals, Trigger, TriggerPolicy};
pub use vector::Vector2;
