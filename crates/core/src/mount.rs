//! Scoped ownership of a running animation and its surface.
//!
//! A [`Mount`] starts the loop when it is created and stops it before
//! anything it drives is released, on every exit path: explicit
//! [`Mount::unmount`], drop during unwinding, or drop after an error.

use tracing::debug;

use crate::animation::{Animation, AnimationLoop, FrameHandle, ManualScheduler, Scheduler};
use crate::error::EngineError;
use crate::pointer::PointerEvent;
use crate::render::Bounds;

/// A running animation bound to a scheduler.
#[derive(Debug)]
pub struct Mount<S: Scheduler, A: Animation> {
    looper: AnimationLoop<S, A>,
}

impl<S: Scheduler, A: Animation> Mount<S, A> {
    /// Takes ownership of `animation` and starts its loop.
    pub fn new(scheduler: S, animation: A) -> Self {
        let mut looper = AnimationLoop::new(scheduler);
        looper.start(animation);
        debug!("mounted");
        Self { looper }
    }

    /// Host frame callback.
    pub fn frame(&mut self, handle: FrameHandle, timestamp: f64) -> Result<(), EngineError> {
        self.looper.fire(handle, timestamp)
    }

    /// Stops the loop, rebuilds the animation for `bounds`, and restarts it
    /// if it was running.
    ///
    /// No frame can observe a half-rebuilt animation. If the rebuild fails
    /// the loop stays stopped and the error is returned.
    pub fn resize(&mut self, bounds: Bounds) -> Result<(), EngineError> {
        let was_running = self.looper.is_running();
        self.looper.stop();
        if let Some(animation) = self.looper.animation_mut() {
            animation.resize(bounds)?;
        }
        if was_running {
            self.looper.resume();
        }
        Ok(())
    }

    pub fn pointer(&mut self, event: PointerEvent) {
        if let Some(animation) = self.looper.animation_mut() {
            animation.pointer(event);
        }
    }

    pub fn visibility(&mut self, fraction: f64) {
        if let Some(animation) = self.looper.animation_mut() {
            animation.visibility(fraction);
        }
    }

    pub fn is_running(&self) -> bool {
        self.looper.is_running()
    }

    /// Restarts after a fatal tick error stopped the loop.
    pub fn resume(&mut self) -> bool {
        self.looper.resume()
    }

    pub fn frames(&self) -> u64 {
        self.looper.frames()
    }

    pub fn animation(&self) -> Option<&A> {
        self.looper.animation()
    }

    pub fn animation_mut(&mut self) -> Option<&mut A> {
        self.looper.animation_mut()
    }

    pub fn scheduler(&self) -> &S {
        self.looper.scheduler()
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        self.looper.scheduler_mut()
    }

    /// Stops the loop, then hands the animation (and its surface) back.
    pub fn unmount(mut self) -> Option<A> {
        self.looper.take()
    }
}

impl<A: Animation> Mount<ManualScheduler, A> {
    /// Runs `n` frames on the manual clock.
    pub fn run_frames(&mut self, n: usize) -> Result<(), EngineError> {
        self.looper.run_frames(n)
    }
}

impl<S: Scheduler, A: Animation> Drop for Mount<S, A> {
    fn drop(&mut self) {
        // The loop must be idle before the animation and surface drop.
        self.looper.stop();
        debug!("unmounted");
    }
}
