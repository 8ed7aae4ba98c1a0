//! Frame scheduling and the animation loop state machine.
//!
//! The host owns the display-refresh callback; the engine only sees it
//! through [`Scheduler`]. An [`AnimationLoop`] owns the [`Animation`] it
//! drives and moves between two states:
//!
//! ```text
//! Idle --start/resume--> Running --stop/fatal tick--> Idle
//! ```
//!
//! At most one frame request is outstanding while running, so repeated
//! `start` calls can never double the tick rate.

use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::error::EngineError;
use crate::particle::FRAME_SECONDS;
use crate::pointer::PointerEvent;
use crate::render::{Bounds, RenderError};

/// Identifies one outstanding frame request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub u64);

/// Host capability that calls back once per display refresh.
pub trait Scheduler {
    /// Requests a single callback for the next frame.
    fn request_frame(&mut self) -> FrameHandle;

    /// Cancels a request. Unknown or already-fired handles are ignored.
    fn cancel_frame(&mut self, handle: FrameHandle);
}

/// Fixed-rate scheduler advanced by hand, for headless runs and tests.
#[derive(Debug, Clone)]
pub struct ManualScheduler {
    interval_ms: f64,
    now_ms: f64,
    next_id: u64,
    pending: Vec<FrameHandle>,
}

impl ManualScheduler {
    /// Creates a scheduler ticking at `fps` frames per second (at least 1).
    pub fn new(fps: f64) -> Self {
        let fps = if fps.is_finite() { fps.max(1.0) } else { 60.0 };
        Self {
            interval_ms: 1000.0 / fps,
            now_ms: 0.0,
            next_id: 0,
            pending: Vec::new(),
        }
    }

    /// Current simulated time in milliseconds.
    pub fn now(&self) -> f64 {
        self.now_ms
    }

    /// Number of outstanding frame requests.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Moves the clock forward one frame and hands back every request that
    /// is now due, with the frame timestamp.
    pub fn advance(&mut self) -> (Vec<FrameHandle>, f64) {
        self.now_ms += self.interval_ms;
        (std::mem::take(&mut self.pending), self.now_ms)
    }
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self::new(60.0)
    }
}

impl Scheduler for ManualScheduler {
    fn request_frame(&mut self) -> FrameHandle {
        self.next_id += 1;
        let handle = FrameHandle(self.next_id);
        self.pending.push(handle);
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        self.pending.retain(|h| *h != handle);
    }
}

/// Timing of one delivered frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInfo {
    /// Host timestamp in milliseconds.
    pub timestamp: f64,
    /// Seconds since the previous frame of this run.
    pub dt: f64,
    /// Frames delivered before this one.
    pub index: u64,
}

/// Why a tick failed.
#[derive(Debug, Error)]
pub enum TickError {
    /// The frame could not be drawn but the next one may succeed.
    #[error("frame skipped: {0}")]
    Transient(RenderError),

    /// Continuing would risk inconsistent or runaway state.
    #[error("{0}")]
    Fatal(String),
}

impl From<RenderError> for TickError {
    fn from(e: RenderError) -> Self {
        if e.is_transient() {
            TickError::Transient(e)
        } else {
            TickError::Fatal(e.to_string())
        }
    }
}

impl From<EngineError> for TickError {
    fn from(e: EngineError) -> Self {
        TickError::Fatal(e.to_string())
    }
}

/// Something driven once per frame.
///
/// Object-safe so hosts can hold `Box<dyn Animation>`.
pub trait Animation {
    /// Advances state and draws one frame.
    fn tick(&mut self, frame: FrameInfo) -> Result<(), TickError>;

    /// Reconfigures for a new surface size, rebuilding from scratch.
    fn resize(&mut self, bounds: Bounds) -> Result<(), EngineError>;

    /// Delivers pointer input.
    fn pointer(&mut self, _event: PointerEvent) {}

    /// Delivers the visible fraction of the hosting element.
    fn visibility(&mut self, _fraction: f64) {}
}

impl<T: Animation + ?Sized> Animation for Box<T> {
    fn tick(&mut self, frame: FrameInfo) -> Result<(), TickError> {
        (**self).tick(frame)
    }

    fn resize(&mut self, bounds: Bounds) -> Result<(), EngineError> {
        (**self).resize(bounds)
    }

    fn pointer(&mut self, event: PointerEvent) {
        (**self).pointer(event)
    }

    fn visibility(&mut self, fraction: f64) {
        (**self).visibility(fraction)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Running,
}

/// Drives an [`Animation`] from a [`Scheduler`].
#[derive(Debug)]
pub struct AnimationLoop<S, A> {
    scheduler: S,
    animation: Option<A>,
    state: State,
    pending: Option<FrameHandle>,
    last_timestamp: Option<f64>,
    frames: u64,
}

impl<S: Scheduler, A: Animation> AnimationLoop<S, A> {
    /// An idle loop with no animation.
    pub fn new(scheduler: S) -> Self {
        Self {
            scheduler,
            animation: None,
            state: State::Idle,
            pending: None,
            last_timestamp: None,
            frames: 0,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state == State::Running
    }

    /// Frames successfully delivered to the animation so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn animation(&self) -> Option<&A> {
        self.animation.as_ref()
    }

    pub fn animation_mut(&mut self) -> Option<&mut A> {
        self.animation.as_mut()
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    /// Takes ownership of `animation` and starts running it.
    ///
    /// While already running this is a no-op and `animation` is handed
    /// straight back. From idle, any previously held animation is replaced
    /// and returned.
    pub fn start(&mut self, animation: A) -> Option<A> {
        if self.is_running() {
            trace!("start ignored: loop already running");
            return Some(animation);
        }
        let previous = self.animation.replace(animation);
        self.begin();
        previous
    }

    /// Restarts a stopped loop with the animation it already holds.
    /// Returns whether the loop is running afterwards.
    pub fn resume(&mut self) -> bool {
        if !self.is_running() && self.animation.is_some() {
            self.begin();
        }
        self.is_running()
    }

    /// Cancels the outstanding frame and goes idle. Idempotent.
    pub fn stop(&mut self) {
        if let Some(handle) = self.pending.take() {
            self.scheduler.cancel_frame(handle);
        }
        if self.is_running() {
            debug!(frames = self.frames, "animation loop stopped");
        }
        self.state = State::Idle;
    }

    /// Stops the loop and returns the animation it held.
    pub fn take(&mut self) -> Option<A> {
        self.stop();
        self.animation.take()
    }

    fn begin(&mut self) {
        self.state = State::Running;
        self.last_timestamp = None;
        self.pending = Some(self.scheduler.request_frame());
        debug!("animation loop started");
    }

    /// Host callback for a delivered frame.
    ///
    /// Handles that are not the outstanding request (cancelled, or from a
    /// previous run) are ignored. A transient tick failure skips the frame
    /// and keeps the loop running; a fatal one stops the loop and is
    /// returned as [`EngineError::Tick`].
    pub fn fire(&mut self, handle: FrameHandle, timestamp: f64) -> Result<(), EngineError> {
        if !self.is_running() || self.pending != Some(handle) {
            trace!(?handle, "stale frame ignored");
            return Ok(());
        }
        self.pending = None;

        let Some(animation) = self.animation.as_mut() else {
            self.state = State::Idle;
            return Ok(());
        };
        let dt = match self.last_timestamp {
            Some(last) => ((timestamp - last) / 1000.0).max(0.0),
            None => FRAME_SECONDS,
        };
        let frame = FrameInfo {
            timestamp,
            dt,
            index: self.frames,
        };
        self.last_timestamp = Some(timestamp);

        match animation.tick(frame) {
            Ok(()) => self.frames += 1,
            Err(TickError::Transient(e)) => {
                warn!(frame = frame.index, error = %e, "transient render error; frame skipped");
            }
            Err(TickError::Fatal(msg)) => {
                self.state = State::Idle;
                warn!(frame = frame.index, error = %msg, "fatal tick error; loop stopped");
                return Err(EngineError::Tick(msg));
            }
        }
        self.pending = Some(self.scheduler.request_frame());
        Ok(())
    }
}

impl<A: Animation> AnimationLoop<ManualScheduler, A> {
    /// Advances the manual clock `n` frames, firing whatever is due.
    /// Stops early on a fatal tick error.
    pub fn run_frames(&mut self, n: usize) -> Result<(), EngineError> {
        for _ in 0..n {
            let (due, timestamp) = self.scheduler.advance();
            for handle in due {
                self.fire(handle, timestamp)?;
            }
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::testing::Counter;
    use super::*;

    fn looped() -> AnimationLoop<ManualScheduler, Counter> {
        AnimationLoop::new(ManualScheduler::new(60.0))
    }

    #[test]
    fn double_start_keeps_one_callback_chain() {
        let mut lp = looped();
        assert!(lp.start(Counter::default()).is_none());
        let rejected = lp.start(Counter::default());
        assert!(rejected.is_some());
        assert_eq!(lp.scheduler().pending(), 1);
        lp.run_frames(30).unwrap();
        assert_eq!(lp.animation().unwrap().ticks, 30);
        assert_eq!(lp.scheduler().pending(), 1);
    }

    #[test]
    fn stop_is_idempotent() {
        let mut lp = looped();
        lp.start(Counter::default());
        lp.stop();
        lp.stop();
        assert!(!lp.is_running());
        assert_eq!(lp.scheduler().pending(), 0);
        lp.run_frames(5).unwrap();
        assert_eq!(lp.animation().unwrap().ticks, 0);
    }

    #[test]
    fn stale_handles_are_ignored() {
        let mut lp = looped();
        lp.start(Counter::default());
        lp.fire(FrameHandle(999), 16.0).unwrap();
        assert_eq!(lp.animation().unwrap().ticks, 0);
        assert_eq!(lp.scheduler().pending(), 1);
    }

    #[test]
    fn handle_from_previous_run_is_ignored() {
        let mut lp = looped();
        lp.start(Counter::default());
        let old = FrameHandle(1);
        lp.stop();
        assert!(lp.resume());
        lp.fire(old, 16.0).unwrap();
        assert_eq!(lp.animation().unwrap().ticks, 0);
    }

    #[test]
    fn transient_errors_skip_frame_and_continue() {
        let mut lp = looped();
        lp.start(Counter {
            transient_at: vec![1, 2],
            ..Counter::default()
        });
        lp.run_frames(5).unwrap();
        assert!(lp.is_running());
        assert_eq!(lp.animation().unwrap().ticks, 3);
        assert_eq!(lp.frames(), 3);
    }

    #[test]
    fn fatal_error_stops_loop_and_propagates() {
        let mut lp = looped();
        lp.start(Counter {
            fatal_at: Some(2),
            ..Counter::default()
        });
        let err = lp.run_frames(10).unwrap_err();
        assert!(matches!(err, EngineError::Tick(ref m) if m == "boom"));
        assert!(!lp.is_running());
        assert_eq!(lp.scheduler().pending(), 0);
        assert_eq!(lp.animation().unwrap().ticks, 2);
    }

    #[test]
    fn dt_follows_timestamps() {
        let mut lp = AnimationLoop::new(ManualScheduler::new(30.0));
        lp.start(Counter::default());
        lp.run_frames(3).unwrap();
        let dts = &lp.animation().unwrap().dts;
        assert_eq!(dts[0], FRAME_SECONDS);
        assert!((dts[1] - 1.0 / 30.0).abs() < 1e-9);
        assert!((dts[2] - 1.0 / 30.0).abs() < 1e-9);
    }

    #[test]
    fn take_stops_and_returns_animation() {
        let mut lp = looped();
        lp.start(Counter::default());
        lp.run_frames(2).unwrap();
        let counter = lp.take().unwrap();
        assert_eq!(counter.ticks, 2);
        assert!(!lp.is_running());
        assert!(!lp.resume());
    }

    #[test]
    fn start_from_idle_replaces_previous_animation() {
        let mut lp = looped();
        lp.start(Counter::default());
        lp.run_frames(1).unwrap();
        lp.stop();
        let previous = lp.start(Counter::default()).unwrap();
        assert_eq!(previous.ticks, 1);
        assert!(lp.is_running());
    }

    #[test]
    fn render_error_conversion_splits_transient_and_fatal() {
        assert!(matches!(
            TickError::from(RenderError::Unavailable("x".into())),
            TickError::Transient(_)
        ));
        assert!(matches!(
            TickError::from(RenderError::Lost("x".into())),
            TickError::Fatal(_)
        ));
    }

    #[test]
    fn boxed_animation_is_object_safe() {
        let mut lp: AnimationLoop<ManualScheduler, Box<dyn Animation>> = looped_boxed();
        lp.run_frames(3).unwrap();
        assert_eq!(lp.frames(), 3);
    }

    fn looped_boxed() -> AnimationLoop<ManualScheduler, Box<dyn Animation>> {
        let mut lp = AnimationLoop::new(ManualScheduler::default());
        lp.start(Box::new(Counter::default()) as Box<dyn Animation>);
        lp
    }
}
