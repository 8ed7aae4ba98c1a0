//! Pointer and touch input normalized into field-local coordinates.

use serde::{Deserialize, Serialize};

use crate::vector::{Vector2, OFFSCREEN};

/// Pointer state as seen by particles for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pointer {
    pub position: Vector2,
    pub active: bool,
}

impl Pointer {
    /// The dismissed pointer: off-screen and inactive.
    pub fn inactive() -> Self {
        Self {
            position: OFFSCREEN,
            active: false,
        }
    }

    pub fn at(position: Vector2) -> Self {
        Self {
            position,
            active: true,
        }
    }
}

impl Default for Pointer {
    fn default() -> Self {
        Self::inactive()
    }
}

/// Where the pointer starts before any input arrives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerStart {
    #[default]
    Inactive,
    /// Active at the center of the field.
    Center,
}

/// Host input events, in screen (client) coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Move(Vector2),
    /// First touch point of a touch-move.
    Touch(Vector2),
    /// Button press or tap at a position.
    Press(Vector2),
    Leave,
    TouchEnd,
    TouchCancel,
    /// Window lost focus.
    Blur,
}

/// Tracks the pointer relative to the field's screen origin.
#[derive(Debug, Clone, PartialEq)]
pub struct PointerTracker {
    position: Vector2,
    active: bool,
    origin: Vector2,
    pressed: bool,
}

impl Default for PointerTracker {
    fn default() -> Self {
        Self::new(Vector2::ZERO)
    }
}

impl PointerTracker {
    pub fn new(origin: Vector2) -> Self {
        Self {
            position: OFFSCREEN,
            active: false,
            origin,
            pressed: false,
        }
    }

    /// Tracker whose pointer is already active at `center`, in field space.
    pub fn centered(origin: Vector2, center: Vector2) -> Self {
        Self {
            position: center,
            active: true,
            origin,
            pressed: false,
        }
    }

    /// Moves the field's screen origin (scrolling, layout changes).
    pub fn set_origin(&mut self, origin: Vector2) {
        self.origin = origin;
    }

    pub fn origin(&self) -> Vector2 {
        self.origin
    }

    pub fn on_move(&mut self, client: Vector2) {
        if !client.is_finite() {
            return;
        }
        self.position = client - self.origin;
        self.active = true;
    }

    /// Deactivates immediately and parks the position off-screen.
    pub fn on_leave(&mut self) {
        self.position = OFFSCREEN;
        self.active = false;
    }

    pub fn handle(&mut self, event: PointerEvent) {
        match event {
            PointerEvent::Move(p) | PointerEvent::Touch(p) => self.on_move(p),
            PointerEvent::Press(p) => {
                self.on_move(p);
                self.pressed = true;
            }
            PointerEvent::Leave
            | PointerEvent::TouchEnd
            | PointerEvent::TouchCancel
            | PointerEvent::Blur => self.on_leave(),
        }
    }

    pub fn snapshot(&self) -> Pointer {
        Pointer {
            position: self.position,
            active: self.active,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Returns whether a press happened since the last call, clearing it.
    pub fn take_press(&mut self) -> bool {
        std::mem::take(&mut self.pressed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_is_relative_to_origin() {
        let mut t = PointerTracker::new(Vector2::new(100.0, 40.0));
        t.on_move(Vector2::new(150.0, 90.0));
        assert_eq!(t.snapshot(), Pointer::at(Vector2::new(50.0, 50.0)));
    }

    #[test]
    fn every_dismissal_resets_to_sentinel() {
        for event in [
            PointerEvent::Leave,
            PointerEvent::TouchEnd,
            PointerEvent::TouchCancel,
            PointerEvent::Blur,
        ] {
            let mut t = PointerTracker::default();
            t.handle(PointerEvent::Touch(Vector2::new(3.0, 4.0)));
            assert!(t.is_active());
            t.handle(event);
            assert_eq!(t.snapshot(), Pointer::inactive(), "{event:?}");
        }
    }

    #[test]
    fn press_latches_until_taken() {
        let mut t = PointerTracker::default();
        assert!(!t.take_press());
        t.handle(PointerEvent::Press(Vector2::new(1.0, 1.0)));
        assert!(t.is_active());
        assert!(t.take_press());
        assert!(!t.take_press());
    }

    #[test]
    fn centered_start_is_active() {
        let t = PointerTracker::centered(Vector2::ZERO, Vector2::new(200.0, 100.0));
        assert!(t.snapshot().active);
        assert_eq!(t.snapshot().position, Vector2::new(200.0, 100.0));
    }

    #[test]
    fn non_finite_moves_are_ignored() {
        let mut t = PointerTracker::default();
        t.on_move(Vector2::new(f64::NAN, 1.0));
        assert!(!t.is_active());
    }

    #[test]
    fn set_origin_applies_to_later_moves() {
        let mut t = PointerTracker::default();
        t.set_origin(Vector2::new(10.0, 10.0));
        t.on_move(Vector2::new(10.0, 10.0));
        assert_eq!(t.snapshot().position, Vector2::ZERO);
        assert_eq!(t.origin(), Vector2::new(10.0, 10.0));
    }
}
