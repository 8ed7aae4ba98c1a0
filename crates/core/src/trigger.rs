//! Policies deciding when a field converges.

use serde::{Deserialize, Serialize};

use crate::particle::Mode;

/// When a field switches into [`Mode::Converging`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TriggerPolicy {
    /// Active from the first tick.
    #[default]
    Immediate,
    /// Active while at least `threshold` of the field is visible. Without
    /// `revert` the first activation latches.
    Visibility {
        threshold: f64,
        #[serde(default)]
        revert: bool,
    },
    /// One-shot, `delay_ms` after the first tick.
    Timer { delay_ms: u64 },
    /// Latches the first time the pointer becomes active.
    Hover,
    /// Latches on the first press.
    Click,
}

impl TriggerPolicy {
    /// Maps the falling-text trigger names (`auto`, `scroll`, `click`,
    /// `hover`) onto policies.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "auto" | "immediate" => Some(TriggerPolicy::Immediate),
            "scroll" | "visibility" => Some(TriggerPolicy::Visibility {
                threshold: 0.1,
                revert: false,
            }),
            "click" => Some(TriggerPolicy::Click),
            "hover" => Some(TriggerPolicy::Hover),
            _ => None,
        }
    }
}

/// Inputs a trigger looks at each tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Signals {
    /// Milliseconds since the first tick.
    pub elapsed_ms: f64,
    /// Fraction of the field on screen, in [0, 1].
    pub visible_fraction: f64,
    pub pointer_active: bool,
    /// A press happened since the previous tick.
    pub pressed: bool,
}

/// A policy plus its latch.
#[derive(Debug, Clone, PartialEq)]
pub struct Trigger {
    policy: TriggerPolicy,
    fired: bool,
}

impl Trigger {
    pub fn new(policy: TriggerPolicy) -> Self {
        Self {
            policy,
            fired: false,
        }
    }

    pub fn policy(&self) -> TriggerPolicy {
        self.policy
    }

    /// Whether the trigger has fired at least once.
    pub fn fired(&self) -> bool {
        self.fired
    }

    /// Evaluates the policy against this tick's signals.
    pub fn activate(&mut self, signals: &Signals) -> bool {
        let active = match self.policy {
            TriggerPolicy::Immediate => true,
            TriggerPolicy::Visibility { threshold, revert } => {
                let visible = signals.visible_fraction >= threshold;
                if revert {
                    visible
                } else {
                    self.fired || visible
                }
            }
            TriggerPolicy::Timer { delay_ms } => {
                self.fired || signals.elapsed_ms >= delay_ms as f64
            }
            TriggerPolicy::Hover => self.fired || signals.pointer_active,
            TriggerPolicy::Click => self.fired || signals.pressed,
        };
        self.fired |= active;
        active
    }

    /// Field mode for this tick: converging while active, `seed` otherwise.
    pub fn mode(&mut self, signals: &Signals, seed: Mode) -> Mode {
        if self.activate(signals) {
            Mode::Converging
        } else {
            seed
        }
    }

    /// Clears the latch, e.g. when the field is rebuilt from scratch.
    pub fn reset(&mut self) {
        self.fired = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(elapsed_ms: f64) -> Signals {
        Signals {
            elapsed_ms,
            ..Signals::default()
        }
    }

    fn visible(fraction: f64) -> Signals {
        Signals {
            visible_fraction: fraction,
            ..Signals::default()
        }
    }

    #[test]
    fn immediate_is_active_on_first_tick() {
        let mut t = Trigger::new(TriggerPolicy::Immediate);
        assert_eq!(t.mode(&at(0.0), Mode::Scattered), Mode::Converging);
    }

    #[test]
    fn timer_fires_once_after_delay() {
        let mut t = Trigger::new(TriggerPolicy::Timer { delay_ms: 500 });
        assert!(!t.activate(&at(499.0)));
        assert!(t.activate(&at(500.0)));
        // one-shot: stays fired even if the clock were reset
        assert!(t.activate(&at(0.0)));
    }

    #[test]
    fn visibility_latches_without_revert() {
        let mut t = Trigger::new(TriggerPolicy::Visibility {
            threshold: 0.5,
            revert: false,
        });
        assert!(!t.activate(&visible(0.2)));
        assert!(t.activate(&visible(0.6)));
        assert!(t.activate(&visible(0.0)));
    }

    #[test]
    fn visibility_with_revert_follows_signal() {
        let mut t = Trigger::new(TriggerPolicy::Visibility {
            threshold: 0.5,
            revert: true,
        });
        assert!(t.activate(&visible(0.5)));
        assert_eq!(t.mode(&visible(0.1), Mode::Scattered), Mode::Scattered);
        assert!(t.fired());
    }

    #[test]
    fn hover_and_click_latch() {
        let mut hover = Trigger::new(TriggerPolicy::Hover);
        assert!(!hover.activate(&Signals::default()));
        let mut s = Signals::default();
        s.pointer_active = true;
        assert!(hover.activate(&s));
        assert!(hover.activate(&Signals::default()));

        let mut click = Trigger::new(TriggerPolicy::Click);
        s = Signals::default();
        s.pressed = true;
        assert!(click.activate(&s));
        assert!(click.activate(&Signals::default()));
    }

    #[test]
    fn reset_clears_latch() {
        let mut t = Trigger::new(TriggerPolicy::Click);
        t.activate(&Signals {
            pressed: true,
            ..Signals::default()
        });
        t.reset();
        assert!(!t.activate(&Signals::default()));
    }

    #[test]
    fn falling_text_names_map_to_policies() {
        assert_eq!(
            TriggerPolicy::from_name("auto"),
            Some(TriggerPolicy::Immediate)
        );
        assert_eq!(
            TriggerPolicy::from_name("scroll"),
            Some(TriggerPolicy::Visibility {
                threshold: 0.1,
                revert: false
            })
        );
        assert_eq!(TriggerPolicy::from_name("click"), Some(TriggerPolicy::Click));
        assert_eq!(TriggerPolicy::from_name("hover"), Some(TriggerPolicy::Hover));
        assert_eq!(TriggerPolicy::from_name("never"), None);
    }

    #[test]
    fn policy_serde_is_tagged() {
        let json = serde_json::json!({"kind": "timer", "delay_ms": 500});
        let p: TriggerPolicy = serde_json::from_value(json).unwrap();
        assert_eq!(p, TriggerPolicy::Timer { delay_ms: 500 });
        let v: TriggerPolicy =
            serde_json::from_value(serde_json::json!({"kind": "visibility", "threshold": 0.3}))
                .unwrap();
        assert_eq!(
            v,
            TriggerPolicy::Visibility {
                threshold: 0.3,
                revert: false
            }
        );
    }
}
