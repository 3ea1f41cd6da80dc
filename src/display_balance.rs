//! Smooths changes to the balance shown on the dashboard.
//!
//! The shown value moves towards the real balance in steps of a twentieth of
//! the remaining difference, so large changes settle in a few dozen frames.
//! This is purely cosmetic and never feeds back into the ledger.

use std::time::Duration;

use rust_decimal::{Decimal, RoundingStrategy};

/// How long each frame is shown for.
pub const TICK_INTERVAL: Duration = Duration::from_millis(50);

const STEP_DIVISOR: Decimal = Decimal::from_parts(20, 0, 0, false, 0);

/// The balance value currently shown and the value it is moving towards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayBalance {
    current: Decimal,
    target: Decimal,
}

impl DisplayBalance {
    /// Start settled at `value`.
    pub fn new(value: Decimal) -> Self {
        Self {
            current: value,
            target: value,
        }
    }

    /// The value to show right now.
    pub fn current(&self) -> Decimal {
        self.current
    }

    /// The value being moved towards.
    pub fn target(&self) -> Decimal {
        self.target
    }

    /// Start moving towards `target` from wherever the shown value is now.
    pub fn retarget(&mut self, target: Decimal) {
        self.target = target;
    }

    /// Whether the shown value has reached the target.
    pub fn is_settled(&self) -> bool {
        self.current == self.target
    }

    /// Advance one frame and return the new shown value, or `None` if already settled.
    pub fn tick(&mut self) -> Option<Decimal> {
        if self.is_settled() {
            return None;
        }

        let Some(difference) = self.target.checked_sub(self.current) else {
            self.current = self.target;
            return Some(self.current);
        };
        let strategy = if difference > Decimal::ZERO {
            RoundingStrategy::ToPositiveInfinity
        } else {
            RoundingStrategy::ToNegativeInfinity
        };
        let step = (difference / STEP_DIVISOR).round_dp_with_strategy(0, strategy);
        let next = self.current.checked_add(step).unwrap_or(self.target);

        let overshoots = if difference > Decimal::ZERO {
            next >= self.target
        } else {
            next <= self.target
        };

        self.current = if overshoots { self.target } else { next };

        Some(self.current)
    }

    /// Tick until settled and collect every shown value along the way.
    ///
    /// The last frame is always the target. Returns an empty list if already
    /// settled.
    pub fn frames(&mut self) -> Vec<Decimal> {
        std::iter::from_fn(|| self.tick()).collect()
    }
}
