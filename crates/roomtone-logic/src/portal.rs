//! Portal traversal cost and open/close animation state.

use serde::{Deserialize, Serialize};

use crate::constants::portal::{MIN_TRAVEL_COST, OBSTRUCTION_COST_SCALE};

/// Travel cost a portal adds to any path crossing it.
///
/// `open_close` is 0 when fully open, 1 when fully closed; `obstruction` is
/// how much a closed portal blocks sound. Never below [`MIN_TRAVEL_COST`].
pub fn travel_cost(open_close: f32, obstruction: f32) -> f32 {
    let open_close = open_close.clamp(0.0, 1.0);
    let obstruction = obstruction.clamp(0.0, 1.0);
    (open_close * obstruction * OBSTRUCTION_COST_SCALE).max(MIN_TRAVEL_COST)
}

/// Interpolation of a portal's open/close amount toward a target.
///
/// Advanced once per tick by the engine; lands exactly on `target` once
/// `duration` has elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PortalLerp {
    pub start: f32,
    pub target: f32,
    pub elapsed: f32,
    pub duration: f32,
}

impl PortalLerp {
    pub fn new(start: f32, target: f32, duration: f32) -> Self {
        Self {
            start: start.clamp(0.0, 1.0),
            target: target.clamp(0.0, 1.0),
            elapsed: 0.0,
            duration: duration.max(0.0),
        }
    }

    /// Advance by `delta_seconds`; returns the new amount and whether the
    /// animation has finished.
    pub fn advance(&mut self, delta_seconds: f32) -> (f32, bool) {
        self.elapsed += delta_seconds.max(0.0);
        if self.duration <= 0.0 || self.elapsed >= self.duration {
            return (self.target, true);
        }
        let t = self.elapsed / self.duration;
        (self.start + (self.target - self.start) * t, false)
    }
}
