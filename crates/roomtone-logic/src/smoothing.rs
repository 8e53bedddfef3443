//! Frame-to-frame smoothing of voice parameters and perceived positions.

use serde::{Deserialize, Serialize};

use crate::math::Vec3;

/// Move `current` toward `target` by `rate × dt` of the remaining gap.
pub fn approach(current: f32, target: f32, rate: f32, delta_seconds: f32) -> f32 {
    let t = (rate * delta_seconds).clamp(0.0, 1.0);
    current + (target - current) * t
}

/// Volume and low-pass actually applied to a playing voice.
///
/// The first [`VoiceState::apply`] after [`VoiceState::reset`] snaps to the
/// target so a voice never fades in from stale values.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct VoiceState {
    pub volume: f32,
    pub low_pass: f32,
    pub initialised: bool,
}

impl VoiceState {
    pub fn reset(&mut self) {
        self.initialised = false;
    }

    pub fn apply(&mut self, volume: f32, low_pass: f32, rate: f32, delta_seconds: f32) {
        if self.initialised {
            self.volume = approach(self.volume, volume, rate, delta_seconds);
            self.low_pass = approach(self.low_pass, low_pass, rate, delta_seconds);
        } else {
            self.volume = volume;
            self.low_pass = low_pass;
            self.initialised = true;
        }
    }
}

/// Low-pass filtered position, snapped on first use.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SmoothedPosition {
    pub current: Vec3,
    pub initialised: bool,
}

impl SmoothedPosition {
    pub fn snap(&mut self, target: Vec3) {
        self.current = target;
        self.initialised = true;
    }

    pub fn follow(&mut self, target: Vec3, rate: f32, delta_seconds: f32) {
        if self.initialised {
            self.current = self.current.lerp(&target, rate * delta_seconds);
        } else {
            self.snap(target);
        }
    }
}
