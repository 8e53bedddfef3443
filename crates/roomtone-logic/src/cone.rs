//! Directional emission cones.

use serde::{Deserialize, Serialize};

use crate::constants::cone::{INNER_PENALTY, OMNIDIRECTIONAL, OUTER_PENALTY};
use crate::math::Vec3;

/// Inner/outer emission angles in degrees. Both 360 means omnidirectional.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cone {
    inner: f32,
    outer: f32,
}

impl Default for Cone {
    fn default() -> Self {
        Self {
            inner: OMNIDIRECTIONAL,
            outer: OMNIDIRECTIONAL,
        }
    }
}

impl Cone {
    /// Angles are clamped to `[0, 360]` and the outer cone widened to at
    /// least the inner one.
    pub fn new(inner: f32, outer: f32) -> Self {
        let inner = if inner.is_nan() {
            OMNIDIRECTIONAL
        } else {
            inner.clamp(0.0, OMNIDIRECTIONAL)
        };
        let outer = if outer.is_nan() {
            OMNIDIRECTIONAL
        } else {
            outer.clamp(0.0, OMNIDIRECTIONAL)
        };
        Self {
            inner,
            outer: outer.max(inner),
        }
    }

    pub fn inner(&self) -> f32 {
        self.inner
    }

    pub fn outer(&self) -> f32 {
        self.outer
    }

    pub fn is_omnidirectional(&self) -> bool {
        self.inner >= OMNIDIRECTIONAL
    }

    /// Extra perceived distance for a listener at `listener`, given a source
    /// at `source` facing `forward`.
    pub fn distance_penalty(&self, forward: Vec3, source: Vec3, listener: Vec3) -> f32 {
        if self.is_omnidirectional() {
            return 0.0;
        }
        let angle = forward.angle_to(&(listener - source));
        if angle > self.outer {
            OUTER_PENALTY
        } else if angle > self.inner {
            INNER_PENALTY
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_omnidirectional_has_no_penalty() {
        let cone = Cone::default();
        let p = cone.distance_penalty(Vec3::FORWARD, Vec3::ZERO, Vec3::new(0.0, 0.0, -5.0));
        assert_eq!(p, 0.0);
    }

    #[test]
    fn test_penalty_bands() {
        let cone = Cone::new(45.0, 120.0);
        let src = Vec3::ZERO;
        // In front
        assert_eq!(cone.distance_penalty(Vec3::FORWARD, src, Vec3::new(0.0, 0.0, 5.0)), 0.0);
        // 90° to the side: past inner, within outer
        assert_eq!(cone.distance_penalty(Vec3::FORWARD, src, Vec3::new(5.0, 0.0, 0.0)), 2.0);
        // Behind
        assert_eq!(cone.distance_penalty(Vec3::FORWARD, src, Vec3::new(0.0, 0.0, -5.0)), 4.0);
    }

    #[test]
    fn test_outer_widened_to_inner() {
        let cone = Cone::new(90.0, 30.0);
        assert_eq!(cone.outer(), 90.0);
        assert_eq!(Cone::new(500.0, 500.0), Cone::default());
    }
}
