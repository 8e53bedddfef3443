//! Distance falloff curves.
//!
//! A [`Falloff`] maps a perceived distance to a volume in `[0, max_volume]`.
//! Settings are validated on construction so the curve evaluation itself
//! never divides by a zero span or evaluates a missing custom curve.

use serde::{Deserialize, Serialize};

use crate::constants::falloff::{MIN_DISTANCE_FLOOR, MIN_DISTANCE_SPAN};

/// One key of a piecewise-linear custom falloff curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurveKey {
    /// Normalized distance in `[0, 1]`.
    pub t: f32,
    /// Attenuation at `t`.
    pub value: f32,
}

/// User-supplied falloff shape sampled over normalized distance.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Curve {
    keys: Vec<CurveKey>,
}

impl Curve {
    /// Build a curve from `(t, value)` pairs. Keys are sorted by `t`.
    pub fn from_points(points: &[(f32, f32)]) -> Self {
        let mut keys: Vec<CurveKey> = points
            .iter()
            .filter(|(t, v)| t.is_finite() && v.is_finite())
            .map(|&(t, value)| CurveKey { t, value })
            .collect();
        keys.sort_by(|a, b| a.t.total_cmp(&b.t));
        Self { keys }
    }

    /// Straight line from full volume at `t = 0` to silence at `t = 1`.
    pub fn linear_falloff() -> Self {
        Self::from_points(&[(0.0, 1.0), (1.0, 0.0)])
    }

    pub fn keys(&self) -> &[CurveKey] {
        &self.keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Evaluate the curve, holding the end values outside the key range.
    pub fn evaluate(&self, t: f32) -> f32 {
        let (first, last) = match (self.keys.first(), self.keys.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return 1.0 - t.clamp(0.0, 1.0),
        };
        if t <= first.t {
            return first.value;
        }
        if t >= last.t {
            return last.value;
        }
        for pair in self.keys.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if t <= b.t {
                let span = b.t - a.t;
                if span <= f32::EPSILON {
                    return b.value;
                }
                return a.value + (b.value - a.value) * ((t - a.t) / span);
            }
        }
        last.value
    }

    /// True when no key is louder than the key before it.
    pub fn is_non_increasing(&self) -> bool {
        self.keys.windows(2).all(|w| w[1].value <= w[0].value)
    }
}

/// Shape of the distance falloff.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum AttenuationModel {
    #[default]
    Logarithmic,
    Linear,
    /// Logarithmic falloff for exterior ambience heard through the nearest portal.
    OutdoorFoley,
    Custom(Curve),
}

impl AttenuationModel {
    pub fn is_outdoor_foley(&self) -> bool {
        matches!(self, AttenuationModel::OutdoorFoley)
    }
}

/// Problems found (and corrected) while validating falloff settings.
#[derive(Debug, Clone, PartialEq)]
pub enum FalloffIssue {
    /// Minimum distance below the floor; raised to the floor.
    MinDistanceTooSmall(f32),
    /// Maximum distance not above minimum; raised to minimum plus the span floor.
    MaxDistanceNotAboveMin { min: f32, max: f32 },
    /// Max volume outside `[0, 1]`; clamped.
    MaxVolumeOutOfRange(f32),
    /// Custom model without keys; replaced by a linear falloff.
    EmptyCustomCurve,
    /// Custom curve gets louder with distance somewhere. Kept as given.
    CustomCurveNotMonotonic,
}

/// Validated falloff settings for one source.
///
/// Fields are private so every instance has passed through [`Falloff::validated`].
#[derive(Debug, Clone, PartialEq)]
pub struct Falloff {
    model: AttenuationModel,
    min_distance: f32,
    max_distance: f32,
    max_volume: f32,
}

impl Default for Falloff {
    fn default() -> Self {
        Self {
            model: AttenuationModel::Logarithmic,
            min_distance: 1.0,
            max_distance: 20.0,
            max_volume: 1.0,
        }
    }
}

impl Falloff {
    /// Build validated settings, discarding the list of corrections.
    pub fn new(
        model: AttenuationModel,
        min_distance: f32,
        max_distance: f32,
        max_volume: f32,
    ) -> Self {
        Self::validated(model, min_distance, max_distance, max_volume).0
    }

    /// Build settings, clamping degenerate inputs and reporting what changed.
    pub fn validated(
        model: AttenuationModel,
        min_distance: f32,
        max_distance: f32,
        max_volume: f32,
    ) -> (Self, Vec<FalloffIssue>) {
        let mut issues = Vec::new();

        let mut min = min_distance;
        if !(min >= MIN_DISTANCE_FLOOR) {
            issues.push(FalloffIssue::MinDistanceTooSmall(min_distance));
            min = MIN_DISTANCE_FLOOR;
        }

        let mut max = max_distance;
        if !(max >= min + MIN_DISTANCE_SPAN) {
            issues.push(FalloffIssue::MaxDistanceNotAboveMin {
                min,
                max: max_distance,
            });
            max = min + MIN_DISTANCE_SPAN;
        }

        let mut volume = max_volume;
        if !(0.0..=1.0).contains(&volume) {
            issues.push(FalloffIssue::MaxVolumeOutOfRange(max_volume));
            volume = if volume.is_nan() { 1.0 } else { volume.clamp(0.0, 1.0) };
        }

        let model = match model {
            AttenuationModel::Custom(curve) if curve.is_empty() => {
                issues.push(FalloffIssue::EmptyCustomCurve);
                AttenuationModel::Custom(Curve::linear_falloff())
            }
            AttenuationModel::Custom(curve) => {
                if !curve.is_non_increasing() {
                    issues.push(FalloffIssue::CustomCurveNotMonotonic);
                }
                AttenuationModel::Custom(curve)
            }
            other => other,
        };

        (
            Self {
                model,
                min_distance: min,
                max_distance: max,
                max_volume: volume,
            },
            issues,
        )
    }

    pub fn model(&self) -> &AttenuationModel {
        &self.model
    }

    pub fn min_distance(&self) -> f32 {
        self.min_distance
    }

    pub fn max_distance(&self) -> f32 {
        self.max_distance
    }

    pub fn max_volume(&self) -> f32 {
        self.max_volume
    }

    /// Unscaled attenuation in `[0, 1]` at `distance`.
    pub fn attenuation(&self, distance: f32) -> f32 {
        let (min, max) = (self.min_distance, self.max_distance);
        let d = if distance.is_nan() {
            max
        } else {
            distance.clamp(min, max)
        };

        let attenuation = match &self.model {
            AttenuationModel::Linear => 1.0 - (d - min) / (max - min),
            AttenuationModel::Logarithmic | AttenuationModel::OutdoorFoley => {
                (max / d).log10() / (max / min).log10()
            }
            AttenuationModel::Custom(curve) => curve.evaluate((d - min) / (max - min)),
        };

        attenuation.clamp(0.0, 1.0)
    }

    /// Perceived volume at `distance`: attenuation scaled by max volume.
    pub fn volume_at(&self, distance: f32) -> f32 {
        self.attenuation(distance) * self.max_volume
    }
}
