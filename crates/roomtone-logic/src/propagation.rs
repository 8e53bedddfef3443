//! Pure propagation formulas shared by the direct and pathed cases.
//!
//! Nothing here knows about rooms or entities. The engine gathers positions,
//! path costs and flags, and these functions turn them into perceived
//! distance, obstruction and placement.

use crate::constants::obstruction::{JITTER, RAY_COUNT};
use crate::constants::pathing::{
    FLOOR_SEPARATION, FLOOR_TRANSITION_OBSTRUCTION, LEAKAGE_DISTANCE_SCALE, LEAKAGE_RANGE_DIVISOR,
    OUTDOOR_FOLEY_SETBACK, PORTAL_COST_TO_OBSTRUCTION,
};
use crate::math::Vec3;

/// Default sideways jitter for [`obstruction_rays`].
pub const DEFAULT_JITTER: f32 = JITTER;

/// Final perceptual parameters for one source heard by one listener.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Propagation {
    /// Perceived volume in `[0, 1]`.
    pub volume: f32,
    /// Low-pass amount in `[0, 1]`; 1 is unfiltered.
    pub low_pass: f32,
}

impl Propagation {
    pub const SILENT: Self = Self {
        volume: 0.0,
        low_pass: 0.0,
    };
}

/// Floor heuristic: same room, either side outdoors, or room origins within
/// [`FLOOR_SEPARATION`] vertically.
pub fn same_floor(
    same_room: bool,
    either_outdoor: bool,
    source_room_y: f32,
    listener_room_y: f32,
) -> bool {
    same_room || either_outdoor || (source_room_y - listener_room_y).abs() < FLOOR_SEPARATION
}

/// Distance removed from a pathed distance for sound leaking straight
/// through a wall or floor.
///
/// Full strength when source and listener are on top of each other, fading
/// to nothing at a third of the source's max distance.
pub fn leakage(direct_distance: f32, max_distance: f32, leakage_scale: f32) -> f32 {
    let reach = max_distance / LEAKAGE_RANGE_DIVISOR;
    let direct_scale = if reach > 0.0 {
        (direct_distance / reach).clamp(0.0, 1.0)
    } else {
        1.0
    };
    leakage_scale.max(0.0) * LEAKAGE_DISTANCE_SCALE * (1.0 - direct_scale)
}

/// Obstruction accumulated from the travel costs of the nodes on a path,
/// plus the floor-transition penalty, clamped to `[0, 1]`.
pub fn portal_obstruction(travel_costs: impl IntoIterator<Item = f32>, same_floor: bool) -> f32 {
    let mut obstruction: f32 = travel_costs
        .into_iter()
        .map(|c| c / PORTAL_COST_TO_OBSTRUCTION)
        .sum();
    if !same_floor {
        obstruction += FLOOR_TRANSITION_OBSTRUCTION;
    }
    obstruction.clamp(0.0, 1.0)
}

/// Low-pass coefficient from ray and portal obstruction: 1 minus their mean.
pub fn low_pass(ray_obstruction: f32, portal_obstruction: f32) -> f32 {
    let obstruction =
        0.5 * (ray_obstruction.clamp(0.0, 1.0) + portal_obstruction.clamp(0.0, 1.0));
    1.0 - obstruction
}

/// Point `distance` units along the polyline `points`.
///
/// Returns `None` when the polyline is shorter than `distance` or empty.
pub fn point_along(points: &[Vec3], distance: f32) -> Option<Vec3> {
    let mut accumulated = 0.0;
    for pair in points.windows(2) {
        let (start, end) = (pair[0], pair[1]);
        let segment = start.distance(&end);
        if accumulated + segment >= distance {
            if segment <= f32::EPSILON {
                return Some(start);
            }
            let t = (distance - accumulated) / segment;
            return Some(start.lerp(&end, t));
        }
        accumulated += segment;
    }
    None
}

/// Where outdoor ambience is perceived: a few units behind the first portal
/// on its path, on the side away from the listener.
pub fn outdoor_foley_position(first_portal: Vec3, listener: Vec3) -> Vec3 {
    first_portal - (listener - first_portal).normalize() * OUTDOOR_FOLEY_SETBACK
}

/// The nine line segments sampled by an obstruction check.
///
/// Both ends are jittered sideways (perpendicular to the line, in the
/// horizontal plane) by `jitter` units.
pub fn obstruction_rays(source: Vec3, listener: Vec3, jitter: f32) -> [(Vec3, Vec3); RAY_COUNT] {
    let listener_left = (source - listener).cross(&Vec3::UP).normalize() * jitter;
    let source_left = (listener - source).cross(&Vec3::UP).normalize() * jitter;

    let (sl, sr) = (source + source_left, source - source_left);
    let (ll, lr) = (listener + listener_left, listener - listener_left);

    [
        (source, listener),
        (sl, ll),
        (sr, ll),
        (sl, lr),
        (sr, lr),
        (source, ll),
        (source, lr),
        (sl, listener),
        (sr, listener),
    ]
}

/// Fraction of the nine jittered rays that `obstructed` reports as blocked.
///
/// Degenerate inputs (non-finite or coincident endpoints) are unobstructed.
pub fn obstruction_fraction(
    source: Vec3,
    listener: Vec3,
    jitter: f32,
    mut obstructed: impl FnMut(Vec3, Vec3) -> bool,
) -> f32 {
    if !source.is_finite() || !listener.is_finite() || source.distance_squared(&listener) < 1e-12 {
        return 0.0;
    }
    let blocked = obstruction_rays(source, listener, jitter)
        .iter()
        .filter(|(a, b)| obstructed(*a, *b))
        .count();
    blocked as f32 / RAY_COUNT as f32
}
