//! Tuning constants for the perceptual propagation model.
//!
//! Grouped by the stage of the pipeline that consumes them. Values are in
//! world units (distance), degrees (angles) or normalized `[0, 1]` amounts.

pub mod portal {
    /// Multiplier applied to `open_close × obstruction` to get a node travel cost.
    pub const OBSTRUCTION_COST_SCALE: f32 = 10.0;
    /// Travel cost floor; an open portal still costs this much to cross.
    pub const MIN_TRAVEL_COST: f32 = 0.1;
}

pub mod cone {
    /// A cone this wide emits in every direction.
    pub const OMNIDIRECTIONAL: f32 = 360.0;
    /// Distance added when the listener is outside the outer cone.
    pub const OUTER_PENALTY: f32 = 4.0;
    /// Distance added when the listener is between the inner and outer cone.
    pub const INNER_PENALTY: f32 = 2.0;
}

pub mod falloff {
    /// Smallest allowed minimum distance.
    pub const MIN_DISTANCE_FLOOR: f32 = 0.1;
    /// Smallest allowed gap between minimum and maximum distance.
    pub const MIN_DISTANCE_SPAN: f32 = 0.1;
}

pub mod pathing {
    /// Rooms whose origins differ vertically by less than this are one floor.
    pub const FLOOR_SEPARATION: f32 = 5.0;
    /// Node travel cost that amounts to full obstruction along a path.
    pub const PORTAL_COST_TO_OBSTRUCTION: f32 = 10.0;
    /// Obstruction added when source and listener are on different floors.
    pub const FLOOR_TRANSITION_OBSTRUCTION: f32 = 0.5;
    /// Leakage fades out at `max_distance / LEAKAGE_RANGE_DIVISOR`.
    pub const LEAKAGE_RANGE_DIVISOR: f32 = 3.0;
    /// Distance removed at full leakage with a leakage scale of 1.
    pub const LEAKAGE_DISTANCE_SCALE: f32 = 100.0;
    /// Outdoor sources only link to portals within this share of max distance.
    pub const OUTDOOR_PORTAL_REACH: f32 = 0.4;
    /// Pathed sources are perceived this far along their path.
    pub const PERCEIVED_PATH_FRACTION: f32 = 0.25;
    /// Outdoor foley is placed this far behind the first portal.
    pub const OUTDOOR_FOLEY_SETBACK: f32 = 3.0;
}

pub mod obstruction {
    /// Sideways offset of the jittered ray endpoints.
    pub const JITTER: f32 = 0.25;
    /// Rays cast per obstruction check.
    pub const RAY_COUNT: usize = 9;
}

pub mod audibility {
    /// Volumes above this count as audible for "last heard" bookkeeping.
    pub const THRESHOLD: f32 = 0.01;
    /// Exponential approach rate for voice volume and low-pass, per second.
    pub const VOICE_SMOOTHING_RATE: f32 = 3.0;
    /// Approach rate of the perceived position toward its target, per second.
    pub const POSITION_SMOOTHING_RATE: f32 = 1.0;
}
