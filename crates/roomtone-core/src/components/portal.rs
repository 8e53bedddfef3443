//! Portal components: openings between two rooms.

use roomtone_logic::portal::travel_cost;

use super::common::RoomId;

/// A doorway, window or hatch joining two rooms.
///
/// A missing side is resolved to the outdoor room when the portal is
/// registered; `first_room`/`second_room` keep what the caller asked for.
#[derive(Debug, Clone)]
pub struct Portal {
    pub name: String,
    pub first_room: Option<RoomId>,
    pub second_room: Option<RoomId>,
    /// Rooms actually joined once registration resolved missing sides.
    pub joined: Option<(RoomId, RoomId)>,
    /// 0 fully open, 1 fully closed.
    pub open_close: f32,
    /// How much a closed portal blocks sound, in `[0, 1]`.
    pub obstruction: f32,
    /// Logical state driven by open/close/toggle.
    pub opened: bool,
    /// Set once the portal's node has been linked to its rooms' portals.
    pub initialised: bool,
}

impl Portal {
    pub fn new(name: impl Into<String>, open_close: f32, obstruction: f32) -> Self {
        let open_close = clamp_unit(open_close);
        Self {
            name: name.into(),
            first_room: None,
            second_room: None,
            joined: None,
            open_close,
            obstruction: clamp_unit(obstruction),
            opened: open_close < 0.5,
            initialised: false,
        }
    }

    pub fn travel_cost(&self) -> f32 {
        travel_cost(self.open_close, self.obstruction)
    }

    pub fn joins(&self, room: RoomId) -> bool {
        matches!(self.joined, Some((a, b)) if a == room || b == room)
    }
}

/// Clamp to `[0, 1]`, mapping NaN to 0.
pub(crate) fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
