//! Room components: bounded spaces joined by portals.

use roomtone_logic::{BoundingBox, Vec3};

use super::common::{PortalId, RoomId};

/// Name given to the outdoor room synthesized when none is registered.
pub const SYNTHESIZED_OUTDOOR_NAME: &str = "Outdoor Room";

/// A portal leading out of a room and the room on its other side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectedRoom {
    pub portal: PortalId,
    pub room: RoomId,
}

/// A volume that sound fills uniformly.
#[derive(Debug, Clone)]
pub struct Room {
    pub name: String,
    /// Union of boxes making up the room. Empty for outdoor rooms.
    pub bounds: Vec<BoundingBox>,
    pub is_outdoor: bool,
    /// Reference point for the floor heuristic.
    pub origin: Vec3,
    /// Portal/room pairs in portal registration order.
    pub connections: Vec<ConnectedRoom>,
}

impl Room {
    pub fn new(name: impl Into<String>, bounds: Vec<BoundingBox>, is_outdoor: bool, origin: Vec3) -> Self {
        Self {
            name: name.into(),
            bounds,
            is_outdoor,
            origin,
            connections: Vec::new(),
        }
    }

    /// Does any of the room's boxes contain `point`?
    pub fn contains(&self, point: &Vec3) -> bool {
        self.bounds.iter().any(|b| b.contains(point))
    }

    /// First portal leading directly to `room`, if any.
    pub fn portal_to(&self, room: RoomId) -> Option<PortalId> {
        self.connections
            .iter()
            .find(|c| c.room == room)
            .map(|c| c.portal)
    }

    pub fn portals(&self) -> impl Iterator<Item = PortalId> + '_ {
        self.connections.iter().map(|c| c.portal)
    }

    /// Record a portal leading to `room`. Returns false if this portal was
    /// already recorded.
    pub fn connect(&mut self, portal: PortalId, room: RoomId) -> bool {
        if self.connections.iter().any(|c| c.portal == portal) {
            return false;
        }
        self.connections.push(ConnectedRoom { portal, room });
        true
    }

    /// Forget every connection through `portal`.
    pub fn disconnect_portal(&mut self, portal: PortalId) {
        self.connections.retain(|c| c.portal != portal);
    }
}
