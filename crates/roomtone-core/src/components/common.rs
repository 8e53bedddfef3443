//! Identity and placement components shared by every kind of entity.

use hecs::Entity;
use roomtone_logic::{NodeId, Vec3};

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub(crate) Entity);

        impl $name {
            /// The ECS entity backing this handle.
            pub fn entity(self) -> Entity {
                self.0
            }
        }
    };
}

entity_id!(
    /// Handle to a registered room.
    RoomId
);
entity_id!(
    /// Handle to a registered portal.
    PortalId
);
entity_id!(
    /// Handle to a registered sound source.
    SourceId
);
entity_id!(
    /// Handle to a registered listener.
    ListenerId
);

/// World-space placement of an entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    /// Facing direction; only sources use it, for their emission cone.
    pub forward: Vec3,
}

impl Transform {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            forward: Vec3::FORWARD,
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::at(Vec3::ZERO)
    }
}

/// The path graph node that represents an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathAnchor(pub NodeId);
