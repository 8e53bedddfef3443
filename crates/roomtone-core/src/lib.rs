//! Roomtone Core - room/portal sound propagation engine
//!
//! Decides how loud, how muffled and from where each sound source is heard
//! by each listener, given rooms joined by portals.
//!
//! # Architecture
//!
//! The engine keeps its entities in an ECS world via `hecs`:
//! - **Entities**: rooms, portals, sources, listeners
//! - **Components**: pure data attached to entities (Room, Portal, Source, Transform, ...)
//! - **Systems**: portal animation, topology relinking, audibility tracking
//!
//! Portals, sources and listeners each own a node in a shared
//! [`PathGraph`](roomtone_logic::PathGraph). Sound in the listener's room is
//! heard directly; everywhere else it travels the cheapest portal path.
//!
//! # Example
//!
//! ```rust,no_run
//! use roomtone_core::prelude::*;
//!
//! let mut engine = PropagationEngine::default();
//! let kitchen = engine.add_room(RoomDesc::indoor(
//!     "Kitchen",
//!     vec![BoundingBox::new(Vec3::ZERO, Vec3::new(5.0, 3.0, 5.0))],
//! ));
//! engine.add_portal(PortalSpec::new("Back door", Vec3::new(5.0, 1.0, 2.5), Some(kitchen), None)).unwrap();
//! engine.add_source(SourceDesc::new("Kettle", Vec3::new(1.0, 1.0, 1.0)));
//! engine.add_listener(ListenerDesc::primary("Player", Vec3::new(9.0, 1.0, 2.5)));
//!
//! let mut output = CollectingOutput::default();
//! loop {
//!     output.clear();
//!     engine.update(1.0 / 60.0, &Unobstructed, &mut output);
//! }
//! ```

pub mod components;
pub mod config;
pub mod engine;
pub mod error;
pub mod host;
pub mod persistence;
pub mod scene;
pub mod systems;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::components::*;
    pub use crate::config::{EngineConfig, RefreshInterval};
    pub use crate::engine::PropagationEngine;
    pub use crate::error::{EngineError, SaveError, SceneError};
    pub use crate::host::{CollectingOutput, NullOutput, ObstructionQuery, Unobstructed, VoiceOutput};
    pub use crate::scene::{
        ListenerDesc, PortalDesc, PortalSpec, RoomDesc, SceneDescription, SceneHandles, SourceDesc,
    };
    pub use roomtone_logic::smoothing::VoiceState;
    pub use roomtone_logic::{AttenuationModel, BoundingBox, Curve, Propagation, Vec3};
}
