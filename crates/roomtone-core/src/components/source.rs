//! Sound source components.

use std::collections::HashMap;

use roomtone_logic::smoothing::{SmoothedPosition, VoiceState};
use roomtone_logic::{Cone, Falloff, Path, Vec3};

use super::common::{ListenerId, RoomId};

/// Per-source propagation settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSettings {
    pub falloff: Falloff,
    pub cone: Cone,
    /// Leakage scale through walls, `[0, 1]`.
    pub wall_leakage: f32,
    /// Leakage scale through floors, `[0, 1]`.
    pub floor_leakage: f32,
    pub audible_to_secondary_listeners: bool,
    /// Re-query paths every evaluation instead of on the refresh timer.
    pub force_path_refresh: bool,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            falloff: Falloff::default(),
            cone: Cone::default(),
            wall_leakage: 0.2,
            floor_leakage: 0.0,
            audible_to_secondary_listeners: false,
            force_path_refresh: false,
        }
    }
}

impl SourceSettings {
    pub fn is_outdoor_foley(&self) -> bool {
        self.falloff.model().is_outdoor_foley()
    }
}

/// Last path found from a source toward one listener.
#[derive(Debug, Clone, Default)]
pub struct CachedPath {
    pub path: Path,
    /// Listener's room when the path was found.
    pub listener_room: Option<RoomId>,
    /// Engine time after which the path is re-queried.
    pub next_refresh: f64,
}

/// A positioned emitter of sound.
#[derive(Debug, Clone)]
pub struct Source {
    pub name: String,
    pub settings: SourceSettings,
    pub current_room: Option<RoomId>,
    /// Position at the last topology pass; relinking happens when it changes.
    pub linked_position: Option<Vec3>,
    pub playing: bool,
    pub voice: VoiceState,
    /// Where the primary listener perceives this source.
    pub perceived: SmoothedPosition,
    pub paths: HashMap<ListenerId, CachedPath>,
}

impl Source {
    pub fn new(name: impl Into<String>, settings: SourceSettings, playing: bool) -> Self {
        Self {
            name: name.into(),
            settings,
            current_room: None,
            linked_position: None,
            playing,
            voice: VoiceState::default(),
            perceived: SmoothedPosition::default(),
            paths: HashMap::new(),
        }
    }
}
