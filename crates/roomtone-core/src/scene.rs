//! Scene descriptions: serializable rooms, portals, sources and listeners.
//!
//! A [`SceneDescription`] is what hosts author (as JSON) and what
//! [`PropagationEngine::snapshot`] produces. Rooms are referenced by name
//! so scenes stay readable and survive a save/load round trip.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use roomtone_logic::constants::cone::OMNIDIRECTIONAL;
use roomtone_logic::{AttenuationModel, BoundingBox, Cone, Falloff, FalloffIssue, Vec3};

use crate::components::*;
use crate::config::EngineConfig;
use crate::engine::PropagationEngine;
use crate::error::SceneError;

/// A room to register.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomDesc {
    pub name: String,
    pub bounds: Vec<BoundingBox>,
    pub outdoor: bool,
    /// Reference point for the floor heuristic. Defaults to the center of
    /// the first bounding box.
    pub origin: Option<Vec3>,
}

impl RoomDesc {
    pub fn indoor(name: impl Into<String>, bounds: Vec<BoundingBox>) -> Self {
        Self {
            name: name.into(),
            bounds,
            outdoor: false,
            origin: None,
        }
    }

    pub fn outdoor(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bounds: Vec::new(),
            outdoor: true,
            origin: None,
        }
    }

    pub fn resolved_origin(&self) -> Vec3 {
        self.origin
            .or_else(|| self.bounds.first().map(|b| b.center()))
            .unwrap_or(Vec3::ZERO)
    }
}

/// A portal to register, with rooms given by handle.
#[derive(Debug, Clone, PartialEq)]
pub struct PortalSpec {
    pub name: String,
    pub position: Vec3,
    /// `None` joins the outdoor room.
    pub first_room: Option<RoomId>,
    pub second_room: Option<RoomId>,
    pub open_close: f32,
    pub obstruction: f32,
}

impl PortalSpec {
    /// An open portal that fully blocks sound when closed.
    pub fn new(
        name: impl Into<String>,
        position: Vec3,
        first_room: Option<RoomId>,
        second_room: Option<RoomId>,
    ) -> Self {
        Self {
            name: name.into(),
            position,
            first_room,
            second_room,
            open_close: 0.0,
            obstruction: 1.0,
        }
    }

    pub fn closed(mut self) -> Self {
        self.open_close = 1.0;
        self
    }

    pub fn with_obstruction(mut self, obstruction: f32) -> Self {
        self.obstruction = obstruction;
        self
    }
}

/// A portal in a scene file, with rooms given by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalDesc {
    pub name: String,
    pub position: Vec3,
    pub first_room: Option<String>,
    pub second_room: Option<String>,
    pub open_close: f32,
    pub obstruction: f32,
}

impl Default for PortalDesc {
    fn default() -> Self {
        Self {
            name: String::new(),
            position: Vec3::ZERO,
            first_room: None,
            second_room: None,
            open_close: 0.0,
            obstruction: 1.0,
        }
    }
}

/// A sound source to register.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceDesc {
    pub name: String,
    pub position: Vec3,
    pub forward: Vec3,
    pub attenuation: AttenuationModel,
    pub min_distance: f32,
    pub max_distance: f32,
    pub max_volume: f32,
    /// Inner cone angle in degrees; 360 is omnidirectional.
    pub inner_angle: f32,
    pub outer_angle: f32,
    pub wall_leakage: f32,
    pub floor_leakage: f32,
    pub audible_to_secondary_listeners: bool,
    pub force_path_refresh: bool,
    pub play_on_start: bool,
}

impl Default for SourceDesc {
    fn default() -> Self {
        let settings = SourceSettings::default();
        Self {
            name: String::new(),
            position: Vec3::ZERO,
            forward: Vec3::FORWARD,
            attenuation: settings.falloff.model().clone(),
            min_distance: settings.falloff.min_distance(),
            max_distance: settings.falloff.max_distance(),
            max_volume: settings.falloff.max_volume(),
            inner_angle: OMNIDIRECTIONAL,
            outer_angle: OMNIDIRECTIONAL,
            wall_leakage: settings.wall_leakage,
            floor_leakage: settings.floor_leakage,
            audible_to_secondary_listeners: false,
            force_path_refresh: false,
            play_on_start: true,
        }
    }
}

impl SourceDesc {
    pub fn new(name: impl Into<String>, position: Vec3) -> Self {
        Self {
            name: name.into(),
            position,
            ..Default::default()
        }
    }

    /// Validated settings plus every falloff correction that was applied.
    pub fn settings(&self) -> (SourceSettings, Vec<FalloffIssue>) {
        let (falloff, issues) = Falloff::validated(
            self.attenuation.clone(),
            self.min_distance,
            self.max_distance,
            self.max_volume,
        );
        let settings = SourceSettings {
            falloff,
            cone: Cone::new(self.inner_angle, self.outer_angle),
            wall_leakage: clamp_unit(self.wall_leakage),
            floor_leakage: clamp_unit(self.floor_leakage),
            audible_to_secondary_listeners: self.audible_to_secondary_listeners,
            force_path_refresh: self.force_path_refresh,
        };
        (settings, issues)
    }
}

/// A listener to register.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerDesc {
    pub name: String,
    pub position: Vec3,
    pub primary: bool,
}

impl ListenerDesc {
    pub fn primary(name: impl Into<String>, position: Vec3) -> Self {
        Self {
            name: name.into(),
            position,
            primary: true,
        }
    }

    pub fn secondary(name: impl Into<String>, position: Vec3) -> Self {
        Self {
            name: name.into(),
            position,
            primary: false,
        }
    }
}

/// Everything needed to rebuild an engine.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneDescription {
    pub config: EngineConfig,
    pub rooms: Vec<RoomDesc>,
    pub portals: Vec<PortalDesc>,
    pub sources: Vec<SourceDesc>,
    pub listeners: Vec<ListenerDesc>,
}

impl SceneDescription {
    pub fn from_json(json: &str) -> Result<Self, SceneError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, SceneError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Handles of everything a scene registered, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct SceneHandles {
    pub rooms: HashMap<String, RoomId>,
    pub portals: HashMap<String, PortalId>,
    pub sources: HashMap<String, SourceId>,
    pub listeners: HashMap<String, ListenerId>,
}

impl PropagationEngine {
    /// Build an engine from a scene. Rooms first, then portals, sources
    /// and listeners, each in scene order.
    pub fn from_scene(scene: &SceneDescription) -> Result<(Self, SceneHandles), SceneError> {
        let mut engine = PropagationEngine::new(scene.config.clone());
        let mut handles = SceneHandles::default();

        for room in &scene.rooms {
            if handles.rooms.contains_key(&room.name) {
                return Err(SceneError::DuplicateRoom(room.name.clone()));
            }
            let id = engine.add_room(room.clone());
            handles.rooms.insert(room.name.clone(), id);
        }

        for portal in &scene.portals {
            let resolve = |name: &Option<String>| -> Result<Option<RoomId>, SceneError> {
                match name {
                    None => Ok(None),
                    Some(room) => handles.rooms.get(room).copied().map(Some).ok_or_else(|| {
                        SceneError::UnknownRoom {
                            portal: portal.name.clone(),
                            room: room.clone(),
                        }
                    }),
                }
            };
            let spec = PortalSpec {
                name: portal.name.clone(),
                position: portal.position,
                first_room: resolve(&portal.first_room)?,
                second_room: resolve(&portal.second_room)?,
                open_close: portal.open_close,
                obstruction: portal.obstruction,
            };
            // Rooms were resolved above, so registration cannot fail.
            if let Ok(id) = engine.add_portal(spec) {
                handles.portals.insert(portal.name.clone(), id);
            }
        }

        for source in &scene.sources {
            let id = engine.add_source(source.clone());
            handles.sources.insert(source.name.clone(), id);
        }

        for listener in &scene.listeners {
            let id = engine.add_listener(listener.clone());
            handles.listeners.insert(listener.name.clone(), id);
        }

        log::info!(
            "loaded scene: {} rooms, {} portals, {} sources, {} listeners",
            scene.rooms.len(),
            scene.portals.len(),
            scene.sources.len(),
            scene.listeners.len()
        );
        Ok((engine, handles))
    }

    /// Parse a JSON scene and build an engine from it.
    pub fn from_json(json: &str) -> Result<(Self, SceneHandles), SceneError> {
        Self::from_scene(&SceneDescription::from_json(json)?)
    }

    /// Describe the current registrations as a scene.
    ///
    /// Runtime state (cached paths, audibility, smoothing) is not included.
    pub fn snapshot(&self) -> SceneDescription {
        let room_name = |id: Option<RoomId>| -> Option<String> {
            id.and_then(|id| self.world.get::<&Room>(id.0).ok().map(|r| r.name.clone()))
        };

        let rooms = self
            .rooms()
            .iter()
            .filter_map(|id| self.world.get::<&Room>(id.0).ok())
            .map(|room| RoomDesc {
                name: room.name.clone(),
                bounds: room.bounds.clone(),
                outdoor: room.is_outdoor,
                origin: Some(room.origin),
            })
            .collect();

        let portals = self
            .portals()
            .iter()
            .filter_map(|id| {
                let portal = self.world.get::<&Portal>(id.0).ok()?;
                let transform = self.world.get::<&Transform>(id.0).ok()?;
                Some(PortalDesc {
                    name: portal.name.clone(),
                    position: transform.position,
                    first_room: room_name(portal.first_room),
                    second_room: room_name(portal.second_room),
                    open_close: portal.open_close,
                    obstruction: portal.obstruction,
                })
            })
            .collect();

        let sources = self
            .sources()
            .iter()
            .filter_map(|id| {
                let source = self.world.get::<&Source>(id.0).ok()?;
                let transform = self.world.get::<&Transform>(id.0).ok()?;
                let s = &source.settings;
                Some(SourceDesc {
                    name: source.name.clone(),
                    position: transform.position,
                    forward: transform.forward,
                    attenuation: s.falloff.model().clone(),
                    min_distance: s.falloff.min_distance(),
                    max_distance: s.falloff.max_distance(),
                    max_volume: s.falloff.max_volume(),
                    inner_angle: s.cone.inner(),
                    outer_angle: s.cone.outer(),
                    wall_leakage: s.wall_leakage,
                    floor_leakage: s.floor_leakage,
                    audible_to_secondary_listeners: s.audible_to_secondary_listeners,
                    force_path_refresh: s.force_path_refresh,
                    play_on_start: source.playing,
                })
            })
            .collect();

        let listeners = self
            .listeners()
            .iter()
            .filter_map(|id| {
                let listener = self.world.get::<&Listener>(id.0).ok()?;
                let transform = self.world.get::<&Transform>(id.0).ok()?;
                Some(ListenerDesc {
                    name: listener.name.clone(),
                    position: transform.position,
                    primary: listener.primary,
                })
            })
            .collect();

        SceneDescription {
            config: self.config().clone(),
            rooms,
            portals,
            sources,
            listeners,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUSE: &str = r#"{
        "config": { "seed": 3 },
        "rooms": [
            { "name": "Kitchen", "bounds": [{ "min": { "x": 0, "y": 0, "z": 0 }, "max": { "x": 5, "y": 3, "z": 5 } }] },
            { "name": "Hall", "bounds": [{ "min": { "x": 5, "y": 0, "z": 0 }, "max": { "x": 10, "y": 3, "z": 5 } }] },
            { "name": "Garden", "outdoor": true }
        ],
        "portals": [
            { "name": "Kitchen door", "position": { "x": 5, "y": 1, "z": 2.5 }, "first_room": "Kitchen", "second_room": "Hall" },
            { "name": "Front door", "position": { "x": 10, "y": 1, "z": 2.5 }, "first_room": "Hall", "open_close": 1.0 }
        ],
        "sources": [
            { "name": "Kettle", "position": { "x": 1, "y": 1, "z": 1 }, "attenuation": "Linear", "max_distance": 15 }
        ],
        "listeners": [
            { "name": "Player", "position": { "x": 8, "y": 1, "z": 2 }, "primary": true }
        ]
    }"#;

    #[test]
    fn test_load_json_scene() {
        let (engine, handles) = PropagationEngine::from_json(HOUSE).unwrap();
        assert_eq!(engine.counts(), (3, 2, 1, 1));
        assert_eq!(engine.config().seed, Some(3));

        let front = engine.portal(handles.portals["Front door"]).unwrap();
        assert_eq!(front.second_room, None);
        assert_eq!(front.joined.map(|(_, b)| b), Some(handles.rooms["Garden"]));
        assert!(!front.opened);

        let kettle = engine.source(handles.sources["Kettle"]).unwrap();
        assert_eq!(kettle.current_room, Some(handles.rooms["Kitchen"]));
        assert_eq!(kettle.settings.falloff.max_distance(), 15.0);
        assert_eq!(engine.primary_listener(), Some(handles.listeners["Player"]));
    }

    #[test]
    fn test_unknown_room_is_reported() {
        let json = r#"{ "portals": [ { "name": "Hatch", "first_room": "Attic" } ] }"#;
        match PropagationEngine::from_json(json) {
            Err(SceneError::UnknownRoom { portal, room }) => {
                assert_eq!(portal, "Hatch");
                assert_eq!(room, "Attic");
            }
            other => panic!("expected unknown room, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_duplicate_room_is_reported() {
        let json = r#"{ "rooms": [ { "name": "A" }, { "name": "A" } ] }"#;
        assert!(matches!(
            PropagationEngine::from_json(json),
            Err(SceneError::DuplicateRoom(name)) if name == "A"
        ));
    }

    #[test]
    fn test_snapshot_rebuilds_same_scene() {
        let (engine, _) = PropagationEngine::from_json(HOUSE).unwrap();
        let snapshot = engine.snapshot();
        let (rebuilt, _) = PropagationEngine::from_scene(&snapshot).unwrap();
        assert_eq!(rebuilt.snapshot(), snapshot);
        assert_eq!(snapshot.portals[1].first_room.as_deref(), Some("Hall"));
        assert_eq!(snapshot.sources[0].attenuation, AttenuationModel::Linear);
    }

    #[test]
    fn test_source_desc_validates_settings() {
        let desc = SourceDesc {
            min_distance: 0.0,
            wall_leakage: 3.0,
            inner_angle: 90.0,
            outer_angle: 45.0,
            ..SourceDesc::new("Broken", Vec3::ZERO)
        };
        let (settings, issues) = desc.settings();
        assert_eq!(issues.len(), 1);
        assert_eq!(settings.wall_leakage, 1.0);
        assert_eq!(settings.cone.outer(), 90.0);
    }
}
