//! Propagation engine - main entry point for hosts

use hecs::World;
use rand::rngs::StdRng;
use rand::SeedableRng;
use roomtone_logic::{PathGraph, Propagation, Vec3};
use roomtone_logic::smoothing::VoiceState;

use crate::components::*;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::host::{ObstructionQuery, VoiceOutput};
use crate::scene::{ListenerDesc, PortalSpec, RoomDesc, SourceDesc};
use crate::systems::*;

/// Room/portal sound propagation for one world.
///
/// Owns the ECS world holding rooms, portals, sources and listeners, and
/// the path graph their nodes live in. Hosts register geometry, move
/// entities, and call [`PropagationEngine::update`] once per frame.
pub struct PropagationEngine {
    /// ECS world containing all entities
    pub world: World,
    /// Path graph shared by portals, sources and listeners
    pub graph: PathGraph,
    config: EngineConfig,
    rooms: Vec<RoomId>,
    portals: Vec<PortalId>,
    sources: Vec<SourceId>,
    listeners: Vec<ListenerId>,
    outdoor_room: Option<RoomId>,
    primary_listener: Option<ListenerId>,
    /// Seconds since the engine was created
    time: f64,
    rng: StdRng,
}

impl Default for PropagationEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl PropagationEngine {
    /// Create an empty engine. Invalid config values are logged and replaced.
    pub fn new(config: EngineConfig) -> Self {
        for issue in config.validate() {
            log::warn!("engine config: {}", issue);
        }
        let config = config.sanitized();
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            world: World::new(),
            graph: PathGraph::new(),
            config,
            rooms: Vec::new(),
            portals: Vec::new(),
            sources: Vec::new(),
            listeners: Vec::new(),
            outdoor_room: None,
            primary_listener: None,
            time: 0.0,
            rng,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Seconds of simulated time since creation.
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn rooms(&self) -> &[RoomId] {
        &self.rooms
    }

    pub fn portals(&self) -> &[PortalId] {
        &self.portals
    }

    pub fn sources(&self) -> &[SourceId] {
        &self.sources
    }

    pub fn listeners(&self) -> &[ListenerId] {
        &self.listeners
    }

    pub fn primary_listener(&self) -> Option<ListenerId> {
        self.primary_listener
    }

    // ----- Rooms -----

    /// Register a room. The most recently registered outdoor room is the one
    /// every unbounded position falls into.
    pub fn add_room(&mut self, desc: RoomDesc) -> RoomId {
        let origin = desc.resolved_origin();
        let room = Room::new(desc.name, desc.bounds, desc.outdoor, origin);
        let is_outdoor = room.is_outdoor;
        log::info!("registered room '{}' (outdoor: {})", room.name, is_outdoor);

        let id = RoomId(self.world.spawn((room,)));
        self.rooms.push(id);
        if is_outdoor {
            self.outdoor_room = Some(id);
        }
        id
    }

    /// The outdoor room, synthesized on first use when none was registered.
    pub fn outdoor_room(&mut self) -> RoomId {
        match self.outdoor_room {
            Some(id) => id,
            None => {
                log::info!("no outdoor room registered, creating '{}'", SYNTHESIZED_OUTDOOR_NAME);
                self.add_room(RoomDesc::outdoor(SYNTHESIZED_OUTDOOR_NAME))
            }
        }
    }

    /// Room containing `position`; indoor rooms win over the outdoor room.
    pub fn room_for_position(&mut self, position: Vec3) -> RoomId {
        let outdoor = self.outdoor_room();
        classify_position(&self.world, &self.rooms, outdoor, position)
    }

    pub fn room(&self, id: RoomId) -> Result<Room, EngineError> {
        self.world
            .get::<&Room>(id.0)
            .map(|r| (*r).clone())
            .map_err(|_| EngineError::UnknownRoom(id))
    }

    pub fn room_by_name(&self, name: &str) -> Option<RoomId> {
        self.rooms
            .iter()
            .copied()
            .find(|id| self.world.get::<&Room>(id.0).map(|r| r.name == name).unwrap_or(false))
    }

    /// Remove a room along with every portal that joins it. Sources and
    /// listeners inside are reclassified on the next update.
    pub fn remove_room(&mut self, id: RoomId) -> Result<(), EngineError> {
        if !self.rooms.contains(&id) {
            return Err(EngineError::UnknownRoom(id));
        }

        let joined: Vec<PortalId> = self
            .portals
            .iter()
            .copied()
            .filter(|p| self.world.get::<&Portal>(p.0).map(|p| p.joins(id)).unwrap_or(false))
            .collect();
        for portal in joined {
            self.remove_portal(portal)?;
        }

        for &source in &self.sources {
            if let Ok(mut s) = self.world.get::<&mut Source>(source.0) {
                if s.current_room == Some(id) {
                    s.current_room = None;
                    s.linked_position = None;
                    s.paths.clear();
                }
            }
        }
        for &listener in &self.listeners {
            if let Ok(mut l) = self.world.get::<&mut Listener>(listener.0) {
                if l.current_room == Some(id) {
                    l.current_room = None;
                }
            }
        }

        let _ = self.world.despawn(id.0);
        self.rooms.retain(|r| *r != id);
        if self.outdoor_room == Some(id) {
            self.outdoor_room = self.rooms.iter().rev().copied().find(|r| {
                self.world.get::<&Room>(r.0).map(|r| r.is_outdoor).unwrap_or(false)
            });
        }
        self.invalidate_paths();
        log::info!("removed room {:?}", id);
        Ok(())
    }

    // ----- Portals -----

    /// Register a portal and link it into the graph. A missing side joins
    /// the outdoor room.
    pub fn add_portal(&mut self, spec: PortalSpec) -> Result<PortalId, EngineError> {
        for room in [spec.first_room, spec.second_room].into_iter().flatten() {
            if !self.rooms.contains(&room) {
                return Err(EngineError::UnknownRoom(room));
            }
        }
        let first = match spec.first_room {
            Some(r) => r,
            None => self.outdoor_room(),
        };
        let second = match spec.second_room {
            Some(r) => r,
            None => self.outdoor_room(),
        };

        let mut portal = Portal::new(spec.name, spec.open_close, spec.obstruction);
        portal.first_room = spec.first_room;
        portal.second_room = spec.second_room;
        let node = self.graph.add_node(spec.position);
        self.graph.set_travel_cost(node, portal.travel_cost());
        log::info!("registered portal '{}'", portal.name);

        let id = PortalId(self.world.spawn((portal, Transform::at(spec.position), PathAnchor(node))));
        self.portals.push(id);
        register_portal(&mut self.world, &mut self.graph, id, first, second);

        // Occupants of the joined rooms gain the new doorway.
        for &source in &self.sources {
            let inside = self
                .world
                .get::<&Source>(source.0)
                .map(|s| s.current_room == Some(first) || s.current_room == Some(second))
                .unwrap_or(false);
            if inside {
                link_source(&self.world, &mut self.graph, source);
            }
        }
        for &listener in &self.listeners {
            let inside = self
                .world
                .get::<&Listener>(listener.0)
                .map(|l| l.current_room == Some(first) || l.current_room == Some(second))
                .unwrap_or(false);
            if inside {
                link_listener(&self.world, &mut self.graph, listener);
            }
        }
        self.invalidate_paths();
        Ok(id)
    }

    pub fn remove_portal(&mut self, id: PortalId) -> Result<(), EngineError> {
        let node = self.portal_node(id)?;
        unregister_portal(&mut self.world, id);
        self.graph.remove_node(node);
        let _ = self.world.despawn(id.0);
        self.portals.retain(|p| *p != id);
        self.invalidate_paths();
        log::info!("removed portal {:?}", id);
        Ok(())
    }

    pub fn portal(&self, id: PortalId) -> Result<Portal, EngineError> {
        self.world
            .get::<&Portal>(id.0)
            .map(|p| (*p).clone())
            .map_err(|_| EngineError::UnknownPortal(id))
    }

    fn portal_node(&self, id: PortalId) -> Result<roomtone_logic::NodeId, EngineError> {
        if self.world.get::<&Portal>(id.0).is_err() {
            return Err(EngineError::UnknownPortal(id));
        }
        self.world
            .get::<&PathAnchor>(id.0)
            .map(|a| a.0)
            .map_err(|_| EngineError::UnknownPortal(id))
    }

    fn update_portal<F: FnOnce(&mut Portal)>(&mut self, id: PortalId, f: F) -> Result<(), EngineError> {
        let node = self.portal_node(id)?;
        let cost = {
            let mut portal = self
                .world
                .get::<&mut Portal>(id.0)
                .map_err(|_| EngineError::UnknownPortal(id))?;
            f(&mut *portal);
            portal.travel_cost()
        };
        self.graph.set_travel_cost(node, cost);
        Ok(())
    }

    /// Set how closed a portal is, cancelling any running animation.
    pub fn set_portal_open_close(&mut self, id: PortalId, open_close: f32) -> Result<(), EngineError> {
        self.update_portal(id, |p| {
            p.open_close = clamp_unit(open_close);
        })?;
        let _ = self.world.remove_one::<PortalLerp>(id.0);
        Ok(())
    }

    pub fn set_portal_obstruction(&mut self, id: PortalId, obstruction: f32) -> Result<(), EngineError> {
        self.update_portal(id, |p| p.obstruction = clamp_unit(obstruction))
    }

    /// Move a portal's node. Paths pick the new position up on refresh.
    pub fn set_portal_position(&mut self, id: PortalId, position: Vec3) -> Result<(), EngineError> {
        let node = self.portal_node(id)?;
        if let Ok(mut t) = self.world.get::<&mut Transform>(id.0) {
            t.position = position;
        }
        self.graph.set_position(node, position);
        Ok(())
    }

    /// Animate a portal fully open over `duration` seconds.
    pub fn open_portal(&mut self, id: PortalId, duration: f32) -> Result<(), EngineError> {
        self.animate_portal(id, true, duration)
    }

    /// Animate a portal fully closed over `duration` seconds.
    pub fn close_portal(&mut self, id: PortalId, duration: f32) -> Result<(), EngineError> {
        self.animate_portal(id, false, duration)
    }

    /// Open a closed portal or close an open one.
    pub fn toggle_portal(&mut self, id: PortalId, duration: f32) -> Result<(), EngineError> {
        let opened = self.portal(id)?.opened;
        self.animate_portal(id, !opened, duration)
    }

    fn animate_portal(&mut self, id: PortalId, open: bool, duration: f32) -> Result<(), EngineError> {
        let mut start = 0.0;
        self.update_portal(id, |p| {
            p.opened = open;
            start = p.open_close;
        })?;
        let target = if open { 0.0 } else { 1.0 };
        let _ = self
            .world
            .insert_one(id.0, PortalLerp::new(start, target, duration));
        Ok(())
    }

    // ----- Sources -----

    /// Register a source, classify its room and link it into the graph.
    pub fn add_source(&mut self, desc: SourceDesc) -> SourceId {
        let (settings, issues) = desc.settings();
        for issue in issues {
            log::warn!("source '{}': {:?}", desc.name, issue);
        }
        let transform = Transform {
            position: desc.position,
            forward: desc.forward,
        };
        let node = self.graph.add_node(desc.position);
        let room = self.room_for_position(desc.position);

        let mut source = Source::new(desc.name, settings, desc.play_on_start);
        source.current_room = Some(room);
        source.linked_position = Some(desc.position);
        log::debug!("registered source '{}' in room {:?}", source.name, room);

        let id = SourceId(self.world.spawn((source, transform, PathAnchor(node))));
        self.sources.push(id);
        link_source(&self.world, &mut self.graph, id);
        id
    }

    /// Remove a source and purge it from every listener's audibility table.
    pub fn remove_source(&mut self, id: SourceId) -> Result<(), EngineError> {
        let node = self.source_node(id)?;
        for &listener in &self.listeners {
            if let Ok(mut l) = self.world.get::<&mut Listener>(listener.0) {
                l.audibility.remove(id);
            }
        }
        self.graph.remove_node(node);
        let _ = self.world.despawn(id.0);
        self.sources.retain(|s| *s != id);
        self.invalidate_paths();
        log::info!("removed source {:?}", id);
        Ok(())
    }

    fn source_node(&self, id: SourceId) -> Result<roomtone_logic::NodeId, EngineError> {
        if self.world.get::<&Source>(id.0).is_err() {
            return Err(EngineError::UnknownSource(id));
        }
        self.world
            .get::<&PathAnchor>(id.0)
            .map(|a| a.0)
            .map_err(|_| EngineError::UnknownSource(id))
    }

    pub fn source(&self, id: SourceId) -> Result<Source, EngineError> {
        self.world
            .get::<&Source>(id.0)
            .map(|s| (*s).clone())
            .map_err(|_| EngineError::UnknownSource(id))
    }

    pub fn source_by_name(&self, name: &str) -> Option<SourceId> {
        self.sources
            .iter()
            .copied()
            .find(|id| self.world.get::<&Source>(id.0).map(|s| s.name == name).unwrap_or(false))
    }

    /// Move a source. Room and links follow on the next update.
    pub fn set_source_position(&mut self, id: SourceId, position: Vec3) -> Result<(), EngineError> {
        self.source_node(id)?;
        if let Ok(mut t) = self.world.get::<&mut Transform>(id.0) {
            t.position = position;
        }
        Ok(())
    }

    pub fn set_source_forward(&mut self, id: SourceId, forward: Vec3) -> Result<(), EngineError> {
        self.source_node(id)?;
        if let Ok(mut t) = self.world.get::<&mut Transform>(id.0) {
            t.forward = forward;
        }
        Ok(())
    }

    pub fn set_force_path_refresh(&mut self, id: SourceId, force: bool) -> Result<(), EngineError> {
        self.with_source(id, |s| s.settings.force_path_refresh = force)
    }

    /// Start a source. Its voice snaps to the next evaluated parameters.
    pub fn play_source(&mut self, id: SourceId) -> Result<(), EngineError> {
        self.with_source(id, |s| {
            if !s.playing {
                s.voice.reset();
            }
            s.playing = true;
        })
    }

    /// Stop a source. Listeners record it as silent from the next update.
    pub fn stop_source(&mut self, id: SourceId) -> Result<(), EngineError> {
        self.with_source(id, |s| {
            s.playing = false;
            s.voice = VoiceState::default();
        })
    }

    fn with_source<F: FnOnce(&mut Source)>(&mut self, id: SourceId, f: F) -> Result<(), EngineError> {
        let mut source = self
            .world
            .get::<&mut Source>(id.0)
            .map_err(|_| EngineError::UnknownSource(id))?;
        f(&mut *source);
        Ok(())
    }

    /// Where the primary listener currently perceives a source.
    pub fn perceived_position(&self, id: SourceId) -> Result<Vec3, EngineError> {
        self.world
            .get::<&Source>(id.0)
            .map(|s| s.perceived.current)
            .map_err(|_| EngineError::UnknownSource(id))
    }

    pub fn voice(&self, id: SourceId) -> Result<VoiceState, EngineError> {
        self.world
            .get::<&Source>(id.0)
            .map(|s| s.voice)
            .map_err(|_| EngineError::UnknownSource(id))
    }

    // ----- Listeners -----

    /// Register a listener. A second primary listener is rejected with an
    /// error log and registered as secondary.
    pub fn add_listener(&mut self, desc: ListenerDesc) -> ListenerId {
        let mut primary = desc.primary;
        if primary {
            if let Some(existing) = self.primary_listener {
                let name = self
                    .world
                    .get::<&Listener>(existing.0)
                    .map(|l| l.name.clone())
                    .unwrap_or_default();
                log::error!(
                    "listener '{}' requested primary but '{}' already is; registering as secondary",
                    desc.name,
                    name
                );
                primary = false;
            }
        }

        let node = self.graph.add_node(desc.position);
        let room = self.room_for_position(desc.position);
        let mut listener = Listener::new(desc.name, primary);
        listener.current_room = Some(room);
        log::info!("registered listener '{}' in room {:?}", listener.name, room);

        let id = ListenerId(self.world.spawn((listener, Transform::at(desc.position), PathAnchor(node))));
        self.listeners.push(id);
        if primary {
            self.primary_listener = Some(id);
        }
        link_listener(&self.world, &mut self.graph, id);
        id
    }

    /// Remove a listener and every cached path toward it.
    pub fn remove_listener(&mut self, id: ListenerId) -> Result<(), EngineError> {
        let node = self.listener_node(id)?;
        for &source in &self.sources {
            if let Ok(mut s) = self.world.get::<&mut Source>(source.0) {
                s.paths.remove(&id);
            }
        }
        self.graph.remove_node(node);
        let _ = self.world.despawn(id.0);
        self.listeners.retain(|l| *l != id);
        self.invalidate_paths();
        log::info!("removed listener {:?}", id);
        if self.primary_listener == Some(id) {
            self.primary_listener = None;
        }
        Ok(())
    }

    fn listener_node(&self, id: ListenerId) -> Result<roomtone_logic::NodeId, EngineError> {
        if self.world.get::<&Listener>(id.0).is_err() {
            return Err(EngineError::UnknownListener(id));
        }
        self.world
            .get::<&PathAnchor>(id.0)
            .map(|a| a.0)
            .map_err(|_| EngineError::UnknownListener(id))
    }

    pub fn listener(&self, id: ListenerId) -> Result<Listener, EngineError> {
        self.world
            .get::<&Listener>(id.0)
            .map(|l| (*l).clone())
            .map_err(|_| EngineError::UnknownListener(id))
    }

    pub fn listener_by_name(&self, name: &str) -> Option<ListenerId> {
        self.listeners
            .iter()
            .copied()
            .find(|id| self.world.get::<&Listener>(id.0).map(|l| l.name == name).unwrap_or(false))
    }

    /// Move a listener. Room and links follow on the next update.
    pub fn set_listener_position(&mut self, id: ListenerId, position: Vec3) -> Result<(), EngineError> {
        self.listener_node(id)?;
        if let Ok(mut t) = self.world.get::<&mut Transform>(id.0) {
            t.position = position;
        }
        Ok(())
    }

    // ----- Audibility -----

    /// What `listener` last heard from `source`.
    pub fn audibility(&self, listener: ListenerId, source: SourceId) -> Result<Option<AudibilityData>, EngineError> {
        let l = self
            .world
            .get::<&Listener>(listener.0)
            .map_err(|_| EngineError::UnknownListener(listener))?;
        Ok(l.audibility.get(source).copied())
    }

    /// Sources `listener` heard within the last `window` seconds.
    pub fn audible_sources(&self, listener: ListenerId, window: f64) -> Result<Vec<SourceId>, EngineError> {
        let l = self
            .world
            .get::<&Listener>(listener.0)
            .map_err(|_| EngineError::UnknownListener(listener))?;
        Ok(l.audibility.audible_since(self.time, window))
    }

    /// The source `listener` currently hears loudest.
    pub fn loudest_source(&self, listener: ListenerId) -> Result<Option<(SourceId, AudibilityData)>, EngineError> {
        let l = self
            .world
            .get::<&Listener>(listener.0)
            .map_err(|_| EngineError::UnknownListener(listener))?;
        Ok(l.audibility.loudest())
    }

    // ----- Evaluation -----

    /// Evaluate one source/listener pair right now, without touching
    /// audibility tables or voices.
    pub fn compute(
        &mut self,
        source: SourceId,
        listener: ListenerId,
        obstruction: &dyn ObstructionQuery,
    ) -> Result<Propagation, EngineError> {
        self.source_node(source)?;
        let listener_end =
            listener_end(&self.world, listener).ok_or(EngineError::UnknownListener(listener))?;
        let (at, _, _) = source_end(&self.world, source).ok_or(EngineError::UnknownSource(source))?;

        let eval = Evaluation {
            graph: &self.graph,
            config: &self.config,
            obstruction,
            time: self.time,
            delta_seconds: 0.0,
        };
        let mut s = self
            .world
            .get::<&mut Source>(source.0)
            .map_err(|_| EngineError::UnknownSource(source))?;
        Ok(propagate(&eval, &mut self.rng, &mut *s, &at, &listener_end))
    }

    /// Advance the engine by `delta_seconds`.
    ///
    /// Runs, in order: portal animation and travel costs, room
    /// classification and relinking, then audibility tracking with voice
    /// output for the primary listener.
    pub fn update(&mut self, delta_seconds: f32, obstruction: &dyn ObstructionQuery, output: &mut dyn VoiceOutput) {
        let delta_seconds = if delta_seconds.is_finite() {
            delta_seconds.max(0.0)
        } else {
            0.0
        };
        self.time += delta_seconds as f64;

        portal_system(&mut self.world, &mut self.graph, delta_seconds);

        let outdoor = self.outdoor_room();
        topology_system(&mut self.world, &mut self.graph, &self.rooms, outdoor);

        let eval = Evaluation {
            graph: &self.graph,
            config: &self.config,
            obstruction,
            time: self.time,
            delta_seconds,
        };
        audibility_system(
            &mut self.world,
            &eval,
            &mut self.rng,
            &self.listeners,
            &self.sources,
            output,
        );
    }

    /// Drop every cached path so the next evaluation re-queries.
    pub fn invalidate_paths(&mut self) {
        for (_entity, source) in self.world.query_mut::<&mut Source>() {
            source.paths.clear();
        }
    }

    /// Entity counts: (rooms, portals, sources, listeners).
    pub fn counts(&self) -> (usize, usize, usize, usize) {
        (
            self.rooms.len(),
            self.portals.len(),
            self.sources.len(),
            self.listeners.len(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{CollectingOutput, NullOutput, Unobstructed};
    use roomtone_logic::{AttenuationModel, BoundingBox};

    fn engine() -> PropagationEngine {
        PropagationEngine::new(EngineConfig {
            seed: Some(42),
            ..Default::default()
        })
    }

    fn boxed(min: (f32, f32, f32), max: (f32, f32, f32)) -> Vec<BoundingBox> {
        vec![BoundingBox::new(
            Vec3::new(min.0, min.1, min.2),
            Vec3::new(max.0, max.1, max.2),
        )]
    }

    #[test]
    fn test_engine_creation() {
        let engine = engine();
        assert_eq!(engine.counts(), (0, 0, 0, 0));
        assert_eq!(engine.time(), 0.0);
        assert!(engine.primary_listener().is_none());
    }

    #[test]
    fn test_outdoor_room_is_synthesized_once() {
        let mut engine = engine();
        let a = engine.outdoor_room();
        let b = engine.room_for_position(Vec3::new(100.0, 0.0, 0.0));
        assert_eq!(a, b);
        assert_eq!(engine.rooms().len(), 1);
        assert_eq!(engine.room(a).unwrap().name, SYNTHESIZED_OUTDOOR_NAME);
    }

    #[test]
    fn test_last_outdoor_room_wins() {
        let mut engine = engine();
        engine.add_room(RoomDesc::outdoor("Street"));
        let yard = engine.add_room(RoomDesc::outdoor("Yard"));
        assert_eq!(engine.room_for_position(Vec3::new(100.0, 0.0, 0.0)), yard);

        engine.remove_room(yard).unwrap();
        let street = engine.room_by_name("Street").unwrap();
        assert_eq!(engine.outdoor_room(), street);
    }

    #[test]
    fn test_duplicate_primary_stays_secondary() {
        let mut engine = engine();
        let first = engine.add_listener(ListenerDesc::primary("Player", Vec3::ZERO));
        let second = engine.add_listener(ListenerDesc::primary("Camera", Vec3::ZERO));
        assert_eq!(engine.primary_listener(), Some(first));
        assert!(!engine.listener(second).unwrap().primary);

        engine.remove_listener(first).unwrap();
        assert!(engine.primary_listener().is_none());
    }

    #[test]
    fn test_unknown_handles_error() {
        let mut engine = engine();
        let source = engine.add_source(SourceDesc::new("Radio", Vec3::ZERO));
        engine.remove_source(source).unwrap();
        assert_eq!(engine.remove_source(source), Err(EngineError::UnknownSource(source)));
        assert!(engine.play_source(source).is_err());
    }

    #[test]
    fn test_portal_animation_through_update() {
        let mut engine = engine();
        let a = engine.add_room(RoomDesc::indoor("A", boxed((0.0, 0.0, 0.0), (5.0, 3.0, 5.0))));
        let b = engine.add_room(RoomDesc::indoor("B", boxed((5.0, 0.0, 0.0), (10.0, 3.0, 5.0))));
        let door = engine
            .add_portal(PortalSpec::new("Door", Vec3::new(5.0, 1.0, 2.5), Some(a), Some(b)))
            .unwrap();
        assert!(engine.portal(door).unwrap().opened);

        engine.close_portal(door, 1.0).unwrap();
        engine.update(0.5, &Unobstructed, &mut NullOutput);
        let half = engine.portal(door).unwrap();
        assert!(!half.opened);
        assert!((half.open_close - 0.5).abs() < 1e-5);

        engine.update(0.6, &Unobstructed, &mut NullOutput);
        assert_eq!(engine.portal(door).unwrap().open_close, 1.0);

        engine.toggle_portal(door, 0.0).unwrap();
        engine.update(0.1, &Unobstructed, &mut NullOutput);
        let open = engine.portal(door).unwrap();
        assert!(open.opened);
        assert_eq!(open.open_close, 0.0);
    }

    #[test]
    fn test_stopped_source_is_recorded_silent() {
        let mut engine = engine();
        let listener = engine.add_listener(ListenerDesc::primary("Player", Vec3::ZERO));
        let source = engine.add_source(SourceDesc {
            attenuation: AttenuationModel::Linear,
            ..SourceDesc::new("Radio", Vec3::new(2.0, 0.0, 0.0))
        });
        let mut output = CollectingOutput::default();

        engine.update(0.1, &Unobstructed, &mut output);
        let heard = engine.audibility(listener, source).unwrap().unwrap();
        assert!(heard.volume > 0.9);
        assert!(output.latest(source).is_some());

        engine.stop_source(source).unwrap();
        output.clear();
        engine.update(0.1, &Unobstructed, &mut output);
        let silent = engine.audibility(listener, source).unwrap().unwrap();
        assert_eq!(silent.volume, 0.0);
        assert!((silent.last_audible_time.unwrap() - 0.1).abs() < 1e-6);
        assert!(output.applied.is_empty());
    }

    #[test]
    fn test_remove_room_drops_its_portals() {
        let mut engine = engine();
        let a = engine.add_room(RoomDesc::indoor("A", boxed((0.0, 0.0, 0.0), (5.0, 3.0, 5.0))));
        let b = engine.add_room(RoomDesc::indoor("B", boxed((5.0, 0.0, 0.0), (10.0, 3.0, 5.0))));
        let door = engine
            .add_portal(PortalSpec::new("Door", Vec3::new(5.0, 1.0, 2.5), Some(a), Some(b)))
            .unwrap();

        engine.remove_room(b).unwrap();
        assert!(engine.portal(door).is_err());
        assert!(engine.room(a).unwrap().connections.is_empty());
        assert_eq!(engine.remove_room(b), Err(EngineError::UnknownRoom(b)));
    }

    #[test]
    fn test_portal_to_unknown_room_is_rejected() {
        let mut engine = engine();
        let a = engine.add_room(RoomDesc::indoor("A", boxed((0.0, 0.0, 0.0), (5.0, 3.0, 5.0))));
        engine.remove_room(a).unwrap();
        let result = engine.add_portal(PortalSpec::new("Door", Vec3::ZERO, Some(a), None));
        assert_eq!(result, Err(EngineError::UnknownRoom(a)));
    }
}
