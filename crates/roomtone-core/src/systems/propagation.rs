//! Per source/listener propagation: direct sound in shared rooms, pathed
//! sound through portals everywhere else.

use rand::Rng;
use roomtone_logic::constants::pathing::PERCEIVED_PATH_FRACTION;
use roomtone_logic::propagation::{
    leakage, low_pass, obstruction_fraction, outdoor_foley_position, point_along,
    portal_obstruction, same_floor,
};
use roomtone_logic::{NodeId, PathGraph, Propagation, Vec3};

use crate::components::{CachedPath, ListenerId, RoomId, Source};
use crate::config::EngineConfig;
use crate::host::ObstructionQuery;

/// Room facts the floor heuristic needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoomInfo {
    pub id: RoomId,
    pub is_outdoor: bool,
    pub origin: Vec3,
}

/// Where one end of a propagation sits this frame.
#[derive(Debug, Clone, Copy)]
pub struct Endpoint {
    pub position: Vec3,
    pub forward: Vec3,
    pub node: NodeId,
    pub room: Option<RoomInfo>,
}

/// The listener end, with the identity the path cache is keyed by.
#[derive(Debug, Clone, Copy)]
pub struct ListenerEnd {
    pub id: ListenerId,
    pub primary: bool,
    pub at: Endpoint,
}

/// Shared, read-only inputs of one evaluation pass.
pub struct Evaluation<'a> {
    pub graph: &'a PathGraph,
    pub config: &'a EngineConfig,
    pub obstruction: &'a dyn ObstructionQuery,
    pub time: f64,
    pub delta_seconds: f32,
}

impl Evaluation<'_> {
    fn ray_obstruction(&self, from: Vec3, to: Vec3) -> f32 {
        obstruction_fraction(from, to, self.config.obstruction_jitter, |a, b| {
            self.obstruction.line_obstructed(a, b)
        })
    }
}

/// Evaluate what `listener` hears from `source`.
///
/// Updates the source's path cache, and its perceived position when the
/// listener is primary.
pub fn propagate<R: Rng>(
    eval: &Evaluation,
    rng: &mut R,
    source: &mut Source,
    at: &Endpoint,
    listener: &ListenerEnd,
) -> Propagation {
    let same_room = at.room.map(|r| r.id) == listener.at.room.map(|r| r.id);
    if same_room {
        source.paths.remove(&listener.id);
        direct(eval, source, at, listener)
    } else {
        pathed(eval, rng, source, at, listener)
    }
}

fn direct(eval: &Evaluation, source: &mut Source, at: &Endpoint, listener: &ListenerEnd) -> Propagation {
    let settings = &source.settings;
    let (distance, target, low) = if settings.is_outdoor_foley() {
        (0.0, listener.at.position, 1.0)
    } else {
        let distance = at.position.distance(&listener.at.position)
            + settings.cone.distance_penalty(at.forward, at.position, listener.at.position);
        let rays = eval.ray_obstruction(at.position, listener.at.position);
        (distance, at.position, low_pass(rays, 0.0))
    };

    let volume = settings.falloff.volume_at(distance);
    if listener.primary {
        source.perceived.snap(target);
    }
    Propagation {
        volume,
        low_pass: low,
    }
}

fn pathed<R: Rng>(
    eval: &Evaluation,
    rng: &mut R,
    source: &mut Source,
    at: &Endpoint,
    listener: &ListenerEnd,
) -> Propagation {
    let foley = source.settings.is_outdoor_foley();
    let listener_room = listener.at.room.map(|r| r.id);

    let stale = match source.paths.get(&listener.id) {
        None => true,
        Some(cached) => {
            source.settings.force_path_refresh
                || cached.listener_room != listener_room
                || eval.time >= cached.next_refresh
        }
    };
    if stale {
        let path = eval.graph.find_shortest_path(at.node, listener.at.node, foley);
        let refresh = &eval.config.path_refresh;
        let delay = if refresh.max_seconds > refresh.min_seconds {
            rng.gen_range(refresh.min_seconds..=refresh.max_seconds)
        } else {
            refresh.min_seconds
        };
        log::debug!(
            "source '{}' re-pathed to {:?}: {} nodes, cost {:.2}",
            source.name,
            listener.id,
            path.nodes.len(),
            path.cost
        );
        source.paths.insert(
            listener.id,
            CachedPath {
                path,
                listener_room,
                next_refresh: eval.time + delay as f64,
            },
        );
    }
    let path = match source.paths.get(&listener.id) {
        Some(cached) => cached.path.clone(),
        None => return Propagation::SILENT,
    };

    let settings = &source.settings;
    let direct_distance = at.position.distance(&listener.at.position);
    let floor_level = match (at.room, listener.at.room) {
        (Some(s), Some(l)) => same_floor(false, s.is_outdoor || l.is_outdoor, s.origin.y, l.origin.y),
        _ => true,
    };

    let mut distance = if path.is_empty() { f32::MAX } else { path.cost };
    let portal_obs = portal_obstruction(
        path.nodes.iter().map(|n| eval.graph.travel_cost(*n)),
        floor_level,
    );
    let leak_scale = if floor_level {
        settings.wall_leakage
    } else {
        settings.floor_leakage
    };
    distance = (distance - leakage(direct_distance, settings.falloff.max_distance(), leak_scale)).max(0.0);

    let node_positions: Vec<Vec3> = path
        .nodes
        .iter()
        .filter_map(|n| eval.graph.position(*n))
        .collect();

    let target = if foley {
        match node_positions.first() {
            Some(first) => outdoor_foley_position(*first, listener.at.position),
            None => at.position,
        }
    } else if floor_level {
        let mut polyline = Vec::with_capacity(node_positions.len() + 2);
        polyline.push(at.position);
        polyline.extend(node_positions.iter().copied());
        polyline.push(listener.at.position);
        point_along(&polyline, distance * PERCEIVED_PATH_FRACTION).unwrap_or(at.position)
    } else {
        at.position
    };

    if listener.primary {
        source
            .perceived
            .follow(target, eval.config.position_smoothing_rate, eval.delta_seconds);
    }

    distance += settings
        .cone
        .distance_penalty(at.forward, at.position, listener.at.position);
    let volume = settings.falloff.volume_at(distance);

    let ray_origin = if foley { target } else { at.position };
    let rays = eval.ray_obstruction(ray_origin, listener.at.position);

    Propagation {
        volume,
        low_pass: low_pass(rays, portal_obs),
    }
}
