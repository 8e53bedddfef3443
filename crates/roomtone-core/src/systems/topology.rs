//! Room/portal topology: room classification and path graph linking.
//!
//! Portal nodes link to every other portal of the indoor rooms they join.
//! Source and listener nodes link only to the portals of the room they are
//! in, so every path between two entities crosses at least one portal.

use hecs::World;
use roomtone_logic::constants::pathing::OUTDOOR_PORTAL_REACH;
use roomtone_logic::{NodeId, PathGraph, Vec3};

use crate::components::{
    Listener, ListenerId, PathAnchor, Portal, PortalId, Room, RoomId, Source, SourceId, Transform,
};

/// Room containing `position`: the first indoor room (in `rooms` order)
/// whose bounds contain it, otherwise `outdoor`.
pub fn classify_position(world: &World, rooms: &[RoomId], outdoor: RoomId, position: Vec3) -> RoomId {
    rooms
        .iter()
        .copied()
        .find(|id| {
            world
                .get::<&Room>(id.0)
                .map(|room| !room.is_outdoor && room.contains(&position))
                .unwrap_or(false)
        })
        .unwrap_or(outdoor)
}

fn anchor_of(world: &World, entity: hecs::Entity) -> Option<NodeId> {
    world.get::<&PathAnchor>(entity).ok().map(|a| a.0)
}

/// Nodes of every portal connected to `room`.
fn room_portal_nodes(world: &World, room: RoomId) -> Vec<NodeId> {
    let Ok(room) = world.get::<&Room>(room.0) else {
        return Vec::new();
    };
    room.portals()
        .filter_map(|portal| anchor_of(world, portal.0))
        .collect()
}

fn is_outdoor(world: &World, room: RoomId) -> bool {
    world
        .get::<&Room>(room.0)
        .map(|r| r.is_outdoor)
        .unwrap_or(false)
}

/// Drop every edge of `node`.
pub fn unlink_node(graph: &mut PathGraph, node: NodeId) {
    for neighbor in graph.neighbors(node).to_vec() {
        graph.remove_edge(node, neighbor);
    }
}

/// Replace the edges of an entity node with edges to the portals of `room`.
///
/// When `room` is outdoors and `outdoor_reach` is set, portals farther than
/// that from the node are skipped. Returns whether the node's neighbors
/// changed.
pub fn relink_node(
    world: &World,
    graph: &mut PathGraph,
    node: NodeId,
    room: RoomId,
    outdoor_reach: Option<f32>,
) -> bool {
    let mut before = graph.neighbors(node).to_vec();
    before.sort();
    unlink_node(graph, node);
    let reach = outdoor_reach.filter(|_| is_outdoor(world, room));
    let origin = graph.position(node);

    for portal in room_portal_nodes(world, room) {
        if let (Some(reach), Some(origin)) = (reach, origin) {
            let within = graph
                .position(portal)
                .map(|p| p.distance(&origin) <= reach)
                .unwrap_or(false);
            if !within {
                continue;
            }
        }
        graph.add_edge(node, portal);
    }

    let mut after = graph.neighbors(node).to_vec();
    after.sort();
    before != after
}

/// How far an outdoor source reaches for portals, if limited at all.
pub fn source_outdoor_reach(source: &Source) -> Option<f32> {
    if source.settings.is_outdoor_foley() {
        None
    } else {
        Some(source.settings.falloff.max_distance() * OUTDOOR_PORTAL_REACH)
    }
}

/// Join two rooms through `portal` and link its node to its rooms' portals.
///
/// A portal whose sides are the same room is recorded but adds no room
/// connections and no edges.
pub fn register_portal(world: &mut World, graph: &mut PathGraph, portal: PortalId, first: RoomId, second: RoomId) {
    if let Ok(mut p) = world.get::<&mut Portal>(portal.0) {
        p.joined = Some((first, second));
    }

    if first == second {
        log::warn!("portal {:?} joins room {:?} to itself; left unlinked", portal, first);
    } else {
        if let Ok(mut room) = world.get::<&mut Room>(first.0) {
            room.connect(portal, second);
        }
        if let Ok(mut room) = world.get::<&mut Room>(second.0) {
            room.connect(portal, first);
        }
        link_portal(world, graph, portal);
    }

    if let Ok(mut p) = world.get::<&mut Portal>(portal.0) {
        p.initialised = true;
    }
}

/// Link a portal's node to every other portal of the indoor rooms it joins.
pub fn link_portal(world: &World, graph: &mut PathGraph, portal: PortalId) {
    let Some(node) = anchor_of(world, portal.0) else {
        return;
    };
    let Some((first, second)) = world.get::<&Portal>(portal.0).ok().and_then(|p| p.joined) else {
        return;
    };
    if first == second {
        return;
    }

    for room in [first, second] {
        if is_outdoor(world, room) {
            continue;
        }
        for other in room_portal_nodes(world, room) {
            if other != node {
                graph.add_edge(node, other);
            }
        }
    }
}

/// Detach `portal` from the rooms it joins.
pub fn unregister_portal(world: &mut World, portal: PortalId) {
    let joined = world.get::<&Portal>(portal.0).ok().and_then(|p| p.joined);
    if let Some((first, second)) = joined {
        for room in [first, second] {
            if let Ok(mut r) = world.get::<&mut Room>(room.0) {
                r.disconnect_portal(portal);
            }
        }
    }
}

/// Relink a source's node to the portals of its current room. Returns
/// whether its links changed.
pub fn link_source(world: &World, graph: &mut PathGraph, source: SourceId) -> bool {
    let Some(node) = anchor_of(world, source.0) else {
        return false;
    };
    let Ok(s) = world.get::<&Source>(source.0) else {
        return false;
    };
    match s.current_room {
        Some(room) => relink_node(world, graph, node, room, source_outdoor_reach(&s)),
        None => false,
    }
}

/// Relink a listener's node to the portals of its current room. Returns
/// whether its links changed.
pub fn link_listener(world: &World, graph: &mut PathGraph, listener: ListenerId) -> bool {
    let Some(node) = anchor_of(world, listener.0) else {
        return false;
    };
    let room = world.get::<&Listener>(listener.0).ok().and_then(|l| l.current_room);
    match room {
        Some(room) => relink_node(world, graph, node, room, None),
        None => false,
    }
}

/// Copy entity positions into their path graph nodes.
pub fn sync_node_positions(world: &World, graph: &mut PathGraph) {
    for (_entity, (transform, anchor)) in world.query::<(&Transform, &PathAnchor)>().iter() {
        graph.set_position(anchor.0, transform.position);
    }
}

/// Reclassify listeners and moved sources, relinking those whose room or
/// position changed.
///
/// Listeners relink only when their room changes. Sources relink whenever
/// their position changes, so outdoor portal pruning follows them; a source
/// whose room or links changed drops its cached paths.
pub fn topology_system(world: &mut World, graph: &mut PathGraph, rooms: &[RoomId], outdoor: RoomId) {
    sync_node_positions(world, graph);

    let mut moved_listeners: Vec<(ListenerId, RoomId)> = Vec::new();
    for (entity, (listener, transform)) in world.query::<(&Listener, &Transform)>().iter() {
        let room = classify_position(world, rooms, outdoor, transform.position);
        if listener.current_room != Some(room) {
            moved_listeners.push((ListenerId(entity), room));
        }
    }

    let mut moved_sources: Vec<(SourceId, Vec3, RoomId)> = Vec::new();
    for (entity, (source, transform)) in world.query::<(&Source, &Transform)>().iter() {
        if source.linked_position != Some(transform.position) {
            let room = classify_position(world, rooms, outdoor, transform.position);
            moved_sources.push((SourceId(entity), transform.position, room));
        }
    }

    for (id, room) in moved_listeners {
        if let Ok(mut listener) = world.get::<&mut Listener>(id.0) {
            log::debug!("listener '{}' entered room {:?}", listener.name, room);
            listener.current_room = Some(room);
        }
        link_listener(world, graph, id);
    }

    for (id, position, room) in moved_sources {
        let mut stale = false;
        if let Ok(mut source) = world.get::<&mut Source>(id.0) {
            if source.current_room != Some(room) {
                log::debug!("source '{}' entered room {:?}", source.name, room);
                stale = true;
            }
            source.current_room = Some(room);
            source.linked_position = Some(position);
        }
        stale |= link_source(world, graph, id);
        if stale {
            if let Ok(mut source) = world.get::<&mut Source>(id.0) {
                source.paths.clear();
            }
        }
    }
}
