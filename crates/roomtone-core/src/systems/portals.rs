//! Portal animation and travel cost upkeep.

use hecs::World;
use roomtone_logic::PathGraph;

use crate::components::{PathAnchor, Portal, PortalLerp};

/// Advance open/close animations and push every portal's travel cost into
/// its path node.
pub fn portal_system(world: &mut World, graph: &mut PathGraph, delta_seconds: f32) {
    let mut finished = Vec::new();
    for (entity, (portal, lerp)) in world.query_mut::<(&mut Portal, &mut PortalLerp)>() {
        let (amount, done) = lerp.advance(delta_seconds);
        portal.open_close = amount;
        if done {
            finished.push(entity);
        }
    }
    for entity in finished {
        let _ = world.remove_one::<PortalLerp>(entity);
    }

    for (_entity, (portal, anchor)) in world.query::<(&Portal, &PathAnchor)>().iter() {
        graph.set_travel_cost(anchor.0, portal.travel_cost());
    }
}
