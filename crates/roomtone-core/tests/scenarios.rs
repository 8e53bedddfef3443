//! End-to-end propagation scenarios driven through the public engine API.

use roomtone_core::prelude::*;
use roomtone_logic::{Falloff, NodeId};

struct House {
    engine: PropagationEngine,
    kitchen: RoomId,
    hall: RoomId,
    door: PortalId,
}

fn boxed(min: (f32, f32, f32), max: (f32, f32, f32)) -> Vec<BoundingBox> {
    vec![BoundingBox::new(
        Vec3::new(min.0, min.1, min.2),
        Vec3::new(max.0, max.1, max.2),
    )]
}

fn seeded() -> PropagationEngine {
    PropagationEngine::new(EngineConfig {
        seed: Some(11),
        ..Default::default()
    })
}

/// Kitchen (x 0..5) and hall (x 5..10) joined by an open door at x = 5.
fn house(obstruction: f32) -> House {
    let mut engine = seeded();
    let kitchen = engine.add_room(RoomDesc::indoor("Kitchen", boxed((0.0, 0.0, 0.0), (5.0, 3.0, 5.0))));
    let hall = engine.add_room(RoomDesc::indoor("Hall", boxed((5.0, 0.0, 0.0), (10.0, 3.0, 5.0))));
    let door = engine
        .add_portal(
            PortalSpec::new("Door", Vec3::new(5.0, 1.0, 2.5), Some(kitchen), Some(hall))
                .with_obstruction(obstruction),
        )
        .unwrap();
    House {
        engine,
        kitchen,
        hall,
        door,
    }
}

fn node_of(engine: &PropagationEngine, entity: hecs::Entity) -> NodeId {
    engine.world.get::<&PathAnchor>(entity).unwrap().0
}

fn assert_symmetric(engine: &PropagationEngine) {
    for id in engine.graph.node_ids() {
        for &neighbor in engine.graph.neighbors(id) {
            assert!(
                engine.graph.is_connected(neighbor, id),
                "edge {:?} -> {:?} has no reverse",
                id,
                neighbor
            );
        }
    }
}

fn tick(engine: &mut PropagationEngine) {
    engine.update(0.1, &Unobstructed, &mut NullOutput);
}

#[test]
fn same_room_linear_falloff() {
    let mut h = house(1.0);
    let listener = h.engine.add_listener(ListenerDesc::primary("Player", Vec3::new(4.4, 1.0, 3.3)));
    let source = h.engine.add_source(SourceDesc {
        attenuation: AttenuationModel::Linear,
        min_distance: 1.0,
        max_distance: 10.0,
        max_volume: 0.8,
        ..SourceDesc::new("Radio", Vec3::new(0.0, 1.0, 0.0))
    });

    tick(&mut h.engine);
    assert_eq!(h.engine.listener(listener).unwrap().current_room, Some(h.kitchen));
    assert_eq!(h.engine.source(source).unwrap().current_room, Some(h.kitchen));

    // 4.4² + 3.3² = 5.5²
    let heard = h.engine.audibility(listener, source).unwrap().unwrap();
    assert!((heard.volume - 0.8 * 0.5).abs() < 1e-5);
    assert_eq!(heard.low_pass, 1.0);
    assert_eq!(h.engine.perceived_position(source).unwrap(), Vec3::new(0.0, 1.0, 0.0));
}

#[test]
fn adjacent_rooms_through_open_door() {
    let mut h = house(0.0);
    let listener = h.engine.add_listener(ListenerDesc::primary("Player", Vec3::new(9.0, 1.0, 2.5)));
    let source = h.engine.add_source(SourceDesc {
        wall_leakage: 0.0,
        max_distance: 21.0,
        ..SourceDesc::new("Radio", Vec3::new(2.0, 1.0, 2.5))
    });

    tick(&mut h.engine);
    assert_eq!(h.engine.listener(listener).unwrap().current_room, Some(h.hall));

    // 3 to the door, its 0.1 floor cost, 4 to the listener.
    let falloff = Falloff::new(AttenuationModel::Logarithmic, 1.0, 21.0, 1.0);
    let heard = h.engine.audibility(listener, source).unwrap().unwrap();
    assert!((heard.volume - falloff.volume_at(7.1)).abs() < 1e-5);
    assert!((heard.volume - falloff.volume_at(7.0)).abs() < 0.01);
    assert!((heard.low_pass - 0.995).abs() < 1e-5);

    let direct = h
        .engine
        .compute(source, listener, &Unobstructed)
        .unwrap();
    assert!((direct.volume - heard.volume).abs() < 1e-6);
}

#[test]
fn same_room_portals_stay_out_of_the_graph() {
    let mut h = house(0.0);
    let listener = h.engine.add_listener(ListenerDesc::primary("Player", Vec3::new(9.0, 1.0, 2.5)));
    let source = h.engine.add_source(SourceDesc {
        wall_leakage: 0.0,
        max_distance: 21.0,
        ..SourceDesc::new("Radio", Vec3::new(2.0, 1.0, 2.5))
    });
    let arch = h
        .engine
        .add_portal(PortalSpec::new("Arch", Vec3::new(7.0, 1.0, 2.5), Some(h.hall), Some(h.hall)))
        .unwrap();
    let skylight = h
        .engine
        .add_portal(PortalSpec::new("Skylight", Vec3::new(3.0, 3.0, 2.5), None, None))
        .unwrap();

    tick(&mut h.engine);

    for portal in [arch, skylight] {
        assert!(h.engine.graph.neighbors(node_of(&h.engine, portal.entity())).is_empty());
    }
    let hall = h.engine.room(h.hall).unwrap();
    assert_eq!(hall.connections.len(), 1);
    assert_eq!(hall.portal_to(h.hall), None);
    let outdoor = h.engine.outdoor_room();
    assert!(h.engine.room(outdoor).unwrap().connections.is_empty());
    assert_symmetric(&h.engine);

    // Same path as without the extra portals.
    let falloff = Falloff::new(AttenuationModel::Logarithmic, 1.0, 21.0, 1.0);
    let heard = h.engine.audibility(listener, source).unwrap().unwrap();
    assert!((heard.volume - falloff.volume_at(7.1)).abs() < 1e-5);
    assert!((heard.low_pass - 0.995).abs() < 1e-5);
}

#[test]
fn removing_entities_drops_cached_paths() {
    let mut h = house(1.0);
    let player = h.engine.add_listener(ListenerDesc::primary("Player", Vec3::new(9.0, 1.0, 2.5)));
    let guard = h.engine.add_listener(ListenerDesc::secondary("Guard", Vec3::new(8.0, 1.0, 1.0)));
    let kettle = h.engine.add_source(SourceDesc::new("Kettle", Vec3::new(2.0, 1.0, 2.5)));
    let radio = h.engine.add_source(SourceDesc {
        audible_to_secondary_listeners: true,
        ..SourceDesc::new("Radio", Vec3::new(1.0, 1.0, 1.0))
    });

    tick(&mut h.engine);
    assert!(h.engine.source(radio).unwrap().paths.contains_key(&player));
    assert!(h.engine.source(radio).unwrap().paths.contains_key(&guard));

    h.engine.remove_source(kettle).unwrap();
    assert!(h.engine.source(radio).unwrap().paths.is_empty());

    tick(&mut h.engine);
    assert!(!h.engine.source(radio).unwrap().paths.is_empty());
    h.engine.remove_listener(guard).unwrap();
    assert!(h.engine.source(radio).unwrap().paths.is_empty());
}

#[test]
fn closed_door_costs_ten() {
    let mut h = house(1.0);
    let listener = h.engine.add_listener(ListenerDesc::primary("Player", Vec3::new(9.0, 1.0, 2.5)));
    let source = h.engine.add_source(SourceDesc {
        wall_leakage: 0.0,
        force_path_refresh: true,
        ..SourceDesc::new("Radio", Vec3::new(2.0, 1.0, 2.5))
    });
    let door_node = node_of(&h.engine, h.door.entity());

    tick(&mut h.engine);
    let open = h.engine.audibility(listener, source).unwrap().unwrap();
    let open_cost = h.engine.source(source).unwrap().paths[&listener].path.cost;
    assert!((h.engine.graph.travel_cost(door_node) - 0.1).abs() < 1e-6);

    h.engine.set_portal_open_close(h.door, 1.0).unwrap();
    assert!((h.engine.graph.travel_cost(door_node) - 10.0).abs() < 1e-6);

    tick(&mut h.engine);
    let closed = h.engine.audibility(listener, source).unwrap().unwrap();
    let closed_cost = h.engine.source(source).unwrap().paths[&listener].path.cost;
    assert!((closed_cost - open_cost - 9.9).abs() < 1e-4);
    assert!(closed.volume < open.volume);
    assert!((closed.low_pass - 0.5).abs() < 1e-5);
}

#[test]
fn closing_door_fades_gradually() {
    let mut h = house(1.0);
    let listener = h.engine.add_listener(ListenerDesc::primary("Player", Vec3::new(9.0, 1.0, 2.5)));
    let source = h.engine.add_source(SourceDesc {
        force_path_refresh: true,
        ..SourceDesc::new("Radio", Vec3::new(2.0, 1.0, 2.5))
    });

    tick(&mut h.engine);
    h.engine.close_portal(h.door, 1.0).unwrap();

    let mut last = h.engine.audibility(listener, source).unwrap().unwrap().volume;
    for _ in 0..12 {
        tick(&mut h.engine);
        let volume = h.engine.audibility(listener, source).unwrap().unwrap().volume;
        assert!(volume <= last + 1e-6);
        last = volume;
    }
    assert!(!h.engine.portal(h.door).unwrap().opened);
    assert_eq!(h.engine.portal(h.door).unwrap().open_close, 1.0);
}

#[test]
fn removed_source_is_purged_everywhere() {
    let mut h = house(1.0);
    let player = h.engine.add_listener(ListenerDesc::primary("Player", Vec3::new(9.0, 1.0, 2.5)));
    let npc = h.engine.add_listener(ListenerDesc::secondary("Guard", Vec3::new(1.0, 1.0, 1.0)));
    let source = h.engine.add_source(SourceDesc {
        audible_to_secondary_listeners: true,
        ..SourceDesc::new("Alarm", Vec3::new(2.0, 1.0, 2.5))
    });

    tick(&mut h.engine);
    assert!(h.engine.audibility(player, source).unwrap().is_some());
    assert!(h.engine.audibility(npc, source).unwrap().is_some());

    h.engine.remove_source(source).unwrap();
    for _ in 0..3 {
        tick(&mut h.engine);
    }
    for listener in [player, npc] {
        assert!(h.engine.audibility(listener, source).unwrap().is_none());
        assert!(h.engine.listener(listener).unwrap().audibility.is_empty());
    }
    assert!(h.engine.source(source).is_err());
}

#[test]
fn secondary_listeners_hear_flagged_sources_only() {
    let mut h = house(1.0);
    let npc = h.engine.add_listener(ListenerDesc::secondary("Guard", Vec3::new(1.0, 1.0, 1.0)));
    let alarm = h.engine.add_source(SourceDesc {
        audible_to_secondary_listeners: true,
        ..SourceDesc::new("Alarm", Vec3::new(2.0, 1.0, 2.5))
    });
    let music = h.engine.add_source(SourceDesc::new("Music", Vec3::new(3.0, 1.0, 2.5)));

    tick(&mut h.engine);
    assert!(h.engine.audibility(npc, alarm).unwrap().is_some());
    assert!(h.engine.audibility(npc, music).unwrap().is_none());
    assert_eq!(h.engine.audible_sources(npc, 1.0).unwrap(), vec![alarm]);
}

#[test]
fn secondary_tracking_can_be_disabled() {
    let mut engine = PropagationEngine::new(EngineConfig {
        track_secondary_listeners: false,
        seed: Some(1),
        ..Default::default()
    });
    let npc = engine.add_listener(ListenerDesc::secondary("Guard", Vec3::ZERO));
    engine.add_source(SourceDesc {
        audible_to_secondary_listeners: true,
        ..SourceDesc::new("Alarm", Vec3::new(1.0, 0.0, 0.0))
    });

    tick(&mut engine);
    assert!(engine.listener(npc).unwrap().audibility.is_empty());
}

#[test]
fn graph_stays_symmetric_through_room_changes() {
    let mut h = house(1.0);
    let listener = h.engine.add_listener(ListenerDesc::primary("Player", Vec3::new(1.0, 1.0, 1.0)));
    let source = h.engine.add_source(SourceDesc::new("Radio", Vec3::new(8.0, 1.0, 1.0)));
    let door = node_of(&h.engine, h.door.entity());
    let ear = node_of(&h.engine, listener.entity());

    let route = [
        Vec3::new(4.0, 1.0, 2.0),
        Vec3::new(6.0, 1.0, 2.0),
        Vec3::new(12.0, 1.0, 2.0),
        Vec3::new(7.0, 1.0, 4.0),
        Vec3::new(2.0, 1.0, 2.0),
    ];
    let rooms = [
        Some(h.kitchen),
        Some(h.hall),
        None,
        Some(h.hall),
        Some(h.kitchen),
    ];
    for (position, room) in route.iter().zip(rooms) {
        h.engine.set_listener_position(listener, *position).unwrap();
        h.engine.set_source_position(source, *position + Vec3::new(0.0, 0.0, 0.5)).unwrap();
        tick(&mut h.engine);
        assert_symmetric(&h.engine);

        let current = h.engine.listener(listener).unwrap().current_room;
        match room {
            Some(room) => {
                assert_eq!(current, Some(room));
                assert!(h.engine.graph.is_connected(ear, door));
            }
            None => {
                let outdoor = h.engine.room_for_position(*position);
                assert_eq!(current, Some(outdoor));
                assert!(!h.engine.graph.is_connected(ear, door));
            }
        }
    }
}

#[test]
fn unreachable_listener_hears_nothing() {
    let mut engine = seeded();
    engine.add_room(RoomDesc::indoor("Vault", boxed((0.0, 0.0, 0.0), (5.0, 3.0, 5.0))));
    let listener = engine.add_listener(ListenerDesc::primary("Player", Vec3::new(20.0, 1.0, 0.0)));
    let source = engine.add_source(SourceDesc {
        wall_leakage: 0.0,
        ..SourceDesc::new("Safe", Vec3::new(2.0, 1.0, 2.0))
    });

    tick(&mut engine);
    let heard = engine.audibility(listener, source).unwrap().unwrap();
    assert_eq!(heard.volume, 0.0);
    assert_eq!(heard.last_audible_time, None);
    assert!(engine.source(source).unwrap().paths[&listener].path.is_empty());
}

#[test]
fn wall_leakage_reaches_through_sealed_rooms() {
    let mut engine = seeded();
    engine.add_room(RoomDesc::indoor("Left", boxed((0.0, 0.0, 0.0), (5.0, 3.0, 5.0))));
    engine.add_room(RoomDesc::indoor("Right", boxed((5.0, 0.0, 0.0), (10.0, 3.0, 5.0))));
    let listener = engine.add_listener(ListenerDesc::primary("Player", Vec3::new(5.5, 1.0, 2.5)));
    let source = engine.add_source(SourceDesc {
        wall_leakage: 1.0,
        max_distance: 30.0,
        ..SourceDesc::new("Drums", Vec3::new(4.5, 1.0, 2.5))
    });

    tick(&mut engine);
    // No path, but leakage (100 × (1 − 1/10)) is far smaller than f32::MAX.
    let heard = engine.audibility(listener, source).unwrap().unwrap();
    assert_eq!(heard.volume, 0.0);

    // A sealed door gives leakage a path to shorten.
    let left = engine.room_by_name("Left").unwrap();
    let right = engine.room_by_name("Right").unwrap();
    engine
        .add_portal(PortalSpec::new("Hatch", Vec3::new(5.0, 1.0, 4.5), Some(left), Some(right)).closed())
        .unwrap();
    tick(&mut engine);
    let heard = engine.audibility(listener, source).unwrap().unwrap();
    assert!((heard.volume - 1.0).abs() < 1e-6);
}

#[test]
fn floors_add_obstruction() {
    let mut engine = seeded();
    let ground = engine.add_room(RoomDesc::indoor("Ground", boxed((0.0, 0.0, 0.0), (5.0, 3.0, 5.0))));
    let upstairs = engine.add_room(RoomDesc::indoor("Upstairs", boxed((0.0, 6.0, 0.0), (5.0, 9.0, 5.0))));
    engine
        .add_portal(PortalSpec::new("Stairs", Vec3::new(2.5, 4.5, 2.5), Some(ground), Some(upstairs)))
        .unwrap();
    let listener = engine.add_listener(ListenerDesc::primary("Player", Vec3::new(1.0, 7.0, 1.0)));
    let source = engine.add_source(SourceDesc::new("TV", Vec3::new(1.0, 1.0, 1.0)));

    tick(&mut engine);
    let heard = engine.audibility(listener, source).unwrap().unwrap();
    assert!((heard.low_pass - (1.0 - 0.5 * 0.51)).abs() < 1e-5);
    assert_eq!(engine.perceived_position(source).unwrap(), Vec3::new(1.0, 1.0, 1.0));
}

/// House with a front door onto a registered yard.
fn yard() -> (PropagationEngine, RoomId, PortalId) {
    let mut engine = seeded();
    let inside = engine.add_room(RoomDesc::indoor("Inside", boxed((0.0, 0.0, 0.0), (5.0, 3.0, 5.0))));
    engine.add_room(RoomDesc::outdoor("Yard"));
    let front = engine
        .add_portal(PortalSpec::new("Front door", Vec3::new(0.0, 1.0, 2.5), Some(inside), None))
        .unwrap();
    (engine, inside, front)
}

#[test]
fn outdoor_sources_only_reach_nearby_portals() {
    let (mut engine, _, front) = yard();
    let listener = engine.add_listener(ListenerDesc::primary("Player", Vec3::new(2.0, 1.0, 2.5)));
    let source = engine.add_source(SourceDesc::new("Dog", Vec3::new(-5.0, 1.0, 2.5)));
    let (dog, door) = (node_of(&engine, source.entity()), node_of(&engine, front.entity()));

    tick(&mut engine);
    assert!(engine.graph.is_connected(dog, door));
    assert!(engine.audibility(listener, source).unwrap().unwrap().volume > 0.0);

    // Max distance 20 → portals within 8 units only.
    engine.set_source_position(source, Vec3::new(-30.0, 1.0, 2.5)).unwrap();
    tick(&mut engine);
    assert!(!engine.graph.is_connected(dog, door));
    assert_eq!(engine.audibility(listener, source).unwrap().unwrap().volume, 0.0);
    assert_symmetric(&engine);
}

#[test]
fn outdoor_foley_is_placed_behind_the_door() {
    let (mut engine, _, _) = yard();
    engine.add_listener(ListenerDesc::primary("Player", Vec3::new(3.0, 1.0, 2.5)));
    let wind = engine.add_source(SourceDesc {
        attenuation: AttenuationModel::OutdoorFoley,
        ..SourceDesc::new("Wind", Vec3::new(-40.0, 1.0, 2.5))
    });

    tick(&mut engine);
    let perceived = engine.perceived_position(wind).unwrap();
    assert!(perceived.distance(&Vec3::new(-3.0, 1.0, 2.5)) < 1e-4);

    // Only the door's travel cost counts for the first hop.
    let listener = engine.primary_listener().unwrap();
    let heard = engine.audibility(listener, wind).unwrap().unwrap();
    let falloff = Falloff::new(AttenuationModel::OutdoorFoley, 1.0, 20.0, 1.0);
    assert!((heard.volume - falloff.volume_at(3.1)).abs() < 1e-5);
}

#[test]
fn primary_voice_snaps_then_smooths() {
    let mut engine = seeded();
    let listener = engine.add_listener(ListenerDesc::primary("Player", Vec3::new(2.0, 0.0, 0.0)));
    let source = engine.add_source(SourceDesc {
        attenuation: AttenuationModel::Linear,
        ..SourceDesc::new("Radio", Vec3::ZERO)
    });
    let mut output = CollectingOutput::default();

    engine.update(0.1, &Unobstructed, &mut output);
    let first = engine.audibility(listener, source).unwrap().unwrap();
    let (_, voice, position) = *output.latest(source).unwrap();
    assert_eq!(voice.volume, first.volume);
    assert_eq!(position, Vec3::ZERO);

    engine.set_listener_position(listener, Vec3::new(15.0, 0.0, 0.0)).unwrap();
    output.clear();
    engine.update(0.1, &Unobstructed, &mut output);
    let target = engine.audibility(listener, source).unwrap().unwrap().volume;
    let (_, voice, _) = *output.latest(source).unwrap();
    assert!(voice.volume < first.volume);
    assert!(voice.volume > target);
    assert_eq!(engine.loudest_source(listener).unwrap().map(|(id, _)| id), Some(source));
}

#[test]
fn scene_save_load_keeps_behavior() {
    let mut h = house(1.0);
    let listener = h.engine.add_listener(ListenerDesc::primary("Player", Vec3::new(9.0, 1.0, 2.5)));
    let source = h.engine.add_source(SourceDesc::new("Radio", Vec3::new(2.0, 1.0, 2.5)));
    tick(&mut h.engine);
    let before = h.engine.audibility(listener, source).unwrap().unwrap();

    let mut buffer = Vec::new();
    h.engine.save(&mut buffer).unwrap();
    let (mut loaded, handles) = PropagationEngine::load(&buffer[..]).unwrap();
    tick(&mut loaded);
    let after = loaded
        .audibility(handles.listeners["Player"], handles.sources["Radio"])
        .unwrap()
        .unwrap();
    assert!((before.volume - after.volume).abs() < 1e-6);
    assert!((before.low_pass - after.low_pass).abs() < 1e-6);
}
