//! Roomtone Headless Propagation Harness
//!
//! Loads bundled scenes, drives the engine tick by tick and checks the
//! audible outcome. Runs entirely in-process: no audio device, no renderer.
//!
//! Usage:
//!   cargo run -p roomtone-simtest
//!   cargo run -p roomtone-simtest -- --verbose
//!   cargo run -p roomtone-simtest -- --scene path/to/scene.json --ticks 30
//!   cargo run -p roomtone-simtest -- --scene in.json --export out.json

use roomtone_core::prelude::*;
use roomtone_logic::{Falloff, NodeId, PathGraph};

// ── Bundled scenes ──────────────────────────────────────────────────────
const HOUSE_JSON: &str = include_str!("../../../data/scenes/house.json");

const TICK: f32 = 1.0 / 30.0;

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

fn check(name: &str, passed: bool, detail: impl Into<String>) -> TestResult {
    TestResult {
        name: name.into(),
        passed,
        detail: detail.into(),
    }
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let verbose = args.iter().any(|a| a == "--verbose");

    if let Some(path) = arg_value(&args, "--scene") {
        let ticks = match parse_ticks(arg_value(&args, "--ticks").as_deref()) {
            Ok(ticks) => ticks,
            Err(e) => {
                eprintln!("error: invalid --ticks value: {}", e);
                std::process::exit(2);
            }
        };
        let export = arg_value(&args, "--export");
        if let Err(e) = dump_scene(&path, ticks, export.as_deref()) {
            eprintln!("error: {}", e);
            std::process::exit(2);
        }
        return;
    }

    println!("=== Roomtone Propagation Harness ===\n");

    let mut results = Vec::new();

    // 1. Scene loading
    results.extend(validate_scene_load(verbose));

    // 2. Listener walking through the house
    results.extend(validate_walkthrough(verbose));

    // 3. Door animation
    results.extend(validate_doors(verbose));

    // 4. Outdoor sources and foley
    results.extend(validate_outdoor(verbose));

    // 5. Floors and leakage
    results.extend(validate_floors(verbose));

    // 6. Falloff curves
    results.extend(validate_falloff(verbose));

    // 7. Pathfinding on synthetic graph
    results.extend(validate_pathfinding(verbose));

    // 8. Save/load
    results.extend(validate_persistence(verbose));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

fn arg_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

/// Tick count for dump mode; 30 when the flag is absent.
fn parse_ticks(value: Option<&str>) -> Result<usize, std::num::ParseIntError> {
    value.map_or(Ok(30), str::parse)
}

fn load_house() -> Result<(PropagationEngine, SceneHandles), SceneError> {
    PropagationEngine::from_json(HOUSE_JSON)
}

fn tick(engine: &mut PropagationEngine, ticks: usize) {
    for _ in 0..ticks {
        engine.update(TICK, &Unobstructed, &mut NullOutput);
    }
}

fn heard(engine: &PropagationEngine, listener: ListenerId, source: SourceId) -> AudibilityData {
    engine
        .audibility(listener, source)
        .ok()
        .flatten()
        .unwrap_or_default()
}

fn graph_symmetric(graph: &PathGraph) -> bool {
    graph
        .node_ids()
        .all(|id| graph.neighbors(id).iter().all(|&n| graph.is_connected(n, id)))
}

fn node_of(engine: &PropagationEngine, entity: hecs::Entity) -> Option<NodeId> {
    engine.world.get::<&PathAnchor>(entity).ok().map(|a| a.0)
}

// ── Dump mode ───────────────────────────────────────────────────────────

fn dump_scene(path: &str, ticks: usize, export: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let json = std::fs::read_to_string(path)?;
    let (mut engine, _) = PropagationEngine::from_json(&json)?;
    let mut output = CollectingOutput::default();
    for _ in 0..ticks {
        output.clear();
        engine.update(TICK, &Unobstructed, &mut output);
    }

    println!("after {} ticks ({:.2}s):", ticks, engine.time());
    for &listener_id in engine.listeners() {
        let listener = engine.listener(listener_id)?;
        let room = listener
            .current_room
            .and_then(|r| engine.room(r).ok())
            .map(|r| r.name)
            .unwrap_or_else(|| "?".into());
        let role = if listener.primary { "primary" } else { "secondary" };
        println!("  {} ({}, in {})", listener.name, role, room);

        for &source_id in engine.sources() {
            let source = engine.source(source_id)?;
            match listener.audibility.get(source_id) {
                Some(data) => match data.last_audible_time {
                    Some(t) => println!(
                        "    {:<16} volume {:.3}  low-pass {:.3}  last heard {:.2}s",
                        source.name, data.volume, data.low_pass, t
                    ),
                    None => println!(
                        "    {:<16} volume {:.3}  low-pass {:.3}  never heard",
                        source.name, data.volume, data.low_pass
                    ),
                },
                None => println!("    {:<16} not tracked", source.name),
            }
        }
    }

    for (source_id, voice, position) in &output.applied {
        let name = engine.source(*source_id).map(|s| s.name).unwrap_or_default();
        println!(
            "  voice {:<16} volume {:.3}  low-pass {:.3}  at ({:.1}, {:.1}, {:.1})",
            name, voice.volume, voice.low_pass, position.x, position.y, position.z
        );
    }

    if let Some(out) = export {
        std::fs::write(out, engine.snapshot().to_json()?)?;
        println!("  snapshot written to {}", out);
    }
    Ok(())
}

// ── 1. Scene Loading ────────────────────────────────────────────────────

fn validate_scene_load(_verbose: bool) -> Vec<TestResult> {
    println!("--- Scene Loading ---");
    let mut results = Vec::new();

    let (engine, handles) = match load_house() {
        Ok(loaded) => loaded,
        Err(e) => {
            results.push(check("scene_parse", false, format!("load error: {}", e)));
            return results;
        }
    };

    let counts = engine.counts();
    results.push(check(
        "scene_counts",
        counts == (4, 4, 4, 2),
        format!("{:?} rooms/portals/sources/listeners", counts),
    ));

    let garden = handles.rooms.get("Garden").copied();
    let front_joins_garden = handles
        .portals
        .get("Front door")
        .and_then(|p| engine.portal(*p).ok())
        .and_then(|p| p.joined)
        .map(|(_, b)| Some(b) == garden)
        .unwrap_or(false);
    results.push(check(
        "scene_missing_side_is_outdoor",
        front_joins_garden,
        "front door opens onto the garden",
    ));

    let player_room = engine
        .listener(handles.listeners["Player"])
        .ok()
        .and_then(|l| l.current_room);
    results.push(check(
        "scene_player_in_hall",
        player_room == handles.rooms.get("Hall").copied(),
        "player starts in the hall",
    ));

    let guard = engine.listener(handles.listeners["Guard"]).ok();
    results.push(check(
        "scene_single_primary",
        engine.primary_listener() == Some(handles.listeners["Player"])
            && guard.map(|g| !g.primary).unwrap_or(false),
        "player is primary, guard secondary",
    ));

    results.push(check(
        "scene_graph_symmetric",
        graph_symmetric(&engine.graph),
        format!(
            "{} nodes, {} edges",
            engine.graph.node_count(),
            engine.graph.edge_count()
        ),
    ));

    results
}

// ── 2. Walkthrough ──────────────────────────────────────────────────────

fn validate_walkthrough(verbose: bool) -> Vec<TestResult> {
    println!("--- Walkthrough ---");
    let mut results = Vec::new();
    let Ok((mut engine, handles)) = load_house() else {
        results.push(check("walk_load", false, "scene failed to load"));
        return results;
    };
    let player = handles.listeners["Player"];
    let kettle = handles.sources["Kettle"];
    let kitchen = handles.rooms["Kitchen"];

    let mut volumes = Vec::new();
    let mut symmetric = true;
    for step in 0..12 {
        let x = 13.0 - step as f32;
        let _ = engine.set_listener_position(player, Vec3::new(x, 1.0, 2.5));
        tick(&mut engine, 5);
        symmetric &= graph_symmetric(&engine.graph);
        let volume = heard(&engine, player, kettle).volume;
        if verbose {
            println!("  x={:>5.1} kettle volume {:.3}", x, volume);
        }
        volumes.push(volume);
    }

    let (first, last) = (volumes[0], volumes[volumes.len() - 1]);
    results.push(check(
        "walk_kettle_louder_nearby",
        last > first,
        format!("{:.3} in the hall → {:.3} in the kitchen", first, last),
    ));

    results.push(check(
        "walk_graph_symmetric",
        symmetric,
        "edges stayed symmetric through every room change",
    ));

    let in_kitchen = engine
        .listener(player)
        .ok()
        .and_then(|l| l.current_room)
        == Some(kitchen);
    let perceived = engine.perceived_position(kettle).unwrap_or(Vec3::ZERO);
    let kettle_pos = Vec3::new(2.0, 1.0, 2.0);
    results.push(check(
        "walk_direct_in_same_room",
        in_kitchen && perceived.distance(&kettle_pos) < 1e-4,
        format!("perceived at ({:.2}, {:.2}, {:.2})", perceived.x, perceived.y, perceived.z),
    ));

    results
}

// ── 3. Doors ────────────────────────────────────────────────────────────

fn validate_doors(verbose: bool) -> Vec<TestResult> {
    println!("--- Doors ---");
    let mut results = Vec::new();
    let Ok((mut engine, handles)) = load_house() else {
        results.push(check("door_load", false, "scene failed to load"));
        return results;
    };
    let player = handles.listeners["Player"];
    let kettle = handles.sources["Kettle"];
    let door = handles.portals["Kitchen door"];
    let _ = engine.set_force_path_refresh(kettle, true);

    tick(&mut engine, 1);
    let open = heard(&engine, player, kettle);

    let _ = engine.close_portal(door, 1.0);
    let mut monotonic = true;
    let mut last = open.volume;
    for _ in 0..40 {
        tick(&mut engine, 1);
        let volume = heard(&engine, player, kettle).volume;
        monotonic &= volume <= last + 1e-6;
        last = volume;
    }
    let closed = heard(&engine, player, kettle);
    if verbose {
        println!(
            "  open {:.3}/{:.3} → closed {:.3}/{:.3}",
            open.volume, open.low_pass, closed.volume, closed.low_pass
        );
    }

    results.push(check(
        "door_close_fades_monotonically",
        monotonic && closed.volume < open.volume,
        format!("{:.3} → {:.3}", open.volume, closed.volume),
    ));
    results.push(check(
        "door_close_muffles",
        closed.low_pass < open.low_pass,
        format!("low-pass {:.3} → {:.3}", open.low_pass, closed.low_pass),
    ));

    let _ = engine.toggle_portal(door, 0.5);
    tick(&mut engine, 30);
    let reopened = heard(&engine, player, kettle);
    results.push(check(
        "door_reopen_restores",
        (reopened.volume - open.volume).abs() < 1e-4,
        format!("{:.3} after reopening", reopened.volume),
    ));

    let state = engine.portal(door).ok();
    results.push(check(
        "door_state_settles",
        state.map(|p| p.opened && p.open_close == 0.0).unwrap_or(false),
        "door fully open after toggle",
    ));

    results
}

// ── 4. Outdoors ─────────────────────────────────────────────────────────

fn validate_outdoor(_verbose: bool) -> Vec<TestResult> {
    println!("--- Outdoors ---");
    let mut results = Vec::new();
    let Ok((mut engine, handles)) = load_house() else {
        results.push(check("outdoor_load", false, "scene failed to load"));
        return results;
    };
    let player = handles.listeners["Player"];
    let guard = handles.listeners["Guard"];
    let wind = handles.sources["Wind"];
    let dog = handles.sources["Dog"];

    tick(&mut engine, 3);

    let perceived = engine.perceived_position(wind).unwrap_or(Vec3::ZERO);
    results.push(check(
        "foley_behind_front_door",
        perceived.x > 14.0 && heard(&engine, player, wind).volume > 0.0,
        format!("wind perceived at x={:.2}", perceived.x),
    ));

    let dog_node = node_of(&engine, dog.entity());
    let window = node_of(&engine, handles.portals["Back window"].entity());
    let front = node_of(&engine, handles.portals["Front door"].entity());
    let pruned = match (dog_node, window, front) {
        (Some(d), Some(w), Some(f)) => engine.graph.is_connected(d, w) && !engine.graph.is_connected(d, f),
        _ => false,
    };
    results.push(check(
        "outdoor_reach_prunes_far_portals",
        pruned,
        "dog links to the window only",
    ));

    let guard_hears = heard(&engine, guard, dog);
    results.push(check(
        "secondary_hears_flagged_source",
        guard_hears.volume > 0.0 && guard_hears.low_pass < 1.0,
        format!("guard hears dog at {:.3}", guard_hears.volume),
    ));

    let untracked = engine
        .audibility(guard, handles.sources["Kettle"])
        .ok()
        .flatten()
        .is_none();
    results.push(check(
        "secondary_ignores_unflagged_source",
        untracked,
        "kettle is not tracked for the guard",
    ));

    results
}

// ── 5. Floors ───────────────────────────────────────────────────────────

fn validate_floors(verbose: bool) -> Vec<TestResult> {
    println!("--- Floors ---");
    let mut results = Vec::new();
    let Ok((mut engine, handles)) = load_house() else {
        results.push(check("floor_load", false, "scene failed to load"));
        return results;
    };
    let player = handles.listeners["Player"];
    let radio = handles.sources["Radio"];

    tick(&mut engine, 3);
    let upstairs = heard(&engine, player, radio);
    if verbose {
        println!(
            "  radio upstairs: volume {:.3} low-pass {:.3}",
            upstairs.volume, upstairs.low_pass
        );
    }
    results.push(check(
        "floor_transition_muffles",
        upstairs.low_pass <= 0.75,
        format!("low-pass {:.3}", upstairs.low_pass),
    ));

    let radio_pos = Vec3::new(9.0, 7.0, 2.0);
    let perceived = engine.perceived_position(radio).unwrap_or(Vec3::ZERO);
    results.push(check(
        "floor_perceived_at_source",
        perceived.distance(&radio_pos) < 1e-4,
        "sources on other floors are not pulled along the path",
    ));

    let _ = engine.stop_source(radio);
    tick(&mut engine, 1);
    let stopped = heard(&engine, player, radio);
    results.push(check(
        "stopped_source_silent",
        stopped.volume == 0.0 && stopped.last_audible_time.is_some(),
        format!("last heard at {:.2}s", stopped.last_audible_time.unwrap_or(0.0)),
    ));

    results
}

// ── 6. Falloff ──────────────────────────────────────────────────────────

fn validate_falloff(_verbose: bool) -> Vec<TestResult> {
    println!("--- Falloff ---");
    let mut results = Vec::new();

    let models = [
        ("linear", AttenuationModel::Linear),
        ("logarithmic", AttenuationModel::Logarithmic),
        ("outdoor_foley", AttenuationModel::OutdoorFoley),
        (
            "custom",
            AttenuationModel::Custom(Curve::from_points(&[(0.0, 1.0), (0.2, 0.5), (1.0, 0.0)])),
        ),
    ];

    for (name, model) in models {
        let falloff = Falloff::new(model, 2.0, 40.0, 0.9);
        let samples: Vec<f32> = (0..=200).map(|i| falloff.attenuation(i as f32 * 0.25)).collect();
        let monotonic = samples.windows(2).all(|w| w[0] >= w[1] - 1e-6);
        let clamped = falloff.attenuation(0.5) == falloff.attenuation(2.0)
            && falloff.attenuation(100.0) == falloff.attenuation(40.0);
        results.push(check(
            &format!("falloff_{}_monotonic", name),
            monotonic,
            "never louder with distance",
        ));
        results.push(check(
            &format!("falloff_{}_clamped", name),
            clamped,
            "flat outside [min, max]",
        ));
    }

    results
}

// ── 7. Pathfinding ──────────────────────────────────────────────────────

fn validate_pathfinding(_verbose: bool) -> Vec<TestResult> {
    println!("--- Pathfinding ---");
    let mut results = Vec::new();

    // 6×6 grid with 2-unit spacing and 4-neighbour edges.
    let size = 6;
    let mut graph = PathGraph::new();
    let ids: Vec<NodeId> = (0..size * size)
        .map(|i| graph.add_node(Vec3::new((i % size) as f32 * 2.0, 0.0, (i / size) as f32 * 2.0)))
        .collect();
    for row in 0..size {
        for col in 0..size {
            let i = row * size + col;
            if col + 1 < size {
                graph.add_edge(ids[i], ids[i + 1]);
            }
            if row + 1 < size {
                graph.add_edge(ids[i], ids[i + size]);
            }
        }
    }

    let corner = graph.find_shortest_path(ids[0], ids[size * size - 1], false);
    results.push(check(
        "pathfind_grid_optimal",
        (corner.cost - 20.0).abs() < 1e-4 && corner.nodes.len() == 10,
        format!("cost {:.2}, {} nodes", corner.cost, corner.nodes.len()),
    ));

    let skipped = graph.find_shortest_path(ids[0], ids[size * size - 1], true);
    results.push(check(
        "pathfind_skip_first_edge",
        (skipped.cost - 18.0).abs() < 1e-4,
        format!("cost {:.2} without the first hop", skipped.cost),
    ));

    graph.set_travel_cost(ids[1], 50.0);
    graph.set_travel_cost(ids[size], 50.0);
    let detour = graph.find_shortest_path(ids[0], ids[size + 1], false);
    results.push(check(
        "pathfind_avoids_costly_nodes",
        (detour.cost - 54.0).abs() < 1e-4,
        format!("cornered start pays {:.2}", detour.cost),
    ));

    let island = graph.add_node(Vec3::new(100.0, 0.0, 100.0));
    let none = graph.find_shortest_path(ids[0], island, false);
    results.push(check(
        "pathfind_disconnected_empty",
        none.is_empty() && none.cost == 0.0,
        "unreachable target → empty path",
    ));

    graph.remove_node(ids[7]);
    results.push(check(
        "pathfind_symmetric_after_removal",
        graph_symmetric(&graph),
        format!("{} edges remain", graph.edge_count()),
    ));

    results
}

// ── 8. Persistence ──────────────────────────────────────────────────────

fn validate_persistence(_verbose: bool) -> Vec<TestResult> {
    println!("--- Persistence ---");
    let mut results = Vec::new();
    let Ok((mut engine, _)) = load_house() else {
        results.push(check("save_load", false, "scene failed to load"));
        return results;
    };
    tick(&mut engine, 10);

    let mut buffer = Vec::new();
    if let Err(e) = engine.save(&mut buffer) {
        results.push(check("save_scene", false, format!("save error: {}", e)));
        return results;
    }
    results.push(check("save_scene", true, format!("{} bytes", buffer.len())));

    match PropagationEngine::load(&buffer[..]) {
        Ok((loaded, _)) => results.push(check(
            "load_scene_roundtrip",
            loaded.snapshot() == engine.snapshot(),
            "reloaded scene matches snapshot",
        )),
        Err(e) => results.push(check("load_scene_roundtrip", false, format!("load error: {}", e))),
    }

    let snapshot = engine.snapshot();
    let exported = snapshot
        .to_json()
        .and_then(|json| SceneDescription::from_json(&json));
    results.push(match exported {
        Ok(scene) => check(
            "export_json_roundtrip",
            scene == snapshot,
            format!("{} rooms re-read from JSON", scene.rooms.len()),
        ),
        Err(e) => check("export_json_roundtrip", false, format!("export error: {}", e)),
    });

    results
}
