//! Audibility tracking: evaluates every tracked source/listener pair and
//! drives the primary listener's voices.

use hecs::World;
use rand::Rng;
use roomtone_logic::Propagation;

use super::propagation::{propagate, Endpoint, Evaluation, ListenerEnd, RoomInfo};
use crate::components::{Listener, ListenerId, PathAnchor, Room, RoomId, Source, SourceId, Transform};
use crate::host::VoiceOutput;

/// Whether a listener evaluates a source at all.
///
/// The primary listener hears everything; secondary listeners only hear
/// sources flagged audible to them.
pub fn should_track(listener_primary: bool, audible_to_secondary: bool) -> bool {
    listener_primary || audible_to_secondary
}

pub(crate) fn room_info(world: &World, room: Option<RoomId>) -> Option<RoomInfo> {
    let id = room?;
    let room = world.get::<&Room>(id.0).ok()?;
    Some(RoomInfo {
        id,
        is_outdoor: room.is_outdoor,
        origin: room.origin,
    })
}

pub(crate) fn listener_end(world: &World, id: ListenerId) -> Option<ListenerEnd> {
    let (primary, room) = {
        let listener = world.get::<&Listener>(id.0).ok()?;
        (listener.primary, listener.current_room)
    };
    let transform = *world.get::<&Transform>(id.0).ok()?;
    let node = world.get::<&PathAnchor>(id.0).ok()?.0;
    Some(ListenerEnd {
        id,
        primary,
        at: Endpoint {
            position: transform.position,
            forward: transform.forward,
            node,
            room: room_info(world, room),
        },
    })
}

/// A source's endpoint plus its secondary-audibility and playing flags.
pub(crate) fn source_end(world: &World, id: SourceId) -> Option<(Endpoint, bool, bool)> {
    let (room, audible_to_secondary, playing) = {
        let source = world.get::<&Source>(id.0).ok()?;
        (
            source.current_room,
            source.settings.audible_to_secondary_listeners,
            source.playing,
        )
    };
    let transform = *world.get::<&Transform>(id.0).ok()?;
    let node = world.get::<&PathAnchor>(id.0).ok()?.0;
    Some((
        Endpoint {
            position: transform.position,
            forward: transform.forward,
            node,
            room: room_info(world, room),
        },
        audible_to_secondary,
        playing,
    ))
}

/// Evaluate every tracked pair, record results in each listener's
/// audibility table and push smoothed voice parameters for the primary
/// listener to `output`.
///
/// Stopped sources are recorded as silent without evaluation.
pub fn audibility_system<R: Rng>(
    world: &mut World,
    eval: &Evaluation,
    rng: &mut R,
    listeners: &[ListenerId],
    sources: &[SourceId],
    output: &mut dyn VoiceOutput,
) {
    let config = eval.config;

    for &listener_id in listeners {
        let Some(listener) = listener_end(world, listener_id) else {
            continue;
        };
        if !listener.primary && !config.track_secondary_listeners {
            continue;
        }

        for &source_id in sources {
            let Some((at, audible_to_secondary, playing)) = source_end(world, source_id) else {
                continue;
            };
            if !should_track(listener.primary, audible_to_secondary) {
                continue;
            }

            let result = {
                let Ok(mut source) = world.get::<&mut Source>(source_id.0) else {
                    continue;
                };
                if !playing {
                    Propagation::SILENT
                } else {
                    let result = propagate(eval, rng, &mut *source, &at, &listener);
                    if listener.primary {
                        source.voice.apply(
                            result.volume,
                            result.low_pass,
                            config.voice_smoothing_rate,
                            eval.delta_seconds,
                        );
                        output.apply(source_id, &source.voice, source.perceived.current);
                    }
                    result
                }
            };

            if let Ok(mut l) = world.get::<&mut Listener>(listener_id.0) {
                l.audibility.entry(source_id).record(
                    eval.time,
                    result.volume,
                    result.low_pass,
                    config.audibility_threshold,
                );
            }
        }
    }
}
