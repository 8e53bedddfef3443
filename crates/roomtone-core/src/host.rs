//! Seams to the host: line-of-sight queries in, voice parameters out.

use roomtone_logic::smoothing::VoiceState;
use roomtone_logic::Vec3;

use crate::components::SourceId;

/// Answers whether static geometry blocks the segment between two points.
pub trait ObstructionQuery {
    fn line_obstructed(&self, from: Vec3, to: Vec3) -> bool;
}

impl<F> ObstructionQuery for F
where
    F: Fn(Vec3, Vec3) -> bool,
{
    fn line_obstructed(&self, from: Vec3, to: Vec3) -> bool {
        self(from, to)
    }
}

/// A world with no occluding geometry.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unobstructed;

impl ObstructionQuery for Unobstructed {
    fn line_obstructed(&self, _from: Vec3, _to: Vec3) -> bool {
        false
    }
}

/// Receives the smoothed parameters of every playing source heard by the
/// primary listener, once per update.
pub trait VoiceOutput {
    fn apply(&mut self, source: SourceId, voice: &VoiceState, position: Vec3);
}

/// Discards voice updates.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullOutput;

impl VoiceOutput for NullOutput {
    fn apply(&mut self, _source: SourceId, _voice: &VoiceState, _position: Vec3) {}
}

/// Keeps every voice update of the last frame.
#[derive(Debug, Clone, Default)]
pub struct CollectingOutput {
    pub applied: Vec<(SourceId, VoiceState, Vec3)>,
}

impl CollectingOutput {
    pub fn clear(&mut self) {
        self.applied.clear();
    }

    pub fn latest(&self, source: SourceId) -> Option<&(SourceId, VoiceState, Vec3)> {
        self.applied.iter().rev().find(|(id, _, _)| *id == source)
    }
}

impl VoiceOutput for CollectingOutput {
    fn apply(&mut self, source: SourceId, voice: &VoiceState, position: Vec3) {
        self.applied.push((source, *voice, position));
    }
}
