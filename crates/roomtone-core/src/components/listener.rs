//! Listener components and per-listener audibility bookkeeping.

use std::collections::HashMap;

use super::common::{RoomId, SourceId};

/// What a listener last heard from one source.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AudibilityData {
    /// Engine time the source was last heard above the audibility threshold,
    /// `None` until it first is.
    pub last_audible_time: Option<f64>,
    pub volume: f32,
    pub low_pass: f32,
}

impl AudibilityData {
    /// Store a fresh evaluation. The timestamp only moves when the volume
    /// clears `threshold`.
    pub fn record(&mut self, time: f64, volume: f32, low_pass: f32, threshold: f32) {
        self.volume = volume;
        self.low_pass = low_pass;
        if volume > threshold {
            self.last_audible_time = Some(time);
        }
    }
}

/// Audibility of every tracked source for one listener.
#[derive(Debug, Clone, Default)]
pub struct AudibilityTable {
    entries: HashMap<SourceId, AudibilityData>,
}

impl AudibilityTable {
    pub fn get(&self, source: SourceId) -> Option<&AudibilityData> {
        self.entries.get(&source)
    }

    /// Entry for `source`, created zeroed on first use.
    pub fn entry(&mut self, source: SourceId) -> &mut AudibilityData {
        self.entries.entry(source).or_default()
    }

    pub fn remove(&mut self, source: SourceId) -> Option<AudibilityData> {
        self.entries.remove(&source)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sources heard above the threshold within `window` seconds of `now`.
    pub fn audible_since(&self, now: f64, window: f64) -> Vec<SourceId> {
        let mut ids: Vec<SourceId> = self
            .entries
            .iter()
            .filter(|(_, d)| d.last_audible_time.is_some_and(|t| now - t <= window))
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        ids
    }

    /// Source with the highest current volume.
    pub fn loudest(&self) -> Option<(SourceId, AudibilityData)> {
        self.entries
            .iter()
            .filter(|(_, d)| d.volume > 0.0)
            .max_by(|a, b| a.1.volume.total_cmp(&b.1.volume).then(b.0.cmp(a.0)))
            .map(|(id, d)| (*id, *d))
    }
}

/// An ear in the world.
#[derive(Debug, Clone)]
pub struct Listener {
    pub name: String,
    pub primary: bool,
    pub current_room: Option<RoomId>,
    pub audibility: AudibilityTable,
}

impl Listener {
    pub fn new(name: impl Into<String>, primary: bool) -> Self {
        Self {
            name: name.into(),
            primary,
            current_room: None,
            audibility: AudibilityTable::default(),
        }
    }
}
