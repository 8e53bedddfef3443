//! Save/Load functionality for persisting scenes
//!
//! Uses bincode for compact binary serialization of a [`SceneDescription`].
//! Runtime state (paths, audibility, smoothing) is rebuilt on load.

use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

use crate::engine::PropagationEngine;
use crate::error::SaveError;
use crate::scene::{SceneDescription, SceneHandles};

/// Version number for save file format (increment when format changes)
const SAVE_VERSION: u32 = 1;

/// Versioned envelope around a scene
#[derive(Serialize, Deserialize)]
struct SaveData {
    version: u32,
    /// Engine time at save, informational only
    saved_at: f64,
    scene: SceneDescription,
}

/// Save a scene to a writer
pub fn save_scene<W: Write>(writer: W, scene: &SceneDescription, saved_at: f64) -> Result<(), SaveError> {
    let save_data = SaveData {
        version: SAVE_VERSION,
        saved_at,
        scene: scene.clone(),
    };
    bincode::serialize_into(writer, &save_data)?;
    Ok(())
}

/// Load a scene from a reader
pub fn load_scene<R: Read>(reader: R) -> Result<SceneDescription, SaveError> {
    let save_data: SaveData = bincode::deserialize_from(reader)?;

    if save_data.version != SAVE_VERSION {
        return Err(SaveError::VersionMismatch {
            expected: SAVE_VERSION,
            found: save_data.version,
        });
    }
    Ok(save_data.scene)
}

impl PropagationEngine {
    /// Save the engine's registrations to a writer
    pub fn save<W: Write>(&self, writer: W) -> Result<(), SaveError> {
        save_scene(writer, &self.snapshot(), self.time())
    }

    /// Build a fresh engine from a saved scene
    pub fn load<R: Read>(reader: R) -> Result<(Self, SceneHandles), SaveError> {
        let scene = load_scene(reader)?;
        Ok(PropagationEngine::from_scene(&scene)?)
    }
}
