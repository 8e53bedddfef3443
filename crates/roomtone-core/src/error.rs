//! Error types for the engine, scene loading and persistence.

use thiserror::Error;

use crate::components::{ListenerId, PortalId, RoomId, SourceId};

/// A handle passed to the engine no longer refers to a live entity.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("unknown room {0:?}")]
    UnknownRoom(RoomId),
    #[error("unknown portal {0:?}")]
    UnknownPortal(PortalId),
    #[error("unknown source {0:?}")]
    UnknownSource(SourceId),
    #[error("unknown listener {0:?}")]
    UnknownListener(ListenerId),
}

/// A scene description could not be turned into an engine.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("scene JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("duplicate room name '{0}'")]
    DuplicateRoom(String),
    #[error("portal '{portal}' references unknown room '{room}'")]
    UnknownRoom { portal: String, room: String },
}

/// Errors that can occur during save/load.
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Bincode(#[from] Box<bincode::ErrorKind>),
    #[error("save version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
    #[error(transparent)]
    Scene(#[from] SceneError),
}
