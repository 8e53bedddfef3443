//! Component definitions for the propagation world.
//!
//! Components are pure data attached to hecs entities. Behavior lives in
//! the systems and the engine.

mod common;
mod listener;
mod portal;
mod room;
mod source;

pub use common::*;
pub use listener::*;
pub use portal::*;
pub use room::*;
pub use source::*;

pub use roomtone_logic::portal::PortalLerp;
