//! Systems - logic that operates on components

mod portals;
mod propagation;
mod topology;
mod tracker;

pub use portals::*;
pub use propagation::*;
pub use topology::*;
pub use tracker::*;
