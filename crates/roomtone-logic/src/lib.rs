//! Pure propagation logic for roomtone.
//!
//! This crate holds the math behind room/portal sound propagation with no
//! ECS, engine or I/O dependency. Functions take plain data and return
//! results, so every formula is unit-testable on its own and reusable by
//! the engine crate and the headless harness.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`attenuation`] | Falloff models (linear, logarithmic, custom curve) and validation |
//! | [`cone`] | Directional emission cones and their distance penalty |
//! | [`constants`] | Tuning constants for every stage of the model |
//! | [`math`] | `Vec3` and axis-aligned bounding boxes |
//! | [`pathfinding`] | Arena path graph with symmetric edges and A* search |
//! | [`portal`] | Portal travel cost and open/close interpolation |
//! | [`propagation`] | Leakage, floor heuristic, obstruction sampling, perceived placement |
//! | [`smoothing`] | Voice parameter and position smoothing |

pub mod attenuation;
pub mod cone;
pub mod constants;
pub mod math;
pub mod pathfinding;
pub mod portal;
pub mod propagation;
pub mod smoothing;

pub use attenuation::{AttenuationModel, Curve, Falloff, FalloffIssue};
pub use cone::Cone;
pub use math::{BoundingBox, Vec3};
pub use pathfinding::{NodeId, Path, PathGraph};
pub use propagation::Propagation;
