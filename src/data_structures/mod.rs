//! Engine data structures: meshes, instances, planes and render targets.
//!
//! - `mesh` contains vertex layouts, CPU vertex data and the mesh node
//! - `instance` holds the per-mesh world transform uploaded each frame
//! - `plane` is the `ax + by + cz + d = 0` plane used to orient plane meshes
//! - `texture` wraps the depth and colour targets of the engine

pub mod instance;
pub mod mesh;
pub mod plane;
pub mod texture;
