//! Viewer data structures: scene graphs, materials, meshes, transforms and textures.
//!
//! - `scene_graph` is the arena tree a loaded model is stored in
//! - `material` holds materials, sampling parameters and the material catalog
//! - `model` contains CPU mesh data and its GPU-uploaded form
//! - `instance` holds node transforms and their GPU representation
//! - `aabb` is the bounding box used to frame the camera
//! - `texture` contains the GPU texture wrapper and creation utilities

pub mod aabb;
pub mod instance;
pub mod material;
pub mod model;
pub mod scene_graph;
pub mod texture;
