//! swatch-viewer
//!
//! A native GLTF viewer for trying materials on a model. Meshes are grouped by
//! their parent node; picking a group and a material from the catalog rebinds
//! every mesh of that group. Models and textures load in the background and
//! land in the session between frames.
//!
//! High-level modules
//! - `session`: grouping, material swap, selection state and background loads
//! - `selection`: option list with one selected entry
//! - `data_structures`: scene graph, materials, meshes, instances, textures
//! - `resources`: GLTF import and image decoding
//! - `camera`: orbit camera, controller and uniforms for view/projection
//! - `context`: GPU and window context that owns device/queue/pipelines
//! - `pipelines`: model, background and light pipeline setup
//! - `render`: GPU copy of the model and the per-frame pass
//! - `viewer`: window event loop and input routing
//! - `config`: defaults and TOML loading

pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod error;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod selection;
pub mod session;
pub mod viewer;

pub use config::ViewerConfig;
pub use error::{LoadError, SwapError};
pub use selection::SelectControl;
pub use session::{GroupTable, ViewerSession};
