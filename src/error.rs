use thiserror::Error;

/// Why a material swap did not touch any mesh.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SwapError {
    #[error("no model is loaded")]
    NoModel,
    #[error("no group is selected")]
    NoGroupSelected,
    #[error("no material is selected")]
    NoMaterialSelected,
    #[error("unknown group `{0}`")]
    UnknownGroup(String),
    #[error("unknown material `{0}`")]
    UnknownMaterial(String),
}

/// Asset decode failures that are not plain I/O.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("`{0}` contains no scene")]
    NoScene(String),
    #[error("unsupported image pixel format {format:?} in `{source_name}`")]
    UnsupportedImage {
        source_name: String,
        format: gltf::image::Format,
    },
}
