use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context;

use crate::{
    data_structures::{
        instance::Instance,
        material::Material,
        model::MeshData,
        scene_graph::{NodeId, Scene},
    },
    error::LoadError,
};

/**
 * This module contains all logic for loading models and textures from external
 * files or uploaded bytes. Decoding is CPU work and runs on tokio's blocking pool.
 */
pub mod texture;

/// Where an asset comes from: a file below the asset root or bytes handed in
/// by the user (a dropped file).
#[derive(Clone)]
pub enum AssetSource {
    Path(PathBuf),
    Bytes { name: String, bytes: Arc<[u8]> },
}

impl AssetSource {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    pub fn bytes(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self::Bytes {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Human readable name used in logs and as a fallback scene name.
    pub fn name(&self) -> String {
        match self {
            Self::Path(path) => path.display().to_string(),
            Self::Bytes { name, .. } => name.clone(),
        }
    }
}

impl fmt::Debug for AssetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Self::Bytes { name, bytes } => f
                .debug_struct("Bytes")
                .field("name", name)
                .field("len", &bytes.len())
                .finish(),
        }
    }
}

pub async fn load_binary(asset_root: &Path, file_name: &Path) -> anyhow::Result<Vec<u8>> {
    let path = asset_root.join(file_name);
    tokio::fs::read(&path)
        .await
        .with_context(|| format!("failed to read `{}`", path.display()))
}

async fn source_bytes(asset_root: &Path, source: AssetSource) -> anyhow::Result<Arc<[u8]>> {
    match source {
        AssetSource::Path(path) => Ok(load_binary(asset_root, &path).await?.into()),
        AssetSource::Bytes { bytes, .. } => Ok(bytes),
    }
}

/// Loads a material whose colour texture is the image at `source`.
pub async fn load_material(
    asset_root: &Path,
    name: &str,
    source: AssetSource,
) -> anyhow::Result<Material> {
    let source_name = source.name();
    let bytes = source_bytes(asset_root, source).await?;
    let rgba = tokio::task::spawn_blocking(move || texture::decode_image(&bytes))
        .await
        .context("image decode task failed")?
        .with_context(|| format!("failed to decode `{source_name}`"))?;
    log::debug!(
        "decoded material `{}` ({}x{}) from `{}`",
        name,
        rgba.width(),
        rgba.height(),
        source_name
    );
    Ok(Material::textured(name, rgba))
}

/// Loads a background image.
pub async fn load_image(asset_root: &Path, source: AssetSource) -> anyhow::Result<image::RgbaImage> {
    let source_name = source.name();
    let bytes = source_bytes(asset_root, source).await?;
    tokio::task::spawn_blocking(move || texture::decode_image(&bytes))
        .await
        .context("image decode task failed")?
        .with_context(|| format!("failed to decode `{source_name}`"))
}

/// Imports a GLTF/GLB model into a [`Scene`].
///
/// Files on disk may reference external buffers and images relative to
/// themselves; uploaded bytes must be a self-contained GLB.
pub async fn load_model_gltf(asset_root: &Path, source: AssetSource) -> anyhow::Result<Scene> {
    let source_name = source.name();
    let imported = match source {
        AssetSource::Path(path) => {
            let path = asset_root.join(path);
            tokio::task::spawn_blocking(move || gltf::import(path)).await
        }
        AssetSource::Bytes { bytes, .. } => {
            tokio::task::spawn_blocking(move || gltf::import_slice(&bytes)).await
        }
    };
    let (document, buffers, images) = imported
        .context("model import task failed")?
        .with_context(|| format!("failed to import `{source_name}`"))?;
    let scene = scene_from_document(&source_name, &document, &buffers, &images)?;
    log::info!(
        "imported `{}`: {} nodes, {} meshes",
        source_name,
        scene.len(),
        scene.meshes().count()
    );
    Ok(scene)
}

/// Builds the scene graph of the document's default scene (or its first).
///
/// - a node without mesh becomes a group
/// - a node whose mesh has one primitive becomes a mesh leaf
/// - a node whose mesh has several primitives becomes a group with one mesh
///   leaf per primitive, named `<mesh>_<index>`
pub fn scene_from_document(
    source_name: &str,
    document: &gltf::Document,
    buffers: &[gltf::buffer::Data],
    images: &[gltf::image::Data],
) -> Result<Scene, LoadError> {
    let gltf_scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .ok_or_else(|| LoadError::NoScene(source_name.to_string()))?;

    let materials = document
        .materials()
        .map(|material| to_material(source_name, &material, images))
        .collect::<Vec<_>>();

    let mut importer = Importer {
        buffers,
        materials,
        placeholder: None,
    };
    let mut scene = Scene::new(gltf_scene.name().unwrap_or(source_name));
    let root = scene.root();
    for node in gltf_scene.nodes() {
        importer.add_node(&mut scene, root, &node);
    }
    Ok(scene)
}

fn to_material(
    source_name: &str,
    material: &gltf::Material,
    images: &[gltf::image::Data],
) -> Arc<Material> {
    let pbr = material.pbr_metallic_roughness();
    let name = material
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("material_{}", material.index().unwrap_or_default()));
    let texture = pbr.base_color_texture().and_then(|info| {
        let image = images.get(info.texture().source().index())?;
        match texture::rgba_from_gltf(image, source_name) {
            Ok(rgba) => Some(Arc::new(rgba)),
            Err(e) => {
                log::warn!("material `{}` keeps no texture: {}", name, e);
                None
            }
        }
    });
    Arc::new(Material::new(
        name,
        pbr.base_color_factor(),
        texture,
        Default::default(),
    ))
}

struct Importer<'a> {
    buffers: &'a [gltf::buffer::Data],
    materials: Vec<Arc<Material>>,
    placeholder: Option<Arc<Material>>,
}

impl Importer<'_> {
    fn add_node(&mut self, scene: &mut Scene, parent: NodeId, node: &gltf::Node) {
        let name = node.name().unwrap_or_default();
        let mut primitives = node
            .mesh()
            .map(|mesh| {
                mesh.primitives()
                    .filter_map(|primitive| self.read_primitive(&primitive))
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        let id = if primitives.len() > 1 {
            let group = scene.add_group(parent, name);
            let mesh_name = node
                .mesh()
                .and_then(|mesh| mesh.name().map(str::to_string))
                .unwrap_or_else(|| format!("mesh_{}", node.index()));
            for (idx, (geometry, material)) in primitives.into_iter().enumerate() {
                scene.add_mesh(group, format!("{mesh_name}_{idx}"), geometry, material);
            }
            group
        } else if let Some((geometry, material)) = primitives.pop() {
            scene.add_mesh(parent, name, geometry, material)
        } else {
            scene.add_group(parent, name)
        };

        let (position, rotation, scale) = node.transform().decomposed();
        scene.set_local_transform(
            id,
            Instance {
                position: position.into(),
                rotation: cgmath::Quaternion::new(rotation[3], rotation[0], rotation[1], rotation[2]),
                scale: scale.into(),
            },
        );

        for child in node.children() {
            self.add_node(scene, id, &child);
        }
    }

    fn read_primitive(
        &mut self,
        primitive: &gltf::Primitive,
    ) -> Option<(Arc<MeshData>, Arc<Material>)> {
        if primitive.mode() != gltf::mesh::Mode::Triangles {
            log::warn!(
                "skipping primitive {} drawn as {:?}, only triangles are supported",
                primitive.index(),
                primitive.mode()
            );
            return None;
        }
        let buffers = self.buffers;
        let reader = primitive.reader(move |buffer| buffers.get(buffer.index()).map(|data| &data.0[..]));
        let Some(positions) = reader.read_positions() else {
            log::debug!("skipping primitive {} without positions", primitive.index());
            return None;
        };
        let mesh = MeshData::new(
            positions.collect(),
            reader.read_normals().map(Iterator::collect),
            reader
                .read_tex_coords(0)
                .map(|coords| coords.into_f32().collect()),
            reader
                .read_indices()
                .map(|indices| indices.into_u32().collect()),
        );
        let material = match primitive.material().index() {
            Some(idx) => self.materials.get(idx).cloned(),
            None => None,
        }
        .unwrap_or_else(|| self.placeholder());
        Some((Arc::new(mesh), material))
    }

    fn placeholder(&mut self) -> Arc<Material> {
        self.placeholder
            .get_or_insert_with(|| Arc::new(Material::untextured("default", [1.0; 4])))
            .clone()
    }
}
