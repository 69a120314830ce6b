//! Materials and the material catalog.
//!
//! A [`Material`] is a CPU-side description of how a mesh is shaded: an optional
//! decoded base colour texture, a base colour factor and the sampling parameters
//! used when the texture is uploaded to the GPU. Materials are shared between
//! meshes through `Arc`, so re-binding a whole group to the same material costs
//! one reference count per mesh.
//!
//! The [`MaterialCatalog`] is the user-selectable set of materials. It keeps
//! insertion order, which makes "the first entry" a stable default.

use std::{
    collections::HashMap,
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

static NEXT_MATERIAL_ID: AtomicU64 = AtomicU64::new(1);

/// Texture coordinate wrapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WrapMode {
    Repeat,
    MirrorRepeat,
    ClampToEdge,
}

/// Texel filtering.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterMode {
    Nearest,
    Linear,
}

/// How a material's texture is sampled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SamplerParams {
    pub wrap_u: WrapMode,
    pub wrap_v: WrapMode,
    pub min_filter: FilterMode,
    pub mag_filter: FilterMode,
    /// Requested anisotropy. The GPU only honours values above 1 when every
    /// filter is linear.
    pub anisotropy: u16,
    /// Whether the texels are sRGB encoded colour data.
    pub srgb: bool,
}

impl Default for SamplerParams {
    fn default() -> Self {
        Self {
            wrap_u: WrapMode::Repeat,
            wrap_v: WrapMode::Repeat,
            min_filter: FilterMode::Linear,
            mag_filter: FilterMode::Nearest,
            anisotropy: 16,
            srgb: true,
        }
    }
}

/// A named, shareable surface description.
pub struct Material {
    id: u64,
    name: String,
    base_colour: [f32; 4],
    texture: Option<Arc<image::RgbaImage>>,
    sampler: SamplerParams,
}

impl Material {
    /// A material sampling `texture` with the default sampling parameters.
    pub fn textured(name: impl Into<String>, texture: image::RgbaImage) -> Self {
        Self::new(name, [1.0; 4], Some(Arc::new(texture)), SamplerParams::default())
    }

    /// A material with a flat colour and no texture bound.
    pub fn untextured(name: impl Into<String>, base_colour: [f32; 4]) -> Self {
        Self::new(name, base_colour, None, SamplerParams::default())
    }

    pub fn new(
        name: impl Into<String>,
        base_colour: [f32; 4],
        texture: Option<Arc<image::RgbaImage>>,
        sampler: SamplerParams,
    ) -> Self {
        Self {
            id: NEXT_MATERIAL_ID.fetch_add(1, Ordering::Relaxed),
            name: name.into(),
            base_colour,
            texture,
            sampler,
        }
    }

    /// Process-unique id, used to key GPU resources.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_colour(&self) -> [f32; 4] {
        self.base_colour
    }

    pub fn texture(&self) -> Option<&Arc<image::RgbaImage>> {
        self.texture.as_ref()
    }

    pub fn has_texture(&self) -> bool {
        self.texture.is_some()
    }

    pub fn sampler(&self) -> &SamplerParams {
        &self.sampler
    }
}

impl fmt::Debug for Material {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Material")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("base_colour", &self.base_colour)
            .field(
                "texture",
                &self.texture.as_ref().map(|texture| texture.dimensions()),
            )
            .finish()
    }
}

/// Insertion-ordered mapping from material name to material.
#[derive(Debug, Default)]
pub struct MaterialCatalog {
    entries: Vec<Arc<Material>>,
    index: HashMap<String, usize>,
}

impl MaterialCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `material` under its name.
    ///
    /// An existing entry of the same name is replaced in place (it keeps its
    /// position) and returned.
    pub fn insert(&mut self, material: Material) -> Option<Arc<Material>> {
        self.insert_shared(Arc::new(material))
    }

    pub fn insert_shared(&mut self, material: Arc<Material>) -> Option<Arc<Material>> {
        match self.index.get(material.name()) {
            Some(&slot) => Some(std::mem::replace(&mut self.entries[slot], material)),
            None => {
                self.index
                    .insert(material.name().to_string(), self.entries.len());
                self.entries.push(material);
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Material>> {
        self.index.get(name).map(|&slot| &self.entries[slot])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// The default material: the first entry ever inserted.
    pub fn first(&self) -> Option<&Arc<Material>> {
        self.entries.first()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|material| material.name())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Material>> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
