//! GPU side of the loaded model and the per-frame render pass.
//!
//! [`GpuScene`] mirrors the session's model on the GPU: one [`GpuMesh`] per mesh
//! leaf, uploaded again whenever a new model is installed, and one bind group per
//! distinct material, keyed by the material's id. Material swaps never touch
//! geometry; the next frame simply looks up a different bind group.

use std::{collections::HashMap, collections::HashSet, iter};

use wgpu::util::DeviceExt;

use crate::{
    context::Context,
    data_structures::{
        material::{Material, MaterialCatalog},
        model::{DrawMesh, GpuMesh},
        scene_graph::Scene,
        texture::{Texture, create_sampler},
    },
    pipelines::background::Background,
};

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct MaterialUniform {
    base_colour: [f32; 4],
}

/// Texture, uniform and bind group of one material.
struct MaterialBinding {
    bind_group: wgpu::BindGroup,
    _texture: Option<Texture>,
    _uniform: wgpu::Buffer,
}

impl MaterialBinding {
    fn new(ctx: &Context, material: &Material, white: &Texture) -> Self {
        let texture = material.texture().map(|rgba| {
            Texture::from_image(
                &ctx.device,
                &ctx.queue,
                rgba,
                material.sampler(),
                Some(material.name()),
            )
        });
        let bound = texture.as_ref().unwrap_or(white);
        let sampler = bound
            .sampler
            .clone()
            .unwrap_or_else(|| create_sampler(&ctx.device, material.sampler()));
        let uniform = ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{} Material Buffer", material.name())),
                contents: bytemuck::cast_slice(&[MaterialUniform {
                    base_colour: material.base_colour(),
                }]),
                usage: wgpu::BufferUsages::UNIFORM,
            });
        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &ctx.material_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&bound.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: uniform.as_entire_binding(),
                },
            ],
            label: Some(material.name()),
        });
        Self {
            bind_group,
            _texture: texture,
            _uniform: uniform,
        }
    }
}

/// Ids of materials whose GPU resources must stay alive: everything bound to a
/// mesh plus everything the user can still pick.
pub fn live_material_ids(scene: Option<&Scene>, catalog: &MaterialCatalog) -> HashSet<u64> {
    scene
        .into_iter()
        .flat_map(|scene| scene.meshes().filter_map(|(_, node)| node.material()))
        .chain(catalog.iter())
        .map(|material| material.id())
        .collect()
}

pub struct GpuScene {
    revision: u64,
    meshes: Vec<GpuMesh>,
    materials: HashMap<u64, MaterialBinding>,
    white: Texture,
}

impl GpuScene {
    pub fn new(ctx: &Context) -> Self {
        Self {
            revision: 0,
            meshes: Vec::new(),
            materials: HashMap::new(),
            white: Texture::white(&ctx.device, &ctx.queue),
        }
    }

    /// Brings the GPU copy up to date with `scene`.
    ///
    /// Geometry is uploaded again only when `revision` changed. Material bind
    /// groups are created for newly bound materials and dropped for materials
    /// that are neither bound nor in the catalog.
    pub fn sync(
        &mut self,
        ctx: &Context,
        scene: Option<&Scene>,
        revision: u64,
        catalog: &MaterialCatalog,
    ) {
        if self.revision != revision {
            self.meshes = scene.map(|scene| upload(ctx, scene)).unwrap_or_default();
            self.revision = revision;
            log::debug!("uploaded {} mesh(es) for revision {}", self.meshes.len(), revision);
        }

        if let Some(scene) = scene {
            for (_, node) in scene.meshes() {
                if let Some(material) = node.material() {
                    self.materials
                        .entry(material.id())
                        .or_insert_with(|| MaterialBinding::new(ctx, material, &self.white));
                }
            }
        }

        let live = live_material_ids(scene, catalog);
        self.materials.retain(|id, _| live.contains(id));
    }

    fn draw(&self, ctx: &Context, scene: &Scene, render_pass: &mut wgpu::RenderPass<'_>) {
        render_pass.set_pipeline(&ctx.pipelines.model);
        for mesh in &self.meshes {
            let Some(binding) = scene
                .material(mesh.node)
                .and_then(|material| self.materials.get(&material.id()))
            else {
                log::warn!("mesh {:?} has no uploaded material", mesh.node);
                continue;
            };
            render_pass.draw_mesh(
                mesh,
                &binding.bind_group,
                &ctx.camera.bind_group,
                &ctx.light.bind_group,
            );
        }
    }
}

fn upload(ctx: &Context, scene: &Scene) -> Vec<GpuMesh> {
    scene
        .meshes()
        .filter_map(|(id, node)| {
            let geometry = node.geometry()?;
            if geometry.is_empty() {
                return None;
            }
            Some(GpuMesh::new(
                &ctx.device,
                id,
                &node.name,
                geometry,
                &scene.world_transform(id),
            ))
        })
        .collect()
}

/// Draws one frame: background (image or clear colour), then every mesh leaf.
pub fn render_frame(
    ctx: &Context,
    gpu: &GpuScene,
    scene: Option<&Scene>,
    background: Option<&Background>,
) -> Result<(), wgpu::SurfaceError> {
    let output = ctx.surface.get_current_texture()?;
    let view = output
        .texture
        .create_view(&wgpu::TextureViewDescriptor::default());

    let mut encoder = ctx
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });
    {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(ctx.clear_colour),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &ctx.depth_texture.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });

        if let Some(background) = background {
            render_pass.set_pipeline(&ctx.pipelines.background);
            render_pass.set_bind_group(0, &background.bind_group, &[]);
            render_pass.draw(0..3, 0..1);
        }

        if let Some(scene) = scene {
            gpu.draw(ctx, scene, &mut render_pass);
        }
    }

    ctx.queue.submit(iter::once(encoder.finish()));
    output.present();
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::data_structures::model::MeshData;

    #[test]
    fn bound_and_catalog_materials_stay_live() {
        let mut catalog = MaterialCatalog::new();
        catalog.insert(Material::untextured("red", [1.0, 0.0, 0.0, 1.0]));
        let baked = Arc::new(Material::untextured("baked", [0.5; 4]));
        let mut scene = Scene::new("Scene");
        let root = scene.root();
        scene.add_mesh(root, "mesh", Arc::new(MeshData::default()), baked.clone());

        let live = live_material_ids(Some(&scene), &catalog);

        assert!(live.contains(&baked.id()));
        assert!(live.contains(&catalog.get("red").expect("red").id()));
        assert_eq!(live.len(), 2);
        assert_eq!(live_material_ids(None, &MaterialCatalog::new()).len(), 0);
    }
}
