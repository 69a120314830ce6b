//! Mesh geometry on the CPU and on the GPU.
//!
//! [`MeshData`] is what the importer produces and what the scene graph stores;
//! [`GpuMesh`] is its uploaded form together with the world transform of the node
//! it belongs to. [`DrawMesh`] extends `wgpu::RenderPass` with the draw call the
//! model pipeline expects.

use std::ops::Range;

use wgpu::util::DeviceExt;

use crate::data_structures::{
    instance::Instance,
    scene_graph::NodeId,
};

pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
    pub normal: [f32; 3],
}

impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 5]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// Triangle geometry of a single mesh leaf.
///
/// `normals` and `tex_coords` always have one entry per position; the importer
/// fills in defaults when the source omits them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub tex_coords: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Builds a mesh, padding missing normals with `+Y`, missing texture
    /// coordinates with zero and missing indices with `0..n`.
    pub fn new(
        positions: Vec<[f32; 3]>,
        normals: Option<Vec<[f32; 3]>>,
        tex_coords: Option<Vec<[f32; 2]>>,
        indices: Option<Vec<u32>>,
    ) -> Self {
        let len = positions.len();
        let mut normals = normals.unwrap_or_default();
        normals.resize(len, [0.0, 1.0, 0.0]);
        let mut tex_coords = tex_coords.unwrap_or_default();
        tex_coords.resize(len, [0.0, 0.0]);
        let indices = indices.unwrap_or_else(|| (0..len as u32).collect());
        Self {
            positions,
            normals,
            tex_coords,
            indices,
        }
    }

    pub fn vertices(&self) -> Vec<ModelVertex> {
        self.positions
            .iter()
            .zip(&self.normals)
            .zip(&self.tex_coords)
            .map(|((&position, &normal), &tex_coords)| ModelVertex {
                position,
                tex_coords,
                normal,
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty() || self.positions.is_empty()
    }
}

/// A mesh leaf uploaded to the GPU.
#[derive(Debug)]
pub struct GpuMesh {
    pub node: NodeId,
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub instance_buffer: wgpu::Buffer,
    pub num_elements: u32,
}

impl GpuMesh {
    pub fn new(
        device: &wgpu::Device,
        node: NodeId,
        name: &str,
        mesh: &MeshData,
        world: &Instance,
    ) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Vertex Buffer", name)),
            contents: bytemuck::cast_slice(&mesh.vertices()),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Index Buffer", name)),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Instance Buffer", name)),
            contents: bytemuck::cast_slice(&[world.to_raw()]),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });
        Self {
            node,
            vertex_buffer,
            index_buffer,
            instance_buffer,
            num_elements: mesh.indices.len() as u32,
        }
    }
}

pub trait DrawMesh {
    fn draw_mesh(
        &mut self,
        mesh: &GpuMesh,
        material: &wgpu::BindGroup,
        camera_bind_group: &wgpu::BindGroup,
        light_bind_group: &wgpu::BindGroup,
    );

    fn draw_mesh_instanced(
        &mut self,
        mesh: &GpuMesh,
        instances: Range<u32>,
        material: &wgpu::BindGroup,
        camera_bind_group: &wgpu::BindGroup,
        light_bind_group: &wgpu::BindGroup,
    );
}

impl DrawMesh for wgpu::RenderPass<'_> {
    fn draw_mesh(
        &mut self,
        mesh: &GpuMesh,
        material: &wgpu::BindGroup,
        camera_bind_group: &wgpu::BindGroup,
        light_bind_group: &wgpu::BindGroup,
    ) {
        self.draw_mesh_instanced(mesh, 0..1, material, camera_bind_group, light_bind_group);
    }

    fn draw_mesh_instanced(
        &mut self,
        mesh: &GpuMesh,
        instances: Range<u32>,
        material: &wgpu::BindGroup,
        camera_bind_group: &wgpu::BindGroup,
        light_bind_group: &wgpu::BindGroup,
    ) {
        self.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        self.set_vertex_buffer(1, mesh.instance_buffer.slice(..));
        self.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        self.set_bind_group(0, material, &[]);
        self.set_bind_group(1, camera_bind_group, &[]);
        self.set_bind_group(2, light_bind_group, &[]);
        self.draw_indexed(0..mesh.num_elements, 0, instances);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_attributes_are_padded() {
        let mesh = MeshData::new(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            None,
            Some(vec![[0.5, 0.5]]),
            None,
        );
        assert_eq!(mesh.normals, vec![[0.0, 1.0, 0.0]; 3]);
        assert_eq!(mesh.tex_coords, vec![[0.5, 0.5], [0.0, 0.0], [0.0, 0.0]]);
        assert_eq!(mesh.indices, vec![0, 1, 2]);
        assert_eq!(mesh.vertices().len(), 3);
        assert!(!mesh.is_empty());
    }
}
