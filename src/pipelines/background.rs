use crate::{
    data_structures::{
        material::{FilterMode, SamplerParams},
        texture::{Texture, create_sampler},
    },
    pipelines::basic::{depth_state, mk_render_pipeline},
    resources::texture::background_layout,
};

/// Background image drawn behind the model.
pub struct Background {
    pub texture: Texture,
    pub sampler: wgpu::Sampler,
    pub bind_group: wgpu::BindGroup,
}

impl Background {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        image: &image::RgbaImage,
    ) -> Self {
        let params = SamplerParams {
            mag_filter: FilterMode::Linear,
            ..SamplerParams::default()
        };
        let texture = Texture::from_image(device, queue, image, &params, Some("background"));
        let sampler = texture
            .sampler
            .clone()
            .unwrap_or_else(|| create_sampler(device, &params));
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
            label: Some("background_bind_group"),
        });
        Self {
            texture,
            sampler,
            bind_group,
        }
    }
}

/// Pipeline of the full screen background pass. It never writes depth and always
/// passes the depth test, so the model drawn afterwards covers it.
pub fn mk_background_pipeline(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
) -> (wgpu::RenderPipeline, wgpu::BindGroupLayout) {
    let bind_group_layout = background_layout(device);
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Background Pipeline Layout"),
        bind_group_layouts: &[&bind_group_layout],
        push_constant_ranges: &[],
    });
    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Background Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("background.wgsl").into()),
    };
    let pipeline = mk_render_pipeline(
        device,
        &layout,
        config.format,
        Some(wgpu::BlendState::REPLACE),
        Some(depth_state(false, wgpu::CompareFunction::Always)),
        &[],
        shader,
    );
    (pipeline, bind_group_layout)
}
