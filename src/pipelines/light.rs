use wgpu::util::DeviceExt;

pub struct LightResources {
    pub uniform: LightUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl LightResources {
    pub fn new(device: &wgpu::Device, uniform: LightUniform) -> Self {
        let buffer = mk_buffer(device, uniform);
        let bind_group_layout = mk_bind_group_layout(device);
        let bind_group = mk_bind_group(device, &bind_group_layout, &buffer);
        Self {
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }
}

/// Every light of the scene in one uniform.
///
/// Each field is a vec4 so the layout needs no padding; the `w` component holds
/// the light's intensity where one applies.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    /// rgb colour, w intensity
    pub ambient: [f32; 4],
    /// xyz position the directional light shines from, w intensity
    pub directional_position: [f32; 4],
    pub directional_colour: [f32; 4],
    /// rgb sky colour, w hemisphere intensity
    pub sky_colour: [f32; 4],
    pub ground_colour: [f32; 4],
    /// xyz world position, w intensity
    pub point_position: [f32; 4],
    pub point_colour: [f32; 4],
}

impl Default for LightUniform {
    fn default() -> Self {
        let white = [1.0, 1.0, 1.0, 1.0];
        Self {
            ambient: [1.0, 1.0, 1.0, 0.5],
            directional_position: [50.0, 50.0, 50.0, 1.0],
            directional_colour: white,
            sky_colour: [1.0, 1.0, 1.0, 1.0],
            ground_colour: hex_colour(0x444444),
            point_position: [5.0, 5.0, 5.0, 1.0],
            point_colour: white,
        }
    }
}

/// `0xRRGGBB` to rgba floats.
pub fn hex_colour(hex: u32) -> [f32; 4] {
    let channel = |shift: u32| ((hex >> shift) & 0xff) as f32 / 255.0;
    [channel(16), channel(8), channel(0), 1.0]
}

pub fn mk_buffer(device: &wgpu::Device, light_uniform: LightUniform) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Light Buffer"),
        contents: bytemuck::cast_slice(&[light_uniform]),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    })
}

pub fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some("light_bind_group_layout"),
    })
}

pub fn mk_bind_group(
    device: &wgpu::Device,
    bind_group_layout: &wgpu::BindGroupLayout,
    light_buffer: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout: bind_group_layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: light_buffer.as_entire_binding(),
        }],
        label: Some("light_bind_group"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_is_a_whole_number_of_vec4s() {
        assert_eq!(std::mem::size_of::<LightUniform>() % 16, 0);
    }

    #[test]
    fn default_rig() {
        let rig = LightUniform::default();
        assert_eq!(rig.ambient[3], 0.5);
        assert_eq!(&rig.directional_position[..3], &[50.0, 50.0, 50.0]);
        assert_eq!(&rig.point_position[..3], &[5.0, 5.0, 5.0]);
        assert_eq!(rig.ground_colour, [68.0 / 255.0, 68.0 / 255.0, 68.0 / 255.0, 1.0]);
    }
}
