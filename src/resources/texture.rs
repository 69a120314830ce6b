use crate::error::LoadError;

/// Bind group 0 of the model pipeline: colour texture, its sampler and the
/// material uniform (base colour factor).
pub fn material_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
        ],
        label: Some("material_bind_group_layout"),
    })
}

/// Layout of the background pass: one texture and its sampler.
pub fn background_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
        label: Some("background_bind_group_layout"),
    })
}

/// Decodes an encoded image file (PNG, JPEG, ...) into RGBA8 texels.
pub fn decode_image(bytes: &[u8]) -> anyhow::Result<image::RgbaImage> {
    Ok(image::load_from_memory(bytes)?.to_rgba8())
}

/// Converts an image the gltf importer already decoded into RGBA8 texels.
pub fn rgba_from_gltf(
    data: &gltf::image::Data,
    source_name: &str,
) -> Result<image::RgbaImage, LoadError> {
    use gltf::image::Format;

    let unsupported = || LoadError::UnsupportedImage {
        source_name: source_name.to_string(),
        format: data.format,
    };
    let (width, height) = (data.width, data.height);
    let pixels = data.pixels.clone();
    let dynamic = match data.format {
        Format::R8G8B8A8 => image::RgbaImage::from_raw(width, height, pixels)
            .map(image::DynamicImage::ImageRgba8),
        Format::R8G8B8 => {
            image::RgbImage::from_raw(width, height, pixels).map(image::DynamicImage::ImageRgb8)
        }
        Format::R8G8 => image::GrayAlphaImage::from_raw(width, height, pixels)
            .map(image::DynamicImage::ImageLumaA8),
        Format::R8 => {
            image::GrayImage::from_raw(width, height, pixels).map(image::DynamicImage::ImageLuma8)
        }
        _ => None,
    };
    dynamic.map(|image| image.to_rgba8()).ok_or_else(unsupported)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_gltf_images_gain_opaque_alpha() {
        let data = gltf::image::Data {
            pixels: vec![10, 20, 30, 40, 50, 60],
            format: gltf::image::Format::R8G8B8,
            width: 2,
            height: 1,
        };
        let rgba = rgba_from_gltf(&data, "test").expect("rgb is supported");
        assert_eq!(rgba.get_pixel(0, 0).0, [10, 20, 30, 255]);
        assert_eq!(rgba.get_pixel(1, 0).0, [40, 50, 60, 255]);
    }

    #[test]
    fn short_pixel_buffers_are_rejected() {
        let data = gltf::image::Data {
            pixels: vec![1, 2, 3],
            format: gltf::image::Format::R8G8B8A8,
            width: 2,
            height: 2,
        };
        assert!(matches!(
            rgba_from_gltf(&data, "broken.glb"),
            Err(LoadError::UnsupportedImage { .. })
        ));
    }

    #[test]
    fn garbage_does_not_decode() {
        assert!(decode_image(b"definitely not an image").is_err());
    }
}
