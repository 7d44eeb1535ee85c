use thiserror::Error;
use wgpu::util::DeviceExt;

use crate::gallery::{PlaneMesh, TextureUpload};

/// Reasons a queued bitmap cannot become a GPU texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub(crate) enum UploadRejection {
    #[error("bitmap has no pixels")]
    Empty,
    #[error("expected {expected} bytes of RGBA data, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("{width}x{height} exceeds the device texture limit of {max}")]
    TooLarge { width: u32, height: u32, max: u32 },
}

/// Checks that `upload` describes a texture the device can create.
pub(crate) fn check_upload(
    upload: &TextureUpload,
    max_dimension: u32,
) -> Result<(), UploadRejection> {
    if upload.width == 0 || upload.height == 0 {
        return Err(UploadRejection::Empty);
    }
    let expected = upload.width as usize * upload.height as usize * 4;
    if upload.rgba.len() != expected {
        return Err(UploadRejection::SizeMismatch {
            expected,
            actual: upload.rgba.len(),
        });
    }
    if upload.width > max_dimension || upload.height > max_dimension {
        return Err(UploadRejection::TooLarge {
            width: upload.width,
            height: upload.height,
            max: max_dimension,
        });
    }
    Ok(())
}

pub(crate) struct GpuTexture {
    _texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl GpuTexture {
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

    pub fn from_rgba(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        width: u32,
        height: u32,
        rgba: &[u8],
        label: &str,
    ) -> Self {
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            rgba,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            size,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }

    /// Opaque black 1x1 texture bound to planes whose bitmap is missing.
    pub fn blank(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        Self::from_rgba(device, queue, 1, 1, &[0, 0, 0, 255], "blank-texture")
    }

    /// Uploads `upload` unless [`check_upload`] rejects it for this device.
    pub fn from_upload(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        upload: &TextureUpload,
    ) -> Result<Self, UploadRejection> {
        check_upload(upload, device.limits().max_texture_dimension_2d)?;
        Ok(Self::from_rgba(
            device,
            queue,
            upload.width,
            upload.height,
            &upload.rgba,
            "plane-texture",
        ))
    }
}

pub(crate) struct DepthBuffer {
    _texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl DepthBuffer {
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;

    pub fn create(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth-texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }
}

pub(crate) struct MeshBuffers {
    pub vertex: wgpu::Buffer,
    pub index: wgpu::Buffer,
    pub index_count: u32,
}

impl MeshBuffers {
    pub fn from_mesh(device: &wgpu::Device, mesh: &PlaneMesh, label: &str) -> Self {
        let vertex = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}-vertices")),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}-indices")),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex,
            index,
            index_count: mesh.indices.len() as u32,
        }
    }
}
