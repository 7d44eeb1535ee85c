use glam::{Mat4, Vec2};

/// Identifies a GPU texture owned by the renderer for the current mount.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TextureKey {
    /// Decoded bitmap, shared by every plane showing the same source.
    Image(String),
    /// Rasterised caption of the caller item with this index.
    Caption(usize),
}

/// Pixel data waiting to be uploaded by the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureUpload {
    pub key: TextureKey,
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TitleDraw {
    pub model: Mat4,
    pub texture: TextureKey,
}

/// Everything the renderer needs to draw one image plane.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaneDraw {
    pub model: Mat4,
    pub plane_size: Vec2,
    pub image_size: Vec2,
    pub border_radius: f32,
    pub time: f32,
    pub speed: f32,
    pub texture: TextureKey,
    pub title: Option<TitleDraw>,
}

/// Snapshot of the scene after one update.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub view_proj: Mat4,
    pub planes: Vec<PlaneDraw>,
}
