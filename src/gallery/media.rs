use glam::{Mat4, Vec2, Vec3};

use crate::assets::{AssetKind, AssetLoader};
use crate::config::GalleryItem;
use crate::device::{CardDimensions, TitleTuning};

use super::geometry::{arc_placement, ViewportGeometry};
use super::scroll::{Direction, ScrollState};

/// Gap between the bottom of an image plane and its caption.
const TITLE_GAP: f32 = 0.05;
/// Wave shader clock increment per frame.
const TIME_STEP: f32 = 0.04;

/// Lifecycle of the bitmap backing an image plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureState {
    Pending,
    Loaded { width: u32, height: u32 },
    Failed,
}

/// Caption plane placement relative to its image plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TitleLayout {
    pub scale: Vec2,
    pub offset_y: f32,
}

/// One image card plus caption positioned along the infinite track.
#[derive(Debug, Clone)]
pub struct MediaItem {
    index: usize,
    length: usize,
    source_index: usize,
    text: String,
    image: String,
    bend: f32,
    border_radius: f32,
    plane_scale: Vec2,
    padding: f32,
    width: f32,
    width_total: f32,
    x: f32,
    extra: f32,
    position: Vec3,
    rotation_z: f32,
    is_before: bool,
    is_after: bool,
    time: f32,
    speed: f32,
    viewport_width: f32,
    title_ratio: f32,
    texture: TextureState,
    caption_size: Option<(u32, u32)>,
    title: Option<TitleLayout>,
}

impl MediaItem {
    /// Creates the plane for slot `index` of a doubled sequence of `length`
    /// planes built from `source_count` caller items.
    pub fn new(
        index: usize,
        length: usize,
        source_count: usize,
        item: &GalleryItem,
        bend: f32,
        border_radius: f32,
    ) -> Self {
        Self {
            index,
            length,
            source_index: index % source_count.max(1),
            text: item.text.clone(),
            image: item.image.clone(),
            bend,
            border_radius,
            plane_scale: Vec2::ONE,
            padding: 0.0,
            width: 0.0,
            width_total: 0.0,
            x: 0.0,
            extra: 0.0,
            position: Vec3::ZERO,
            rotation_z: 0.0,
            is_before: false,
            is_after: false,
            time: 0.0,
            speed: 0.0,
            viewport_width: 0.0,
            title_ratio: 0.0,
            texture: TextureState::Pending,
            caption_size: None,
            title: None,
        }
    }

    /// Sizes the plane for the current viewport and card preset and derives
    /// the base offset of this slot on the track.
    ///
    /// `spacing`, when present, replaces the preset's padding.
    pub fn compute_layout(
        &mut self,
        geometry: &ViewportGeometry,
        card: CardDimensions,
        spacing: Option<f32>,
        title: TitleTuning,
    ) {
        let scale = geometry.screen_height / card.reference_height;
        self.plane_scale = Vec2::new(
            geometry.viewport_width * (card.width * scale) / geometry.screen_width,
            geometry.viewport_height * (card.height * scale) / geometry.screen_height,
        );
        self.padding = spacing.unwrap_or(card.padding);
        self.width = self.plane_scale.x + self.padding;
        self.width_total = self.width * self.length as f32;
        self.x = self.width * self.index as f32;
        self.viewport_width = geometry.viewport_width;
        self.title_ratio = title.height_ratio;
        self.layout_title();
    }

    /// Repositions the plane for the given scroll state and wraps it to the
    /// far end of the track once it leaves the viewport on the trailing side.
    pub fn update(&mut self, scroll: &ScrollState, direction: Direction) {
        let x = self.x - scroll.current() - self.extra;
        let placement = arc_placement(x, self.viewport_width / 2.0, self.bend);
        self.position = Vec3::new(x, placement.y, 0.0);
        self.rotation_z = placement.rotation_z;

        self.speed = scroll.speed();
        self.time += TIME_STEP;

        let plane_offset = self.plane_scale.x / 2.0;
        let viewport_offset = self.viewport_width / 2.0;
        self.is_before = x + plane_offset < -viewport_offset;
        self.is_after = x - plane_offset > viewport_offset;
        match direction {
            Direction::Right if self.is_before => {
                self.extra -= self.width_total;
                self.is_before = false;
                self.is_after = false;
            }
            Direction::Left if self.is_after => {
                self.extra += self.width_total;
                self.is_before = false;
                self.is_after = false;
            }
            _ => {}
        }
    }

    /// Requests this plane's bitmap for the mount `generation`.
    ///
    /// Planes sharing a source share one request; the result is applied by
    /// whoever drains the loader.
    pub fn load(&self, loader: &mut AssetLoader, generation: u64) -> bool {
        loader.request(generation, AssetKind::Image, &self.image)
    }

    /// Records the native size of a decoded bitmap.
    pub fn image_loaded(&mut self, width: u32, height: u32) {
        self.texture = TextureState::Loaded { width, height };
    }

    pub fn image_failed(&mut self) {
        self.texture = TextureState::Failed;
    }

    /// Records the rasterised caption size and lays out the title plane.
    pub fn set_caption(&mut self, width: u32, height: u32) {
        self.caption_size = Some((width, height));
        self.layout_title();
    }

    fn layout_title(&mut self) {
        let Some((width, height)) = self.caption_size else {
            self.title = None;
            return;
        };
        if height == 0 {
            self.title = None;
            return;
        }
        let aspect = width as f32 / height as f32;
        let title_height = self.plane_scale.y * self.title_ratio;
        self.title = Some(TitleLayout {
            scale: Vec2::new(title_height * aspect, title_height),
            offset_y: -self.plane_scale.y * 0.5 - title_height * 0.5 - TITLE_GAP,
        });
    }

    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_translation(self.position)
            * Mat4::from_rotation_z(self.rotation_z)
            * Mat4::from_scale(self.plane_scale.extend(1.0))
    }

    pub fn title_model_matrix(&self) -> Option<Mat4> {
        let title = self.title?;
        Some(
            Mat4::from_translation(self.position)
                * Mat4::from_rotation_z(self.rotation_z)
                * Mat4::from_translation(Vec3::new(0.0, title.offset_y, 0.0))
                * Mat4::from_scale(title.scale.extend(1.0)),
        )
    }

    /// Image size handed to the cover-fit shader. Until a bitmap arrives the
    /// plane's own size is used so the ratio collapses to 1.
    pub fn image_sizes(&self) -> Vec2 {
        match self.texture {
            TextureState::Loaded { width, height } if width > 0 && height > 0 => {
                Vec2::new(width as f32, height as f32)
            }
            _ => self.plane_scale,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// Index of the caller item this plane shows.
    pub fn source_index(&self) -> usize {
        self.source_index
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn border_radius(&self) -> f32 {
        self.border_radius
    }

    pub fn plane_scale(&self) -> Vec2 {
        self.plane_scale
    }

    pub fn padding(&self) -> f32 {
        self.padding
    }

    /// Plane width plus padding: the track distance between neighbours.
    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn width_total(&self) -> f32 {
        self.width_total
    }

    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn extra(&self) -> f32 {
        self.extra
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn rotation_z(&self) -> f32 {
        self.rotation_z
    }

    pub fn is_before(&self) -> bool {
        self.is_before
    }

    pub fn is_after(&self) -> bool {
        self.is_after
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn texture(&self) -> TextureState {
        self.texture
    }

    pub fn title(&self) -> Option<TitleLayout> {
        self.title
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceProfile;

    fn layout_item(index: usize, length: usize) -> MediaItem {
        let geometry = ViewportGeometry::compute(1500, 1500, 45.0).unwrap();
        let mut item = MediaItem::new(
            index,
            length,
            length / 2,
            &GalleryItem::new("A", "a.png"),
            -2.0,
            0.05,
        );
        item.compute_layout(
            &geometry,
            DeviceProfile::DESKTOP.cards.normal,
            None,
            DeviceProfile::DESKTOP.title,
        );
        item
    }

    #[test]
    fn layout_scales_plane_from_preset() {
        let item = layout_item(3, 4);
        let geometry = ViewportGeometry::compute(1500, 1500, 45.0).unwrap();
        assert!((item.plane_scale().y - geometry.viewport_height * 0.6).abs() < 1e-4);
        assert!((item.plane_scale().x - geometry.viewport_width * 700.0 / 1500.0).abs() < 1e-4);
        assert_eq!(item.padding(), 2.0);
        assert_eq!(item.width(), item.plane_scale().x + 2.0);
        assert_eq!(item.width_total(), item.width() * 4.0);
        assert_eq!(item.x(), item.width() * 3.0);
        assert_eq!(item.source_index(), 1);
    }

    #[test]
    fn spacing_overrides_preset_padding() {
        let geometry = ViewportGeometry::compute(1280, 720, 45.0).unwrap();
        let mut item = MediaItem::new(0, 2, 1, &GalleryItem::new("A", "a.png"), 0.0, 0.0);
        item.compute_layout(
            &geometry,
            DeviceProfile::DESKTOP.cards.small,
            Some(0.25),
            DeviceProfile::DESKTOP.title,
        );
        assert_eq!(item.padding(), 0.25);
    }

    #[test]
    fn wraps_to_the_far_end_when_leaving_on_the_left() {
        let mut item = layout_item(0, 4);
        let mut scroll = ScrollState::new(1.0);
        scroll.set_target(item.viewport_width);
        scroll.advance();
        item.update(&scroll, Direction::Right);
        assert_eq!(item.extra(), -item.width_total());
        assert!(!item.is_before());
    }

    #[test]
    fn stays_put_when_moving_away_from_the_trailing_edge() {
        let mut item = layout_item(0, 4);
        let mut scroll = ScrollState::new(1.0);
        scroll.set_target(item.viewport_width);
        scroll.advance();
        item.update(&scroll, Direction::Left);
        assert_eq!(item.extra(), 0.0);
        assert!(item.is_before());
    }

    #[test]
    fn image_size_falls_back_to_plane_until_loaded() {
        let mut item = layout_item(0, 2);
        assert_eq!(item.image_sizes(), item.plane_scale());
        item.image_failed();
        assert_eq!(item.image_sizes(), item.plane_scale());
        item.image_loaded(640, 480);
        assert_eq!(item.image_sizes(), Vec2::new(640.0, 480.0));
    }

    #[test]
    fn caption_sits_below_the_plane() {
        let mut item = layout_item(0, 2);
        assert!(item.title_model_matrix().is_none());
        item.set_caption(200, 50);
        let title = item.title().unwrap();
        let height = item.plane_scale().y * 0.15;
        assert!((title.scale.y - height).abs() < 1e-5);
        assert!((title.scale.x - height * 4.0).abs() < 1e-4);
        assert!(title.offset_y < -item.plane_scale().y * 0.5);
        assert!(item.title_model_matrix().is_some());
    }
}
