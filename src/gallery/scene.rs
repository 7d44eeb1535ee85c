use log::{debug, warn};

use crate::config::{CardSize, GalleryConfig, GalleryItem};
use crate::device::DeviceProfile;

use super::frame::{Frame, PlaneDraw, TextureKey, TitleDraw};
use super::geometry::{Camera, ViewportGeometry};
use super::media::MediaItem;
use super::scroll::{Direction, ScrollState};

/// Camera, scroll state and the doubled list of planes of one gallery.
#[derive(Debug, Clone)]
pub struct GalleryScene {
    profile: DeviceProfile,
    card_size: CardSize,
    spacing: Option<f32>,
    camera: Camera,
    geometry: Option<ViewportGeometry>,
    medias: Vec<MediaItem>,
    scroll: ScrollState,
}

impl GalleryScene {
    /// Builds the scene for a container of `size` pixels.
    ///
    /// Every item appears twice, in the same order, so the track can wrap
    /// without a visible seam. An empty item list yields an empty scene.
    pub fn initialize(
        size: (u32, u32),
        items: &[GalleryItem],
        config: &GalleryConfig,
        profile: DeviceProfile,
    ) -> Self {
        if items.is_empty() {
            warn!("gallery has no items; nothing will be rendered");
        }
        let length = items.len() * 2;
        let medias = items
            .iter()
            .chain(items.iter())
            .enumerate()
            .map(|(index, item)| {
                MediaItem::new(
                    index,
                    length,
                    items.len(),
                    item,
                    config.bend,
                    config.border_radius,
                )
            })
            .collect();

        let mut scene = Self {
            profile,
            card_size: config.card_size,
            spacing: config.spacing,
            camera: Camera::new(profile.fov_degrees),
            geometry: None,
            medias,
            scroll: ScrollState::new(profile.scroll_ease),
        };
        scene.resize(size);
        scene
    }

    /// Recomputes the viewport mapping and relays it to every plane.
    ///
    /// A zero-sized container keeps the previous geometry.
    pub fn resize(&mut self, (width, height): (u32, u32)) {
        let Some(geometry) = ViewportGeometry::compute(width, height, self.profile.fov_degrees)
        else {
            debug!("ignoring resize to {width}x{height}");
            return;
        };
        self.camera.aspect = geometry.aspect();
        let card = self.profile.cards.get(self.card_size);
        for media in &mut self.medias {
            media.compute_layout(&geometry, card, self.spacing, self.profile.title);
        }
        self.geometry = Some(geometry);
    }

    /// Advances the scroll one eased step and repositions every plane.
    pub fn update(&mut self) -> Direction {
        let direction = self.scroll.advance();
        if self.geometry.is_some() {
            for media in &mut self.medias {
                media.update(&self.scroll, direction);
            }
        }
        self.scroll.commit();
        direction
    }

    /// Snapshot of the planes as positioned by the last update.
    pub fn frame(&self) -> Frame {
        let planes = if self.geometry.is_some() {
            self.medias.iter().map(plane_draw).collect()
        } else {
            Vec::new()
        };
        Frame {
            view_proj: self.camera.view_proj(),
            planes,
        }
    }

    /// Width of one track slot, used as the snapping unit.
    ///
    /// Taken from the first plane: all planes share one card preset.
    pub fn snap_unit(&self) -> Option<f32> {
        self.medias
            .first()
            .map(MediaItem::width)
            .filter(|width| *width > 0.0)
    }

    pub fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn geometry(&self) -> Option<&ViewportGeometry> {
        self.geometry.as_ref()
    }

    pub fn medias(&self) -> &[MediaItem] {
        &self.medias
    }

    pub(crate) fn medias_mut(&mut self) -> &mut [MediaItem] {
        &mut self.medias
    }

    pub fn scroll(&self) -> &ScrollState {
        &self.scroll
    }

    pub(crate) fn scroll_mut(&mut self) -> &mut ScrollState {
        &mut self.scroll
    }

    /// Total track length covered by the doubled sequence.
    pub fn track_width(&self) -> f32 {
        self.medias
            .first()
            .map(MediaItem::width_total)
            .unwrap_or(0.0)
    }
}

fn plane_draw(media: &MediaItem) -> PlaneDraw {
    PlaneDraw {
        model: media.model_matrix(),
        plane_size: media.plane_scale(),
        image_size: media.image_sizes(),
        border_radius: media.border_radius(),
        time: media.time(),
        speed: media.speed(),
        texture: TextureKey::Image(media.image().to_string()),
        title: media.title_model_matrix().map(|model| TitleDraw {
            model,
            texture: TextureKey::Caption(media.source_index()),
        }),
    }
}
