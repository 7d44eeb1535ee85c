//! Mount lifecycle of one gallery widget.
//!
//! The facade owns the scene, the input controller, the settle timer and the
//! asset loader for a single container. Platform shells forward their events
//! to it and call [`GalleryFacade::tick`] once per animation frame; every
//! entry point checks the lifecycle first so nothing runs after teardown.

use std::sync::Arc;

use fontdue::Font;
use log::{debug, info, warn};
use thiserror::Error;

use crate::assets::{AssetKind, AssetLoader, AssetPayload, LoadedAsset};
use crate::config::{parse_color, FontSpec, GalleryOptions};
use crate::device::DeviceProfile;
use crate::text::render_caption;

use super::frame::{Frame, TextureKey, TextureUpload};
use super::input::{InputController, SettleReason, SettleRequest};
use super::scene::GalleryScene;

const FALLBACK_TEXT_COLOR: [u8; 4] = [255, 255, 255, 255];

#[derive(Debug, Error)]
pub enum MountError {
    #[error("unable to attach drawing surface: {0}")]
    Surface(String),
}

/// Host element the gallery draws into.
pub trait Container {
    /// Current size in CSS/logical pixels.
    fn size(&self) -> (u32, u32);

    fn user_agent(&self) -> Option<String> {
        None
    }

    fn attach_surface(&self) -> Result<(), MountError> {
        Ok(())
    }

    fn detach_surface(&self) {}
}

impl<T> Container for Arc<T>
where
    T: Container + ?Sized,
{
    fn size(&self) -> (u32, u32) {
        (**self).size()
    }

    fn user_agent(&self) -> Option<String> {
        (**self).user_agent()
    }

    fn attach_surface(&self) -> Result<(), MountError> {
        (**self).attach_surface()
    }

    fn detach_surface(&self) {
        (**self).detach_surface()
    }
}

/// Container that always reports the same size.
#[derive(Debug, Clone, Default)]
pub struct StaticContainer {
    pub width: u32,
    pub height: u32,
    pub user_agent: Option<String>,
}

impl StaticContainer {
    pub const fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            user_agent: None,
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}

impl Container for StaticContainer {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn user_agent(&self) -> Option<String> {
        self.user_agent.clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Unmounted,
    Mounting,
    Running,
    Unmounting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerKind {
    Resize,
    Wheel,
    Pointer,
    Touch,
}

const ALL_LISTENERS: [ListenerKind; 4] = [
    ListenerKind::Resize,
    ListenerKind::Wheel,
    ListenerKind::Pointer,
    ListenerKind::Touch,
];

#[derive(Debug, Clone, Copy, PartialEq)]
struct PendingSettle {
    reason: SettleReason,
    due_ms: f64,
}

pub struct GalleryFacade {
    container: Arc<dyn Container>,
    options: GalleryOptions,
    state: Lifecycle,
    generation: u64,
    scene: Option<GalleryScene>,
    input: Option<InputController>,
    listeners: Vec<ListenerKind>,
    surface_attached: bool,
    pending_settle: Option<PendingSettle>,
    loader: AssetLoader,
    font: Option<Arc<Font>>,
    font_spec: Option<FontSpec>,
    text_color: [u8; 4],
    uploads: Vec<TextureUpload>,
}

impl GalleryFacade {
    /// Builds a facade for `container` and mounts it right away.
    pub fn create(
        container: Arc<dyn Container>,
        options: GalleryOptions,
    ) -> Result<Self, MountError> {
        let mut facade = Self {
            container,
            options,
            state: Lifecycle::Unmounted,
            generation: 0,
            scene: None,
            input: None,
            listeners: Vec::new(),
            surface_attached: false,
            pending_settle: None,
            loader: AssetLoader::new(),
            font: None,
            font_spec: None,
            text_color: FALLBACK_TEXT_COLOR,
            uploads: Vec::new(),
        };
        facade.mount()?;
        Ok(facade)
    }

    /// Builds the scene for the current options and starts producing frames.
    ///
    /// Does nothing when already mounted or when there are no items. A failed
    /// mount is rolled back completely before the error is returned.
    pub fn mount(&mut self) -> Result<(), MountError> {
        if self.state != Lifecycle::Unmounted {
            return Ok(());
        }
        if self.options.items.is_empty() {
            warn!("gallery has no items; not mounting");
            return Ok(());
        }
        self.state = Lifecycle::Mounting;
        self.generation += 1;

        let size = self.container.size();
        let user_agent = self.container.user_agent();
        let profile = DeviceProfile::detect(size.0, user_agent.as_deref());
        info!(
            "mounting gallery #{} with {} items at {}x{} ({})",
            self.generation,
            self.options.items.len(),
            size.0,
            size.1,
            profile.class.name()
        );

        let config = &self.options.config;
        self.text_color = parse_color(&config.text_color).unwrap_or_else(|err| {
            warn!("{err}; captions fall back to white");
            FALLBACK_TEXT_COLOR
        });
        self.font_spec = match config.font.parse::<FontSpec>() {
            Ok(spec) => Some(spec),
            Err(err) => {
                warn!("{err}; captions are skipped");
                None
            }
        };

        let scene = GalleryScene::initialize(size, &self.options.items, config, profile);
        self.input = Some(InputController::new(profile));
        self.listeners = ALL_LISTENERS.to_vec();

        if let Err(err) = self.container.attach_surface() {
            self.scene = Some(scene);
            self.unmount();
            return Err(err);
        }
        self.surface_attached = true;

        for media in scene.medias() {
            media.load(&mut self.loader, self.generation);
        }
        match (&config.font_file, &self.font_spec) {
            (Some(file), Some(_)) => {
                self.loader.request(self.generation, AssetKind::Font, file);
            }
            (None, _) => warn!("no fontFile configured; captions are skipped"),
            _ => {}
        }

        self.scene = Some(scene);
        self.state = Lifecycle::Running;
        Ok(())
    }

    /// Stops frame production, cancels the settle timer, removes listeners
    /// and detaches the surface. Safe to call repeatedly or after a partial
    /// mount.
    pub fn unmount(&mut self) {
        if self.state == Lifecycle::Unmounted {
            return;
        }
        self.state = Lifecycle::Unmounting;
        self.pending_settle = None;
        self.listeners.clear();
        if self.surface_attached {
            self.container.detach_surface();
            self.surface_attached = false;
        }
        self.scene = None;
        self.input = None;
        self.loader.reset();
        self.font = None;
        self.uploads.clear();
        self.state = Lifecycle::Unmounted;
        info!("unmounted gallery #{}", self.generation);
    }

    pub fn destroy(mut self) {
        self.unmount();
    }

    /// Replaces the options, remounting when the rendered gallery would
    /// change.
    pub fn set_options(&mut self, options: GalleryOptions) -> Result<(), MountError> {
        if !self.options.requires_remount(&options) {
            self.options = options;
            return Ok(());
        }
        info!("gallery options changed; remounting");
        self.unmount();
        self.options = options;
        self.mount()
    }

    pub fn options(&self) -> &GalleryOptions {
        &self.options
    }

    pub fn state(&self) -> Lifecycle {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == Lifecycle::Running
    }

    pub fn is_listening(&self, kind: ListenerKind) -> bool {
        self.listeners.contains(&kind)
    }

    pub fn has_listeners(&self) -> bool {
        !self.listeners.is_empty()
    }

    /// Incremented on every mount; renderer resources keyed to an older
    /// generation are stale.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn scene(&self) -> Option<&GalleryScene> {
        self.scene.as_ref()
    }

    pub fn has_pending_timer(&self) -> bool {
        self.pending_settle.is_some()
    }

    fn accepts(&self, kind: ListenerKind) -> bool {
        self.is_running() && self.is_listening(kind)
    }

    pub fn on_resize(&mut self) {
        if !self.accepts(ListenerKind::Resize) {
            return;
        }
        let size = self.container.size();
        if let Some(scene) = self.scene.as_mut() {
            scene.resize(size);
        }
    }

    pub fn on_pointer_down(&mut self, x: f32, now_ms: f64) {
        if !self.accepts(ListenerKind::Pointer) {
            return;
        }
        if let (Some(scene), Some(input)) = (self.scene.as_mut(), self.input.as_mut()) {
            input.pointer_down(x, now_ms, scene.scroll_mut());
        }
    }

    pub fn on_pointer_move(&mut self, x: f32, now_ms: f64) {
        if !self.accepts(ListenerKind::Pointer) {
            return;
        }
        if let (Some(scene), Some(input)) = (self.scene.as_mut(), self.input.as_mut()) {
            input.pointer_move(x, now_ms, scene.scroll_mut());
        }
    }

    pub fn on_pointer_up(&mut self, now_ms: f64) {
        if !self.accepts(ListenerKind::Pointer) {
            return;
        }
        let request = match (self.scene.as_mut(), self.input.as_mut()) {
            (Some(scene), Some(input)) => input.pointer_up(scene.scroll_mut()),
            _ => None,
        };
        if let Some(request) = request {
            self.schedule_settle(request, now_ms);
        }
    }

    pub fn on_wheel(&mut self, delta_y: f32, now_ms: f64) {
        if !self.accepts(ListenerKind::Wheel) {
            return;
        }
        let request = match (self.scene.as_mut(), self.input.as_mut()) {
            (Some(scene), Some(input)) => input.wheel(delta_y, scene.scroll_mut()),
            _ => return,
        };
        self.schedule_settle(request, now_ms);
    }

    fn schedule_settle(&mut self, request: SettleRequest, now_ms: f64) {
        self.pending_settle = Some(PendingSettle {
            reason: request.reason,
            due_ms: now_ms + request.delay_ms,
        });
    }

    /// Runs one frame: fires a due settle, applies finished asset loads and
    /// advances the scene. Returns `None` unless the gallery is running.
    pub fn tick(&mut self, now_ms: f64) -> Option<Frame> {
        if !self.is_running() {
            return None;
        }
        self.fire_settle(now_ms);
        self.apply_assets();
        let scene = self.scene.as_mut()?;
        scene.update();
        Some(scene.frame())
    }

    /// Texture data produced since the last call, for the renderer.
    pub fn take_uploads(&mut self) -> Vec<TextureUpload> {
        std::mem::take(&mut self.uploads)
    }

    fn fire_settle(&mut self, now_ms: f64) {
        let Some(pending) = self.pending_settle else {
            return;
        };
        if pending.due_ms > now_ms {
            return;
        }
        self.pending_settle = None;
        let Some(scene) = self.scene.as_mut() else {
            return;
        };
        if let Some(unit) = scene.snap_unit() {
            InputController::settle(scene.scroll_mut(), unit);
            debug!(
                "settled after {:?} to {:.3}",
                pending.reason,
                scene.scroll().target()
            );
        }
    }

    fn apply_assets(&mut self) {
        for asset in self.loader.drain() {
            if asset.generation != self.generation {
                debug!(
                    "dropping {} from stale mount #{}",
                    asset.source, asset.generation
                );
                continue;
            }
            self.apply_asset(asset);
        }
    }

    fn apply_asset(&mut self, asset: LoadedAsset) {
        let Some(scene) = self.scene.as_mut() else {
            return;
        };
        match asset.result {
            Ok(AssetPayload::Image(image)) => {
                for media in scene.medias_mut() {
                    if media.image() == asset.source {
                        media.image_loaded(image.width, image.height);
                    }
                }
                self.uploads.push(TextureUpload {
                    key: TextureKey::Image(asset.source),
                    width: image.width,
                    height: image.height,
                    rgba: image.rgba,
                });
            }
            Ok(AssetPayload::Font(font)) => {
                self.font = Some(font);
                self.rasterize_captions();
            }
            Err(err) => match asset.kind {
                AssetKind::Image => {
                    warn!("{err}; plane stays blank");
                    for media in scene.medias_mut() {
                        if media.image() == asset.source {
                            media.image_failed();
                        }
                    }
                }
                AssetKind::Font => warn!("{err}; captions are skipped"),
            },
        }
    }

    fn rasterize_captions(&mut self) {
        let (Some(font), Some(spec), Some(scene)) =
            (self.font.as_ref(), self.font_spec.as_ref(), self.scene.as_mut())
        else {
            return;
        };
        let scale = scene.profile().title.font_scale;
        for (index, item) in self.options.items.iter().enumerate() {
            let caption = render_caption(font, &item.text, spec, scale, self.text_color);
            for media in scene.medias_mut() {
                if media.source_index() == index {
                    media.set_caption(caption.width, caption.height);
                }
            }
            self.uploads.push(TextureUpload {
                key: TextureKey::Caption(index),
                width: caption.width,
                height: caption.height,
                rgba: caption.rgba,
            });
        }
    }
}

impl Drop for GalleryFacade {
    fn drop(&mut self) {
        self.unmount();
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use std::time::{Duration, Instant};

    use parking_lot::Mutex;

    use super::*;
    use crate::config::{GalleryConfig, GalleryItem};

    const MOBILE_UA: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X)";

    fn options(count: usize) -> GalleryOptions {
        let items = (0..count)
            .map(|i| GalleryItem::new(format!("card {i}"), format!("missing-{i}.png")))
            .collect();
        GalleryOptions::new(items, GalleryConfig::default())
    }

    fn mounted(count: usize) -> GalleryFacade {
        GalleryFacade::create(Arc::new(StaticContainer::new(1280, 720)), options(count)).unwrap()
    }

    #[derive(Default)]
    struct RecordingContainer {
        fail_attach: bool,
        events: Mutex<Vec<&'static str>>,
    }

    impl Container for RecordingContainer {
        fn size(&self) -> (u32, u32) {
            (1024, 768)
        }

        fn attach_surface(&self) -> Result<(), MountError> {
            self.events.lock().push("attach");
            if self.fail_attach {
                Err(MountError::Surface("no context".into()))
            } else {
                Ok(())
            }
        }

        fn detach_surface(&self) {
            self.events.lock().push("detach");
        }
    }

    #[test]
    fn mount_enters_running_with_all_listeners() {
        let facade = mounted(2);
        assert_eq!(facade.state(), Lifecycle::Running);
        assert_eq!(facade.generation(), 1);
        for kind in ALL_LISTENERS {
            assert!(facade.is_listening(kind));
        }
        assert_eq!(facade.scene().unwrap().medias().len(), 4);
    }

    #[test]
    fn empty_items_do_not_mount() {
        let mut facade = mounted(0);
        assert_eq!(facade.state(), Lifecycle::Unmounted);
        assert!(!facade.has_listeners());
        assert!(facade.tick(0.0).is_none());
    }

    #[test]
    fn unmount_leaves_nothing_behind() {
        let container = Arc::new(RecordingContainer::default());
        let mut facade = GalleryFacade::create(container.clone(), options(2)).unwrap();
        facade.on_wheel(120.0, 0.0);
        assert!(facade.has_pending_timer());

        facade.unmount();
        facade.unmount();
        assert_eq!(facade.state(), Lifecycle::Unmounted);
        assert!(!facade.has_listeners());
        assert!(!facade.has_pending_timer());
        assert!(facade.scene().is_none());
        assert_eq!(*container.events.lock(), vec!["attach", "detach"]);

        facade.on_pointer_down(10.0, 1.0);
        facade.on_wheel(50.0, 2.0);
        facade.on_resize();
        assert!(facade.tick(500.0).is_none());
        assert!(!facade.has_pending_timer());
        assert!(facade.take_uploads().is_empty());
    }

    #[test]
    fn failed_surface_attach_rolls_back() {
        let container = Arc::new(RecordingContainer {
            fail_attach: true,
            ..RecordingContainer::default()
        });
        let result = GalleryFacade::create(container.clone(), options(2));
        assert!(matches!(result, Err(MountError::Surface(_))));
        assert_eq!(*container.events.lock(), vec!["attach"]);
    }

    #[test]
    fn wheel_settle_fires_from_the_latest_target() {
        let mut facade = mounted(3);
        facade.on_wheel(600.0, 0.0);
        facade.on_wheel(600.0, 150.0);
        facade.tick(200.0);
        assert!(facade.has_pending_timer());

        let unit = facade.scene().unwrap().snap_unit().unwrap();
        let before = facade.scene().unwrap().scroll().target();
        facade.tick(350.0);
        assert!(!facade.has_pending_timer());
        let target = facade.scene().unwrap().scroll().target();
        assert!((target - (before / unit).round() * unit).abs() < 1e-4);
    }

    #[test]
    fn drag_release_schedules_a_settle() {
        let mut facade = mounted(2);
        facade.on_pointer_down(600.0, 0.0);
        facade.on_pointer_move(300.0, 200.0);
        assert!(facade.scene().unwrap().scroll().target() > 0.0);
        assert!(!facade.has_pending_timer());
        facade.on_pointer_up(200.0);
        assert!(facade.has_pending_timer());
        facade.tick(200.0 + DeviceProfile::DESKTOP.drag_settle_delay_ms);
        assert!(!facade.has_pending_timer());
    }

    #[test]
    fn remounts_only_when_the_gallery_changes() {
        let mut facade = mounted(2);
        let same = facade.options().clone();
        facade.set_options(same).unwrap();
        assert_eq!(facade.generation(), 1);

        let mut changed = facade.options().clone();
        changed.config.bend = 3.0;
        facade.set_options(changed).unwrap();
        assert_eq!(facade.generation(), 2);
        assert_eq!(facade.state(), Lifecycle::Running);

        facade.set_options(options(2)).unwrap();
        assert_eq!(facade.generation(), 3);
    }

    #[test]
    fn device_class_is_detected_at_mount() {
        let container = StaticContainer::new(1280, 720).with_user_agent(MOBILE_UA);
        let facade = GalleryFacade::create(Arc::new(container), options(1)).unwrap();
        assert!(facade.scene().unwrap().profile().is_touch());
    }

    #[test]
    fn loaded_images_are_queued_for_upload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.png");
        image::RgbaImage::from_pixel(4, 2, image::Rgba([1, 2, 3, 255]))
            .save(&path)
            .unwrap();
        let source = path.to_string_lossy().into_owned();
        let items = vec![GalleryItem::new("A", source.clone())];
        let mut facade = GalleryFacade::create(
            Arc::new(StaticContainer::new(800, 600)),
            GalleryOptions::new(items, GalleryConfig::default()),
        )
        .unwrap();

        let deadline = Instant::now() + Duration::from_secs(10);
        let mut uploads = Vec::new();
        while uploads.is_empty() && Instant::now() < deadline {
            facade.tick(0.0);
            uploads.extend(facade.take_uploads());
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].key, TextureKey::Image(source));
        let medias = facade.scene().unwrap().medias();
        assert!(medias
            .iter()
            .all(|m| m.image_sizes() == glam::Vec2::new(4.0, 2.0)));
    }
}
