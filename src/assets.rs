//! Fire-and-forget loading of gallery bitmaps and caption fonts.
//!
//! Requests run off the frame loop (worker threads natively, futures on the
//! web) and push their results into a shared inbox that the owner drains
//! once per frame. Every request carries the mount generation it was issued
//! for so results that outlive a remount can be told apart.

use std::collections::HashSet;
use std::sync::Arc;

use fontdue::{Font, FontSettings};
use log::debug;
use parking_lot::Mutex;
use thiserror::Error;

/// Longest edge kept for decoded bitmaps. WebGL2 only guarantees 2048px
/// textures, and cards never display larger than that.
pub const MAX_IMAGE_DIMENSION: u32 = 2048;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("unable to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("unable to decode image {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: image::ImageError,
    },
    #[error("unable to parse font {path}: {message}")]
    Font { path: String, message: String },
    #[error("remote source {0} cannot be fetched by the native loader")]
    Remote(String),
    #[error("request for {path} failed: {message}")]
    Fetch { path: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Image,
    Font,
}

/// RGBA8 bitmap with its native dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

pub enum AssetPayload {
    Image(DecodedImage),
    Font(Arc<Font>),
}

impl std::fmt::Debug for AssetPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetPayload::Image(image) => f
                .debug_struct("Image")
                .field("width", &image.width)
                .field("height", &image.height)
                .finish(),
            AssetPayload::Font(_) => f.write_str("Font"),
        }
    }
}

/// Outcome of one request.
#[derive(Debug)]
pub struct LoadedAsset {
    pub generation: u64,
    pub kind: AssetKind,
    pub source: String,
    pub result: Result<AssetPayload, AssetError>,
}

type Inbox = Arc<Mutex<Vec<LoadedAsset>>>;

#[derive(Debug, Default)]
pub struct AssetLoader {
    inbox: Inbox,
    requested: HashSet<(u64, AssetKind, String)>,
}

impl AssetLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts loading `source` unless the same request is already in flight
    /// for this generation. Returns whether a new load was started.
    pub fn request(&mut self, generation: u64, kind: AssetKind, source: &str) -> bool {
        if !self
            .requested
            .insert((generation, kind, source.to_string()))
        {
            return false;
        }
        debug!("loading {kind:?} {source} (generation {generation})");
        spawn_load(Arc::clone(&self.inbox), generation, kind, source.to_string());
        true
    }

    /// Takes every result delivered since the previous call.
    pub fn drain(&mut self) -> Vec<LoadedAsset> {
        std::mem::take(&mut *self.inbox.lock())
    }

    /// Forgets outstanding bookkeeping. Loads still running will deliver
    /// into the inbox and must be filtered by generation.
    pub fn reset(&mut self) {
        self.requested.clear();
        self.inbox.lock().clear();
    }
}

fn decode(kind: AssetKind, source: &str, bytes: Vec<u8>) -> Result<AssetPayload, AssetError> {
    match kind {
        AssetKind::Image => {
            let image = image::load_from_memory(&bytes).map_err(|source_err| AssetError::Decode {
                path: source.to_string(),
                source: source_err,
            })?;
            let image = if image.width() > MAX_IMAGE_DIMENSION
                || image.height() > MAX_IMAGE_DIMENSION
            {
                debug!(
                    "downscaling {source} from {}x{}",
                    image.width(),
                    image.height()
                );
                image.thumbnail(MAX_IMAGE_DIMENSION, MAX_IMAGE_DIMENSION)
            } else {
                image
            };
            let rgba = image.to_rgba8();
            Ok(AssetPayload::Image(DecodedImage {
                width: rgba.width(),
                height: rgba.height(),
                rgba: rgba.into_raw(),
            }))
        }
        AssetKind::Font => Font::from_bytes(bytes, FontSettings::default())
            .map(|font| AssetPayload::Font(Arc::new(font)))
            .map_err(|message| AssetError::Font {
                path: source.to_string(),
                message: message.to_string(),
            }),
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn spawn_load(inbox: Inbox, generation: u64, kind: AssetKind, source: String) {
    let worker_inbox = Arc::clone(&inbox);
    let worker_source = source.clone();
    let spawned = std::thread::Builder::new()
        .name("asset-loader".into())
        .spawn(move || {
            let result = read_local(&worker_source)
                .and_then(|bytes| decode(kind, &worker_source, bytes));
            worker_inbox.lock().push(LoadedAsset {
                generation,
                kind,
                source: worker_source,
                result,
            });
        });
    if let Err(err) = spawned {
        inbox.lock().push(LoadedAsset {
            generation,
            kind,
            source: source.clone(),
            result: Err(AssetError::Io { path: source, source: err }),
        });
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn read_local(source: &str) -> Result<Vec<u8>, AssetError> {
    if crate::config::is_remote(source) {
        return Err(AssetError::Remote(source.to_string()));
    }
    std::fs::read(source).map_err(|err| AssetError::Io {
        path: source.to_string(),
        source: err,
    })
}

#[cfg(target_arch = "wasm32")]
fn spawn_load(inbox: Inbox, generation: u64, kind: AssetKind, source: String) {
    wasm_bindgen_futures::spawn_local(async move {
        let result = match fetch_bytes(&source).await {
            Ok(bytes) => decode(kind, &source, bytes),
            Err(message) => Err(AssetError::Fetch {
                path: source.clone(),
                message,
            }),
        };
        inbox.lock().push(LoadedAsset {
            generation,
            kind,
            source,
            result,
        });
    });
}

#[cfg(target_arch = "wasm32")]
async fn fetch_bytes(source: &str) -> Result<Vec<u8>, String> {
    use wasm_bindgen::JsCast;
    use wasm_bindgen_futures::JsFuture;

    let window = web_sys::window().ok_or_else(|| "window not available".to_string())?;
    let response = JsFuture::from(window.fetch_with_str(source))
        .await
        .map_err(|err| format!("{err:?}"))?
        .dyn_into::<web_sys::Response>()
        .map_err(|_| "fetch did not return a Response".to_string())?;
    if !response.ok() {
        return Err(format!("HTTP {}", response.status()));
    }
    let buffer = JsFuture::from(response.array_buffer().map_err(|err| format!("{err:?}"))?)
        .await
        .map_err(|err| format!("{err:?}"))?;
    Ok(js_sys::Uint8Array::new(&buffer).to_vec())
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;

    fn wait_for(loader: &mut AssetLoader, count: usize) -> Vec<LoadedAsset> {
        let deadline = Instant::now() + Duration::from_secs(10);
        let mut results = Vec::new();
        while results.len() < count && Instant::now() < deadline {
            results.extend(loader.drain());
            std::thread::sleep(Duration::from_millis(5));
        }
        results
    }

    #[test]
    fn decodes_local_images() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("card.png");
        image::RgbaImage::from_pixel(3, 2, image::Rgba([10, 20, 30, 255]))
            .save(&path)
            .unwrap();
        let source = path.to_string_lossy().into_owned();

        let mut loader = AssetLoader::new();
        assert!(loader.request(1, AssetKind::Image, &source));
        let results = wait_for(&mut loader, 1);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].generation, 1);
        match &results[0].result {
            Ok(AssetPayload::Image(image)) => {
                assert_eq!((image.width, image.height), (3, 2));
                assert_eq!(&image.rgba[..4], &[10, 20, 30, 255]);
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn oversized_images_are_downscaled_keeping_aspect() {
        let mut png = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(image::RgbaImage::new(4100, 1025))
            .write_to(&mut png, image::ImageOutputFormat::Png)
            .unwrap();
        match decode(AssetKind::Image, "wide.png", png.into_inner()) {
            Ok(AssetPayload::Image(image)) => {
                assert_eq!(image.width, MAX_IMAGE_DIMENSION);
                assert!(image.height <= MAX_IMAGE_DIMENSION);
                let aspect = image.width as f32 / image.height as f32;
                assert!((aspect - 4.0).abs() < 0.05, "aspect {aspect}");
                assert_eq!(image.rgba.len(), (image.width * image.height * 4) as usize);
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn duplicate_requests_load_once_per_generation() {
        let mut loader = AssetLoader::new();
        assert!(loader.request(1, AssetKind::Image, "missing.png"));
        assert!(!loader.request(1, AssetKind::Image, "missing.png"));
        assert!(loader.request(2, AssetKind::Image, "missing.png"));
        let results = wait_for(&mut loader, 2);
        assert_eq!(results.len(), 2);
        assert!(results
            .iter()
            .all(|r| matches!(r.result, Err(AssetError::Io { .. }))));
    }

    #[test]
    fn remote_sources_fail_natively() {
        let mut loader = AssetLoader::new();
        loader.request(1, AssetKind::Image, "https://cdn.example.com/a.png");
        let results = wait_for(&mut loader, 1);
        assert!(matches!(results[0].result, Err(AssetError::Remote(_))));
    }

    #[test]
    fn garbage_fonts_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.ttf");
        std::fs::write(&path, b"not a font").unwrap();
        let mut loader = AssetLoader::new();
        loader.request(1, AssetKind::Font, &path.to_string_lossy());
        let results = wait_for(&mut loader, 1);
        assert!(matches!(results[0].result, Err(AssetError::Font { .. })));
    }
}
