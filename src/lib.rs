//! Circular image gallery for the studio website.
//!
//! The gallery lays out caller-supplied images on an endless horizontal
//! track bent into an arc, scrolled by drag, touch and wheel input with
//! easing, inertia and snapping. Scene, input and lifecycle logic are
//! platform independent and testable headless; the [`render`] and [`app`]
//! modules draw it with wgpu inside a winit window, natively or on a web
//! canvas. The [`site`] module carries the catalog filter and contact form
//! contracts of the same site.

pub mod app;
pub mod assets;
pub mod config;
pub mod device;
pub mod gallery;
pub mod render;
pub mod site;
pub mod text;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use assets::{AssetError, AssetKind, AssetLoader};
pub use config::{CardSize, ConfigError, FontSpec, GalleryConfig, GalleryItem, GalleryOptions};
pub use device::{DeviceClass, DeviceProfile};
pub use gallery::{
    Container, Direction, Frame, GalleryFacade, GalleryScene, InputController, Lifecycle,
    MediaItem, ScrollState, StaticContainer,
};
pub use render::Renderer;
#[cfg(target_arch = "wasm32")]
pub use web::GalleryHandle;
