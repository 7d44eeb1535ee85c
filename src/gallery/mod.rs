//! Scroll physics, plane layout and the mount lifecycle of the carousel.

pub mod facade;
pub mod frame;
pub mod geometry;
pub mod input;
pub mod media;
pub mod scene;
pub mod scroll;

pub use facade::{Container, GalleryFacade, Lifecycle, ListenerKind, MountError, StaticContainer};
pub use frame::{Frame, PlaneDraw, TextureKey, TextureUpload, TitleDraw};
pub use geometry::{arc_placement, ArcPlacement, Camera, PlaneMesh, PlaneVertex, ViewportGeometry};
pub use input::{InputController, SettleReason, SettleRequest};
pub use media::{MediaItem, TextureState, TitleLayout};
pub use scene::GalleryScene;
pub use scroll::{Direction, ScrollState};
