#![cfg(target_arch = "wasm32")]

use std::cell::Cell;
use std::rc::Rc;
use std::sync::{Arc, Once};

use log::{error, info};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use winit::dpi::LogicalSize;
use winit::event_loop::{ControlFlow, EventLoop};
use winit::platform::web::{EventLoopExtWebSys, WindowBuilderExtWebSys};
use winit::window::WindowBuilder;

use crate::app::{GalleryApp, WindowContainer};
use crate::device::DeviceProfile;
use crate::gallery::GalleryFacade;
use crate::{GalleryOptions, Renderer};

static LOGGER: Once = Once::new();

fn js_error(context: &str, err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&format!("{context}: {err}"))
}

/// Gallery mounted into a page element.
#[wasm_bindgen]
pub struct GalleryHandle {
    running: Rc<Cell<bool>>,
    canvas: web_sys::HtmlCanvasElement,
}

#[wasm_bindgen]
impl GalleryHandle {
    /// Creates a canvas inside the element with id `container_id` and starts
    /// the gallery described by `options` (same shape as a manifest).
    pub async fn create(container_id: String, options: JsValue) -> Result<GalleryHandle, JsValue> {
        LOGGER.call_once(|| {
            console_error_panic_hook::set_once();
            wasm_logger::init(wasm_logger::Config::default());
        });

        let json: String = js_sys::JSON::stringify(&options)?.into();
        let options = GalleryOptions::from_json(&json)
            .map_err(|err| js_error("invalid gallery options", err))?;

        let window = web_sys::window().ok_or_else(|| JsValue::from_str("missing window"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("missing document"))?;
        let host = document
            .get_element_by_id(&container_id)
            .ok_or_else(|| JsValue::from_str("container element not found"))?;
        let canvas: web_sys::HtmlCanvasElement = document
            .create_element("canvas")?
            .dyn_into()
            .map_err(|_| JsValue::from_str("failed to create canvas"))?;
        let style = canvas.style();
        style.set_property("width", "100%")?;
        style.set_property("height", "100%")?;
        style.set_property("touch-action", "none")?;
        host.append_child(&canvas)?;

        let width = host.client_width().max(1) as u32;
        let height = host.client_height().max(1) as u32;
        let user_agent = window.navigator().user_agent().ok();

        let event_loop =
            EventLoop::new().map_err(|err| js_error("failed to create event loop", err))?;
        let winit_window = Arc::new(
            WindowBuilder::new()
                .with_canvas(Some(canvas.clone()))
                .with_prevent_default(true)
                .with_inner_size(LogicalSize::new(width as f64, height as f64))
                .build(&event_loop)
                .map_err(|err| js_error("window error", err))?,
        );

        let container = Arc::new(WindowContainer::new(width, height).with_user_agent(user_agent));
        let facade = GalleryFacade::create(container.clone(), options)
            .map_err(|err| js_error("failed to mount gallery", err))?;
        let segments = facade
            .scene()
            .map(|scene| scene.profile().segments)
            .unwrap_or(DeviceProfile::DESKTOP.segments);
        let renderer = Renderer::new(Arc::clone(&winit_window), segments)
            .await
            .map_err(|err| js_error("renderer error", err))?;
        info!("gallery mounted in #{container_id} at {width}x{height}");

        let running = Rc::new(Cell::new(true));
        let loop_running = Rc::clone(&running);
        let mut app = GalleryApp::new(renderer, facade, container);
        event_loop.spawn(move |event, target| {
            if !loop_running.get() {
                app.shutdown();
                target.exit();
                return;
            }
            target.set_control_flow(ControlFlow::Poll);
            if let Err(err) = app.process_event(&event, target) {
                error!("gallery stopped: {err:?}");
                loop_running.set(false);
                app.shutdown();
                target.exit();
            }
        });

        Ok(GalleryHandle { running, canvas })
    }

    /// Stops the frame loop and removes the canvas from the page.
    pub fn destroy(&self) {
        if self.running.replace(false) {
            info!("destroying gallery");
        }
        self.canvas.remove();
    }

    #[wasm_bindgen(getter)]
    pub fn running(&self) -> bool {
        self.running.get()
    }
}
