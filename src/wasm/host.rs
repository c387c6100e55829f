use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use web_sys::{Document, HtmlElement, ResizeObserver, ResizeObserverEntry, Window};

use super::render::WebGlBackend;
use crate::error::{ContextError, ObserveError, ScheduleError};
use crate::host::{
    BoxObserver, BoxSize, FrameCallback, FrameClock, ResizeCallback, StyleSource, SurfaceHost,
};

/// A DOM element the effect draws into.
pub struct DomHost {
    window: Window,
    document: Document,
    container: HtmlElement,
}

impl DomHost {
    pub fn new(container: HtmlElement) -> Result<Self, JsValue> {
        let window = web_sys::window().ok_or("no window")?;
        let document = window.document().ok_or("no document")?;
        Ok(Self {
            window,
            document,
            container,
        })
    }
}

impl StyleSource for DomHost {
    fn custom_property(&self, name: &str) -> Option<String> {
        let root = self.document.document_element()?;
        let style = self.window.get_computed_style(&root).ok()??;
        style
            .get_property_value(name)
            .ok()
            .filter(|value| !value.trim().is_empty())
    }
}

impl SurfaceHost for DomHost {
    type Backend = WebGlBackend;
    type Clock = AnimationFrames;
    type Observer = ContainerObserver;

    fn create_context(&self) -> Result<WebGlBackend, ContextError> {
        WebGlBackend::create(&self.document, &self.container)
    }

    fn frame_clock(&self) -> AnimationFrames {
        AnimationFrames::new(self.window.clone())
    }

    fn box_observer(&self) -> ContainerObserver {
        ContainerObserver {
            window: self.window.clone(),
            container: self.container.clone(),
        }
    }

    fn set_background(&self, color: Option<&str>) {
        let style = self.container.style();
        let result = match color {
            Some(color) => style.set_property("background-color", color),
            None => style.remove_property("background-color").map(|_| ()),
        };
        if let Err(err) = result {
            log::warn!("could not set container background: {err:?}");
        }
    }
}

/// `requestAnimationFrame` through one persistent closure.
///
/// The closure forwards to whichever callback is parked in `slot`, so no
/// per-frame closure has to be kept alive or forgotten.
pub struct AnimationFrames {
    window: Window,
    slot: Rc<RefCell<Option<FrameCallback>>>,
    trampoline: Closure<dyn FnMut(f64)>,
}

impl AnimationFrames {
    fn new(window: Window) -> Self {
        let slot: Rc<RefCell<Option<FrameCallback>>> = Rc::new(RefCell::new(None));
        let parked = slot.clone();
        let trampoline = Closure::wrap(Box::new(move |timestamp: f64| {
            let callback = parked.borrow_mut().take();
            if let Some(callback) = callback {
                callback(timestamp);
            }
        }) as Box<dyn FnMut(f64)>);
        Self {
            window,
            slot,
            trampoline,
        }
    }
}

impl FrameClock for AnimationFrames {
    type Handle = i32;

    fn request_frame(&self, callback: FrameCallback) -> Result<i32, ScheduleError> {
        *self.slot.borrow_mut() = Some(callback);
        self.window
            .request_animation_frame(self.trampoline.as_ref().unchecked_ref())
            .map_err(|err| {
                self.slot.borrow_mut().take();
                ScheduleError(format!("{err:?}"))
            })
    }

    fn cancel_frame(&self, handle: i32) {
        if let Err(err) = self.window.cancel_animation_frame(handle) {
            log::warn!("cancelAnimationFrame failed: {err:?}");
        }
        self.slot.borrow_mut().take();
    }
}

pub struct ContainerObserver {
    window: Window,
    container: HtmlElement,
}

pub struct Observation {
    observer: ResizeObserver,
    _callback: Closure<dyn FnMut(js_sys::Array)>,
}

impl BoxObserver for ContainerObserver {
    type Subscription = Observation;

    /// Content box, the same box `ResizeObserver` reports.
    fn current_size(&self) -> BoxSize {
        let style = self.window.get_computed_style(&self.container).ok().flatten();
        let padding = |side: &str| {
            style
                .as_ref()
                .and_then(|style| style.get_property_value(side).ok())
                .and_then(|value| value.trim().trim_end_matches("px").parse::<f64>().ok())
                .unwrap_or(0.0)
        };
        let width = self.container.client_width() as f64
            - padding("padding-left")
            - padding("padding-right");
        let height = self.container.client_height() as f64
            - padding("padding-top")
            - padding("padding-bottom");
        BoxSize::new(
            width.max(0.0),
            height.max(0.0),
            self.window.device_pixel_ratio(),
        )
    }

    fn observe(&self, mut callback: ResizeCallback) -> Result<Observation, ObserveError> {
        let window = self.window.clone();
        let closure = Closure::wrap(Box::new(move |entries: js_sys::Array| {
            let Some(entry) = entries.iter().last() else {
                return;
            };
            let rect = entry.unchecked_into::<ResizeObserverEntry>().content_rect();
            callback(BoxSize::new(
                rect.width(),
                rect.height(),
                window.device_pixel_ratio(),
            ));
        }) as Box<dyn FnMut(js_sys::Array)>);

        let observer = ResizeObserver::new(closure.as_ref().unchecked_ref())
            .map_err(|err| ObserveError(format!("{err:?}")))?;
        observer.observe(&self.container);
        Ok(Observation {
            observer,
            _callback: closure,
        })
    }

    fn unobserve(&self, subscription: Observation) {
        subscription.observer.disconnect();
    }
}
