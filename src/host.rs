//! Seams between the effect core and the page it is mounted into.
//!
//! The browser implementations live in `wasm::host` and `wasm::render`; tests
//! substitute counting doubles.

use crate::error::{CompileError, ContextError, ObserveError, ScheduleError};
use crate::uniforms::UniformValue;

/// Content box of the host container, in CSS pixels, plus the display's
/// device pixel ratio at observation time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoxSize {
    pub width: f64,
    pub height: f64,
    pub pixel_ratio: f64,
}

impl BoxSize {
    pub fn new(width: f64, height: f64, pixel_ratio: f64) -> Self {
        Self {
            width,
            height,
            pixel_ratio,
        }
    }

    /// Backing-store dimensions for a drawing surface covering this box.
    /// Never zero, so the resolution uniform can't divide by zero.
    pub fn backing_dimensions(&self) -> (u32, u32) {
        let ratio = if self.pixel_ratio.is_finite() && self.pixel_ratio > 0.0 {
            self.pixel_ratio
        } else {
            1.0
        };
        let scale = |css: f64| {
            if css.is_finite() {
                (css * ratio).round().clamp(1.0, u32::MAX as f64) as u32
            } else {
                1
            }
        };
        (scale(self.width), scale(self.height))
    }
}

/// One acquired GPU context bound to one drawing surface.
pub trait GpuBackend {
    type Program;
    type Quad;
    type Location;

    fn compile_program(&self, vertex: &str, fragment: &str)
        -> Result<Self::Program, CompileError>;
    /// Static full-screen quad wired to `program`'s position attribute.
    fn create_quad(&self, program: &Self::Program) -> Result<Self::Quad, CompileError>;
    fn uniform_location(&self, program: &Self::Program, name: &str) -> Option<Self::Location>;
    fn use_program(&self, program: &Self::Program, quad: &Self::Quad);
    fn set_uniform(&self, location: &Self::Location, value: UniformValue);
    /// Resize the drawing buffer and the viewport.
    fn set_viewport(&self, width: u32, height: u32);
    /// Clear and issue exactly one draw call with additive blending.
    fn draw_quad(&self);
    fn delete_program(&self, program: Self::Program);
    fn delete_quad(&self, quad: Self::Quad);
    /// Give the context back and detach the drawing surface from the container.
    fn release(&self);
}

pub type FrameCallback = Box<dyn FnOnce(f64)>;

/// Source of display-refresh callbacks. Callbacks receive a timestamp in
/// milliseconds.
pub trait FrameClock {
    type Handle;

    fn request_frame(&self, callback: FrameCallback) -> Result<Self::Handle, ScheduleError>;
    fn cancel_frame(&self, handle: Self::Handle);
}

pub type ResizeCallback = Box<dyn FnMut(BoxSize)>;

pub trait BoxObserver {
    type Subscription;

    fn current_size(&self) -> BoxSize;
    fn observe(&self, callback: ResizeCallback) -> Result<Self::Subscription, ObserveError>;
    fn unobserve(&self, subscription: Self::Subscription);
}

/// Lookup of CSS custom properties (`--name`) on the document's computed style.
pub trait StyleSource {
    fn custom_property(&self, name: &str) -> Option<String>;
}

/// A style source with no properties defined.
impl StyleSource for () {
    fn custom_property(&self, _name: &str) -> Option<String> {
        None
    }
}

/// The container an effect is mounted into.
pub trait SurfaceHost: StyleSource {
    type Backend: GpuBackend;
    type Clock: FrameClock;
    type Observer: BoxObserver;

    /// Create a drawing surface inside the container and acquire its context.
    fn create_context(&self) -> Result<Self::Backend, ContextError>;
    fn frame_clock(&self) -> Self::Clock;
    fn box_observer(&self) -> Self::Observer;
    /// Paint (or with `None`, clear) the container background.
    fn set_background(&self, color: Option<&str>);
}
