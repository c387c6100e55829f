//! GPU ripple effect that mounts into a page container, animates once per
//! display frame and tears itself down without leaking.
//!
//! The lifecycle core is target-independent and reaches the page only
//! through the traits in [`host`]. The browser side (WebGL2 context,
//! `requestAnimationFrame`, `ResizeObserver`, JS bindings) is compiled only
//! for wasm32.

pub mod color;
pub mod config;
pub mod controller;
pub mod error;
pub mod host;
pub mod pattern;
pub mod resize;
pub mod scheduler;
pub mod shader;
pub mod surface;
pub mod uniforms;

pub use color::{ColorResolver, Rgb};
pub use config::{EffectConfig, EffectParams, MAX_LAYERS, MAX_RIPPLES};
pub use controller::EffectController;
pub use error::{
    ColorResolutionError, CompileError, ContextError, MountError, ObserveError, ScheduleError,
    ShaderStage,
};
pub use host::{BoxObserver, BoxSize, FrameClock, GpuBackend, StyleSource, SurfaceHost};
pub use scheduler::{AnimationScheduler, SchedulerState};

// Only compile wasm-specific code when targeting wasm32.

#[cfg(target_arch = "wasm32")]
pub use wasm::RippleEffect;

#[cfg(target_arch = "wasm32")]
mod wasm {
    use wasm_bindgen::prelude::*;

    use crate::{EffectConfig, EffectController, MountError};

    mod host;
    mod render;

    use host::DomHost;

    #[wasm_bindgen(start)]
    pub fn main() -> Result<(), JsValue> {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info).ok();
        Ok(())
    }

    /// Handle the host page holds for one effect container.
    #[wasm_bindgen]
    pub struct RippleEffect {
        container: web_sys::HtmlElement,
        controller: Option<EffectController<DomHost>>,
    }

    #[wasm_bindgen]
    impl RippleEffect {
        #[wasm_bindgen(constructor)]
        pub fn new(container: web_sys::HtmlElement) -> RippleEffect {
            RippleEffect {
                container,
                controller: None,
            }
        }

        /// Mount with `config` (a plain object; missing fields take defaults).
        /// Mounting again first tears down the previous mount.
        pub fn mount(&mut self, config: JsValue) -> Result<(), JsValue> {
            self.unmount();
            let config = parse_config(&config).map_err(|err| to_js(MountError::from(err)))?;
            let host = DomHost::new(self.container.clone())?;
            let controller = EffectController::mount(host, &config).map_err(to_js)?;
            self.controller = Some(controller);
            Ok(())
        }

        /// Apply new parameters. Safe to call on every host re-render.
        pub fn update(&mut self, config: JsValue) {
            let Some(controller) = self.controller.as_mut() else {
                return;
            };
            match parse_config(&config) {
                Ok(config) => controller.update(&config),
                Err(err) => log::warn!("ignoring effect update: {err}"),
            }
        }

        pub fn unmount(&mut self) {
            if let Some(mut controller) = self.controller.take() {
                controller.unmount();
            }
        }

        #[wasm_bindgen(js_name = isMounted)]
        pub fn is_mounted(&self) -> bool {
            self.controller.is_some()
        }
    }

    fn parse_config(value: &JsValue) -> Result<EffectConfig, serde_json::Error> {
        if value.is_undefined() || value.is_null() {
            return Ok(EffectConfig::default());
        }
        let json = js_sys::JSON::stringify(value)
            .map(String::from)
            .unwrap_or_default();
        EffectConfig::from_json(&json)
    }

    fn to_js(err: MountError) -> JsValue {
        JsValue::from_str(&err.to_string())
    }
}
