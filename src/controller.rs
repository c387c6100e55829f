//! Mount/update/unmount lifecycle for one effect instance.
//!
//! Acquisition order is surface → program → resize watch → frame loop, and
//! teardown runs the exact reverse, so nothing is freed while a queued frame
//! or resize callback could still reach it. Callbacks only hold weak
//! references to the scene; once it is dropped they do nothing.

use std::cell::RefCell;
use std::rc::Rc;

use crate::config::{EffectConfig, EffectParams};
use crate::error::{ContextError, MountError};
use crate::host::{BoxSize, GpuBackend, SurfaceHost};
use crate::resize::ResizeWatcher;
use crate::scheduler::{AnimationScheduler, SchedulerState};
use crate::shader::ShaderProgram;
use crate::surface::RenderSurface;
use crate::uniforms::{UniformTable, UniformValue};

struct Scene<B: GpuBackend> {
    uniforms: UniformTable<B::Location>,
    program: ShaderProgram<B>,
    surface: RenderSurface<B>,
    frames: u64,
}

impl<B: GpuBackend> Scene<B> {
    fn frame(&mut self, dt: f64) {
        self.uniforms.advance_time(dt);
        if self.surface.draw(&self.program, &self.uniforms) {
            self.frames += 1;
        }
    }

    fn resize(&mut self, size: BoxSize) {
        self.surface.resize(size, &mut self.uniforms);
    }

    fn is_live(&self) -> bool {
        self.program.is_live() && self.surface.is_attached()
    }

    fn dispose(&mut self) {
        self.program.dispose(self.surface.backend());
        self.surface.dispose();
    }
}

/// One mounted effect. Owns its GPU context, program, resize observation and
/// frame loop exclusively; nothing is shared with other instances.
pub struct EffectController<H>
where
    H: SurfaceHost,
    H::Backend: 'static,
    H::Clock: 'static,
{
    host: H,
    params: EffectParams,
    background: Option<String>,
    scheduler: AnimationScheduler<H::Clock>,
    watcher: ResizeWatcher<H::Observer>,
    scene: Option<Rc<RefCell<Scene<H::Backend>>>>,
}

impl<H> EffectController<H>
where
    H: SurfaceHost,
    H::Backend: 'static,
    H::Clock: 'static,
{
    /// Mount into `host`. On failure everything acquired so far has already
    /// been released and the host shows only its own background.
    pub fn mount(host: H, config: &EffectConfig) -> Result<Self, MountError> {
        let params = EffectParams::resolve(config, &host);
        let mut controller = Self {
            scheduler: AnimationScheduler::new(host.frame_clock()),
            watcher: ResizeWatcher::new(host.box_observer()),
            host,
            params,
            background: None,
            scene: None,
        };

        if let Err(err) = controller.acquire() {
            log::error!("effect mount failed: {err}");
            controller.unmount();
            return Err(err);
        }
        controller.apply_background(config.background_color.as_deref());
        log::debug!("effect mounted");
        Ok(controller)
    }

    fn acquire(&mut self) -> Result<(), MountError> {
        let mut surface = RenderSurface::attach(&self.host, self.watcher.current_size())?;
        let program = match surface.backend().map(ShaderProgram::compile) {
            Some(Ok(program)) => program,
            Some(Err(err)) => {
                surface.dispose();
                return Err(err.into());
            }
            None => {
                return Err(
                    ContextError::Unavailable("surface released while mounting".into()).into(),
                )
            }
        };

        let mut uniforms = UniformTable::new(&self.params, surface.dimensions());
        if let Some(gl) = surface.backend() {
            program.locate(gl, &mut uniforms);
        }
        let scene = Rc::new(RefCell::new(Scene {
            uniforms,
            program,
            surface,
            frames: 0,
        }));
        self.scene = Some(scene.clone());

        let weak = Rc::downgrade(&scene);
        self.watcher.start(move |size| {
            if let Some(scene) = weak.upgrade() {
                scene.borrow_mut().resize(size);
            }
        })?;

        let weak = Rc::downgrade(&scene);
        self.scheduler.start(move |dt| {
            if let Some(scene) = weak.upgrade() {
                scene.borrow_mut().frame(dt);
            }
        })?;
        Ok(())
    }

    /// Apply new parameters in place. Never recompiles, resizes or restarts
    /// the loop, and leaves accumulated time alone.
    pub fn update(&mut self, config: &EffectConfig) {
        let Some(scene) = &self.scene else {
            log::debug!("update ignored: effect not mounted");
            return;
        };
        let params = EffectParams::resolve(config, &self.host);
        if params != self.params {
            scene.borrow_mut().uniforms.patch(&params);
            self.params = params;
        }
        self.apply_background(config.background_color.as_deref());
    }

    /// Release everything in reverse acquisition order. Safe to repeat and
    /// safe after a partial mount.
    pub fn unmount(&mut self) {
        self.scheduler.cancel();
        self.watcher.stop();
        if let Some(scene) = self.scene.take() {
            scene.borrow_mut().dispose();
            log::debug!("effect unmounted");
        }
        if self.background.take().is_some() {
            self.host.set_background(None);
        }
    }

    fn apply_background(&mut self, color: Option<&str>) {
        if self.background.as_deref() == color {
            return;
        }
        self.host.set_background(color);
        self.background = color.map(str::to_owned);
    }

    /// True while the program and its drawing surface are both alive.
    pub fn is_mounted(&self) -> bool {
        self.scene
            .as_ref()
            .is_some_and(|scene| scene.borrow().is_live())
    }

    pub fn scheduler_state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.is_watching()
    }

    pub fn params(&self) -> &EffectParams {
        &self.params
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Accumulated shader time, while mounted.
    pub fn time(&self) -> Option<f32> {
        self.scene.as_ref().map(|scene| scene.borrow().uniforms.time())
    }

    pub fn uniform(&self, name: &str) -> Option<UniformValue> {
        self.scene
            .as_ref()
            .and_then(|scene| scene.borrow().uniforms.get(name))
    }

    pub fn frames_drawn(&self) -> u64 {
        self.scene
            .as_ref()
            .map(|scene| scene.borrow().frames)
            .unwrap_or(0)
    }
}

impl<H> Drop for EffectController<H>
where
    H: SurfaceHost,
    H::Backend: 'static,
    H::Clock: 'static,
{
    fn drop(&mut self) {
        self.unmount();
    }
}
