use crate::error::ContextError;
use crate::host::{BoxSize, GpuBackend, SurfaceHost};
use crate::shader::ShaderProgram;
use crate::uniforms::UniformTable;

/// The GPU context and the drawing surface it renders into, for one mount.
pub struct RenderSurface<B: GpuBackend> {
    backend: Option<B>,
    dimensions: (u32, u32),
}

impl<B: GpuBackend> RenderSurface<B> {
    /// Create the drawing surface inside `host`, sized to `initial`.
    pub fn attach<H>(host: &H, initial: BoxSize) -> Result<Self, ContextError>
    where
        H: SurfaceHost<Backend = B>,
    {
        let backend = host.create_context()?;
        let dimensions = initial.backing_dimensions();
        backend.set_viewport(dimensions.0, dimensions.1);
        log::debug!("render surface attached at {}x{}", dimensions.0, dimensions.1);
        Ok(Self {
            backend: Some(backend),
            dimensions,
        })
    }

    /// Match the backing store to the container's new box and keep the
    /// resolution uniform in step, so aspect correction stays right.
    pub fn resize(&mut self, size: BoxSize, uniforms: &mut UniformTable<B::Location>) {
        let Some(backend) = &self.backend else {
            return;
        };
        let (width, height) = size.backing_dimensions();
        if (width, height) != self.dimensions {
            backend.set_viewport(width, height);
            self.dimensions = (width, height);
            log::debug!("render surface resized to {width}x{height}");
        }
        uniforms.set_resolution(width, height);
    }

    /// Bind `program` with `uniforms` and issue exactly one draw call.
    pub fn draw(&self, program: &ShaderProgram<B>, uniforms: &UniformTable<B::Location>) -> bool {
        let Some(backend) = &self.backend else {
            return false;
        };
        if !program.bind(backend, uniforms) {
            return false;
        }
        backend.draw_quad();
        true
    }

    pub fn backend(&self) -> Option<&B> {
        self.backend.as_ref()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.dimensions
    }

    pub fn is_attached(&self) -> bool {
        self.backend.is_some()
    }

    /// Release the context and detach the drawing surface. Idempotent.
    pub fn dispose(&mut self) {
        if let Some(backend) = self.backend.take() {
            backend.release();
            log::debug!("render surface released");
        }
    }
}
