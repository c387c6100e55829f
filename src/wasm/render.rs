use wasm_bindgen::JsCast;
use web_sys::{
    Document, HtmlCanvasElement, HtmlElement, WebGl2RenderingContext as GL, WebGlBuffer,
    WebGlProgram, WebGlShader, WebGlUniformLocation, WebGlVertexArrayObject, WebglLoseContext,
};

use crate::error::{CompileError, ContextError, ShaderStage};
use crate::host::GpuBackend;
use crate::uniforms::UniformValue;

/// Two triangles covering clip space, drawn as a strip.
const QUAD: [f32; 8] = [-1.0, -1.0, 1.0, -1.0, -1.0, 1.0, 1.0, 1.0];

pub struct WebQuad {
    vao: WebGlVertexArrayObject,
    buffer: WebGlBuffer,
}

/// WebGL2 context on a canvas appended to the container.
pub struct WebGlBackend {
    gl: GL,
    canvas: HtmlCanvasElement,
}

impl WebGlBackend {
    pub fn create(document: &Document, container: &HtmlElement) -> Result<Self, ContextError> {
        let canvas: HtmlCanvasElement = document
            .create_element("canvas")
            .map_err(|err| ContextError::Surface(format!("{err:?}")))?
            .dyn_into()
            .map_err(|_| ContextError::Surface("created element is not a canvas".into()))?;

        let style = canvas.style();
        for (property, value) in [
            ("display", "block"),
            ("width", "100%"),
            ("height", "100%"),
            ("pointer-events", "none"),
        ] {
            style
                .set_property(property, value)
                .map_err(|err| ContextError::Surface(format!("{err:?}")))?;
        }
        container
            .append_child(&canvas)
            .map_err(|err| ContextError::Surface(format!("{err:?}")))?;

        let gl = match canvas.get_context("webgl2") {
            Ok(Some(context)) => context.dyn_into::<GL>().ok(),
            _ => None,
        };
        match gl {
            Some(gl) => Ok(Self { gl, canvas }),
            None => {
                canvas.remove();
                Err(ContextError::Unavailable("WebGL2 not supported".into()))
            }
        }
    }

    fn compile_stage(&self, stage: ShaderStage, source: &str) -> Result<WebGlShader, CompileError> {
        let kind = match stage {
            ShaderStage::Vertex => GL::VERTEX_SHADER,
            ShaderStage::Fragment => GL::FRAGMENT_SHADER,
        };
        let shader = self
            .gl
            .create_shader(kind)
            .ok_or(CompileError::Allocation("a shader object"))?;
        self.gl.shader_source(&shader, source);
        self.gl.compile_shader(&shader);

        let compiled = self
            .gl
            .get_shader_parameter(&shader, GL::COMPILE_STATUS)
            .as_bool()
            .unwrap_or(false);
        if compiled {
            Ok(shader)
        } else {
            let log = self.gl.get_shader_info_log(&shader).unwrap_or_default();
            self.gl.delete_shader(Some(&shader));
            Err(CompileError::Stage { stage, log })
        }
    }
}

impl GpuBackend for WebGlBackend {
    type Program = WebGlProgram;
    type Quad = WebQuad;
    type Location = WebGlUniformLocation;

    fn compile_program(&self, vertex: &str, fragment: &str) -> Result<WebGlProgram, CompileError> {
        let vertex = self.compile_stage(ShaderStage::Vertex, vertex)?;
        let fragment = match self.compile_stage(ShaderStage::Fragment, fragment) {
            Ok(shader) => shader,
            Err(err) => {
                self.gl.delete_shader(Some(&vertex));
                return Err(err);
            }
        };

        let program = self.gl.create_program();
        if let Some(program) = &program {
            self.gl.attach_shader(program, &vertex);
            self.gl.attach_shader(program, &fragment);
            self.gl.link_program(program);
            self.gl.detach_shader(program, &vertex);
            self.gl.detach_shader(program, &fragment);
        }
        self.gl.delete_shader(Some(&vertex));
        self.gl.delete_shader(Some(&fragment));

        let program = program.ok_or(CompileError::Allocation("a program object"))?;
        let linked = self
            .gl
            .get_program_parameter(&program, GL::LINK_STATUS)
            .as_bool()
            .unwrap_or(false);
        if linked {
            Ok(program)
        } else {
            let log = self.gl.get_program_info_log(&program).unwrap_or_default();
            self.gl.delete_program(Some(&program));
            Err(CompileError::Link(log))
        }
    }

    fn create_quad(&self, program: &WebGlProgram) -> Result<WebQuad, CompileError> {
        let position = self.gl.get_attrib_location(program, "a_position");
        if position < 0 {
            return Err(CompileError::Link("a_position attribute missing".into()));
        }
        let vao = self
            .gl
            .create_vertex_array()
            .ok_or(CompileError::Allocation("a vertex array"))?;
        let Some(buffer) = self.gl.create_buffer() else {
            self.gl.delete_vertex_array(Some(&vao));
            return Err(CompileError::Allocation("a vertex buffer"));
        };

        self.gl.bind_vertex_array(Some(&vao));
        self.gl.bind_buffer(GL::ARRAY_BUFFER, Some(&buffer));
        let vertices = js_sys::Float32Array::from(&QUAD[..]);
        self.gl
            .buffer_data_with_array_buffer_view(GL::ARRAY_BUFFER, &vertices, GL::STATIC_DRAW);
        self.gl.enable_vertex_attrib_array(position as u32);
        self.gl
            .vertex_attrib_pointer_with_i32(position as u32, 2, GL::FLOAT, false, 0, 0);
        self.gl.bind_vertex_array(None);
        self.gl.bind_buffer(GL::ARRAY_BUFFER, None);

        Ok(WebQuad { vao, buffer })
    }

    fn uniform_location(&self, program: &WebGlProgram, name: &str) -> Option<WebGlUniformLocation> {
        self.gl.get_uniform_location(program, name)
    }

    fn use_program(&self, program: &WebGlProgram, quad: &WebQuad) {
        self.gl.use_program(Some(program));
        self.gl.bind_vertex_array(Some(&quad.vao));
    }

    fn set_uniform(&self, location: &WebGlUniformLocation, value: UniformValue) {
        let location = Some(location);
        match value {
            UniformValue::Float(v) => self.gl.uniform1f(location, v),
            UniformValue::Int(v) => self.gl.uniform1i(location, v),
            UniformValue::Vec2([x, y]) => self.gl.uniform2f(location, x, y),
            UniformValue::Vec3([x, y, z]) => self.gl.uniform3f(location, x, y, z),
        }
    }

    fn set_viewport(&self, width: u32, height: u32) {
        self.canvas.set_width(width);
        self.canvas.set_height(height);
        self.gl.viewport(0, 0, width as i32, height as i32);
    }

    fn draw_quad(&self) {
        self.gl.clear_color(0.0, 0.0, 0.0, 0.0);
        self.gl.clear(GL::COLOR_BUFFER_BIT);
        self.gl.disable(GL::DEPTH_TEST);
        self.gl.depth_mask(false);
        self.gl.enable(GL::BLEND);
        self.gl.blend_func(GL::ONE, GL::ONE);
        self.gl.draw_arrays(GL::TRIANGLE_STRIP, 0, 4);
    }

    fn delete_program(&self, program: WebGlProgram) {
        self.gl.use_program(None);
        self.gl.delete_program(Some(&program));
    }

    fn delete_quad(&self, quad: WebQuad) {
        self.gl.bind_vertex_array(None);
        self.gl.delete_vertex_array(Some(&quad.vao));
        self.gl.delete_buffer(Some(&quad.buffer));
    }

    fn release(&self) {
        if let Ok(Some(extension)) = self.gl.get_extension("WEBGL_lose_context") {
            extension.unchecked_into::<WebglLoseContext>().lose_context();
        }
        self.canvas.remove();
    }
}
