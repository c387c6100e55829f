use crate::error::CompileError;
use crate::host::GpuBackend;
use crate::uniforms::UniformTable;

pub const VERTEX_SHADER: &str = r#"#version 300 es
in vec2 a_position;

void main() {
    gl_Position = vec4(a_position, 0.0, 1.0);
}
"#;

/// Concentric rotated rings, faded in and out once per loop.
/// Loop caps are compile-time constants; runtime counts only shorten the loops.
pub const FRAGMENT_SHADER: &str = r#"#version 300 es
precision highp float;

#define MAX_RIPPLES 12
#define MAX_LAYERS 3
#define PI 3.14159265359
#define PHASE_RATE 1.0
#define WAVE_FREQUENCY 10.0
#define WAVE_AMPLITUDE 0.1
#define RING_STEP 0.01
#define RING_SPREAD 1.5
#define LAYER_SPREAD 0.05
#define ENERGY_FLOOR 1.0
#define DISTANCE_EPSILON 0.001

uniform vec2 u_resolution;
uniform float u_time;
uniform float u_lineWidth;
uniform int u_rippleCount;
uniform int u_colorLayers;
uniform float u_rotation;
uniform float u_timeScale;
uniform float u_opacity;
uniform float u_waveIntensity;
uniform float u_loopDuration;
uniform float u_scale;
uniform vec3 u_color1;
uniform vec3 u_color2;
uniform vec3 u_color3;
uniform float u_mod;

out vec4 fragColor;

float easeInOutCubic(float t) {
    return t < 0.5 ? 4.0 * t * t * t : 1.0 - pow(-2.0 * t + 2.0, 3.0) / 2.0;
}

void main() {
    float shortSide = min(u_resolution.x, u_resolution.y);
    vec2 p = (gl_FragCoord.xy * 2.0 - u_resolution) / shortSide / u_scale;
    float c = cos(u_rotation);
    float s = sin(u_rotation);
    p = vec2(c * p.x - s * p.y, s * p.x + c * p.y);

    if (u_waveIntensity > 0.0) {
        float drift = u_time * u_timeScale;
        p.x += sin(p.y * WAVE_FREQUENCY + drift) * u_waveIntensity * WAVE_AMPLITUDE;
        p.y += sin(p.x * WAVE_FREQUENCY + drift) * u_waveIntensity * WAVE_AMPLITUDE;
    }

    float t = mod(u_time * u_timeScale * PHASE_RATE, u_loopDuration);
    float fade = easeInOutCubic(sin(t / u_loopDuration * PI));
    float radius = length(p);
    float band = mod(p.x + p.y, u_mod);

    vec3 tints[MAX_LAYERS] = vec3[MAX_LAYERS](u_color1, u_color2, u_color3);
    vec3 color = vec3(0.0);
    float energy = 0.0;
    for (int layer = 0; layer < MAX_LAYERS; layer++) {
        if (layer >= u_colorLayers) break;
        float layerSum = 0.0;
        for (int ring = 0; ring < MAX_RIPPLES; ring++) {
            if (ring >= u_rippleCount) break;
            float index = float(ring + 1);
            float offset = fract(t + float(ring) * RING_STEP);
            float ringRadius = offset * offset * RING_SPREAD + float(layer) * LAYER_SPREAD;
            float sharpness = u_lineWidth / (abs(radius - ringRadius) + DISTANCE_EPSILON);
            layerSum += u_lineWidth * index * index * sharpness * band;
        }
        color += tints[layer] * layerSum;
        energy += layerSum;
    }

    color /= max(energy, ENERGY_FLOOR);
    float alpha = min(energy * 0.2, 1.0) * u_opacity * fade;
    fragColor = vec4(color * fade, alpha);
}
"#;

/// A linked program plus its static quad. Immutable once compiled; only the
/// uniforms bound before each draw change.
pub struct ShaderProgram<B: GpuBackend> {
    program: Option<B::Program>,
    quad: Option<B::Quad>,
}

impl<B: GpuBackend> ShaderProgram<B> {
    /// Compile the ripple shaders. A failure here is a defect in the static
    /// sources and is never retried.
    pub fn compile(gl: &B) -> Result<Self, CompileError> {
        Self::compile_sources(gl, VERTEX_SHADER, FRAGMENT_SHADER)
    }

    pub fn compile_sources(gl: &B, vertex: &str, fragment: &str) -> Result<Self, CompileError> {
        let program = gl.compile_program(vertex, fragment)?;
        let quad = match gl.create_quad(&program) {
            Ok(quad) => quad,
            Err(err) => {
                gl.delete_program(program);
                return Err(err);
            }
        };
        log::debug!("ripple program linked");
        Ok(Self {
            program: Some(program),
            quad: Some(quad),
        })
    }

    /// Resolve every uniform's location against this program.
    pub fn locate(&self, gl: &B, uniforms: &mut UniformTable<B::Location>) {
        if let Some(program) = &self.program {
            uniforms.bind_locations(|name| gl.uniform_location(program, name));
        }
    }

    /// Make this program current and upload every uniform. Returns false once
    /// disposed.
    pub fn bind(&self, gl: &B, uniforms: &UniformTable<B::Location>) -> bool {
        let (Some(program), Some(quad)) = (&self.program, &self.quad) else {
            return false;
        };
        gl.use_program(program, quad);
        for (location, value) in uniforms.located() {
            gl.set_uniform(location, value);
        }
        true
    }

    pub fn is_live(&self) -> bool {
        self.program.is_some()
    }

    /// Release the program and quad. With no context left the handles are
    /// simply dropped; they died with it. Idempotent.
    pub fn dispose(&mut self, gl: Option<&B>) {
        let (program, quad) = (self.program.take(), self.quad.take());
        if let Some(gl) = gl {
            if let Some(quad) = quad {
                gl.delete_quad(quad);
            }
            if let Some(program) = program {
                gl.delete_program(program);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MAX_LAYERS, MAX_RIPPLES};
    use crate::uniforms;

    #[test]
    fn loop_caps_match_config_limits() {
        assert!(FRAGMENT_SHADER.contains(&format!("#define MAX_RIPPLES {MAX_RIPPLES}\n")));
        assert!(FRAGMENT_SHADER.contains(&format!("#define MAX_LAYERS {MAX_LAYERS}\n")));
    }

    #[test]
    fn every_table_uniform_is_declared() {
        for name in [
            uniforms::RESOLUTION,
            uniforms::TIME,
            uniforms::LINE_WIDTH,
            uniforms::RIPPLE_COUNT,
            uniforms::COLOR_LAYERS,
            uniforms::ROTATION,
            uniforms::TIME_SCALE,
            uniforms::OPACITY,
            uniforms::WAVE_INTENSITY,
            uniforms::LOOP_DURATION,
            uniforms::SCALE,
            uniforms::COLOR1,
            uniforms::COLOR2,
            uniforms::COLOR3,
            uniforms::MODULUS,
        ] {
            assert!(FRAGMENT_SHADER.contains(&format!(" {name};")), "{name} missing");
        }
    }

    #[test]
    fn both_stages_target_webgl2() {
        assert!(VERTEX_SHADER.starts_with("#version 300 es"));
        assert!(FRAGMENT_SHADER.starts_with("#version 300 es"));
        assert!(VERTEX_SHADER.contains("a_position"));
    }
}
