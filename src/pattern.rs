//! CPU rendition of the fragment stage's math.
//!
//! Kept line-for-line with `shader::FRAGMENT_SHADER` so timing and coordinate
//! behaviour can be checked without a GPU.

use crate::config::{EffectParams, MAX_LAYERS, MAX_RIPPLES};

/// Multiplier between scaled time and the fade phase.
pub const PHASE_RATE: f32 = 1.0;
pub const WAVE_FREQUENCY: f32 = 10.0;
pub const WAVE_AMPLITUDE: f32 = 0.1;
pub const RING_STEP: f32 = 0.01;
pub const RING_SPREAD: f32 = 1.5;
pub const LAYER_SPREAD: f32 = 0.05;
pub const ENERGY_FLOOR: f32 = 1.0;
const DISTANCE_EPSILON: f32 = 1e-3;

/// Cubic ease-in-out on [0, 1].
pub fn ease_in_out_cubic(t: f32) -> f32 {
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

/// `mod(time * timeScale * k, loopDuration)`, GLSL semantics.
pub fn phase(time: f32, time_scale: f32, loop_duration: f32) -> f32 {
    (time * time_scale * PHASE_RATE).rem_euclid(loop_duration)
}

/// Whole-pattern opacity envelope; zero at the start and end of every loop.
pub fn fade(time: f32, time_scale: f32, loop_duration: f32) -> f32 {
    let t = phase(time, time_scale, loop_duration);
    ease_in_out_cubic((t / loop_duration * std::f32::consts::PI).sin())
}

/// Pixel position → centered, aspect-corrected, scaled and rotated coordinate.
/// The shorter side of the surface spans [-1, 1].
pub fn effect_space(pixel: [f32; 2], resolution: [f32; 2], scale: f32, rotation: f32) -> [f32; 2] {
    let short = resolution[0].min(resolution[1]);
    let x = (pixel[0] * 2.0 - resolution[0]) / short / scale;
    let y = (pixel[1] * 2.0 - resolution[1]) / short / scale;
    let (s, c) = rotation.sin_cos();
    [c * x - s * y, s * x + c * y]
}

/// Sinusoidal ripple-in-ripple displacement.
pub fn wave(p: [f32; 2], intensity: f32, time: f32, time_scale: f32) -> [f32; 2] {
    if intensity <= 0.0 {
        return p;
    }
    let drift = time * time_scale;
    let x = p[0] + (p[1] * WAVE_FREQUENCY + drift).sin() * intensity * WAVE_AMPLITUDE;
    let y = p[1] + (x * WAVE_FREQUENCY + drift).sin() * intensity * WAVE_AMPLITUDE;
    [x, y]
}

/// Color and alpha for one pixel at accumulated `time`.
pub fn shade(pixel: [f32; 2], resolution: [f32; 2], params: &EffectParams, time: f32) -> [f32; 4] {
    let p = effect_space(pixel, resolution, params.scale, params.rotation);
    let p = wave(p, params.wave_intensity, time, params.time_scale);

    let t = phase(time, params.time_scale, params.loop_duration);
    let envelope = fade(time, params.time_scale, params.loop_duration);
    let radius = (p[0] * p[0] + p[1] * p[1]).sqrt();
    let band = (p[0] + p[1]).rem_euclid(params.modulus);

    let mut color = [0.0f32; 3];
    let mut energy = 0.0f32;
    for layer in 0..MAX_LAYERS as i32 {
        if layer >= params.color_layers {
            break;
        }
        let mut layer_sum = 0.0;
        for ring in 0..MAX_RIPPLES as i32 {
            if ring >= params.ripple_count {
                break;
            }
            let index = (ring + 1) as f32;
            let offset = (t + ring as f32 * RING_STEP).fract();
            let ring_radius = offset * offset * RING_SPREAD + layer as f32 * LAYER_SPREAD;
            let sharpness = params.line_width / ((radius - ring_radius).abs() + DISTANCE_EPSILON);
            layer_sum += params.line_width * index * index * sharpness * band;
        }
        let tint = params.colors[layer as usize].to_array();
        for (channel, value) in color.iter_mut().zip(tint) {
            *channel += value * layer_sum;
        }
        energy += layer_sum;
    }

    let norm = energy.max(ENERGY_FLOOR);
    [
        color[0] / norm * envelope,
        color[1] / norm * envelope,
        color[2] / norm * envelope,
        (energy * 0.2).min(1.0) * params.opacity * envelope,
    ]
}
