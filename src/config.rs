//! Effect configuration as supplied by the host, and its normalized form.
//!
//! `EffectConfig` is plain data straight from the host page; every field has a
//! default so partial objects are fine. `EffectParams` is what actually reaches
//! the uniforms: finite, clamped to the shader's loop caps, colors resolved.

use serde::{Deserialize, Deserializer};

use crate::color::{ColorResolver, Rgb};
use crate::host::StyleSource;

/// Rings evaluated per layer by the fragment stage. Compiled into the shader.
pub const MAX_RIPPLES: u32 = 12;
/// Color layers evaluated by the fragment stage. Compiled into the shader.
pub const MAX_LAYERS: u32 = 3;

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EffectConfig {
    #[serde(deserialize_with = "number")]
    pub speed: f64,
    #[serde(deserialize_with = "number")]
    pub line_width: f64,
    #[serde(deserialize_with = "count")]
    pub ripple_count: u32,
    #[serde(deserialize_with = "count")]
    pub color_layers: u32,
    /// Degrees.
    #[serde(deserialize_with = "number")]
    pub rotation: f64,
    #[serde(deserialize_with = "number")]
    pub time_scale: f64,
    #[serde(deserialize_with = "number")]
    pub opacity: f64,
    #[serde(deserialize_with = "number")]
    pub wave_intensity: f64,
    #[serde(deserialize_with = "number")]
    pub animation_speed: f64,
    /// Seconds of wall-clock time per fade cycle.
    #[serde(deserialize_with = "number")]
    pub loop_duration: f64,
    #[serde(deserialize_with = "number")]
    pub scale: f64,
    pub color1: String,
    pub color2: String,
    pub color3: String,
    #[serde(rename = "mod", deserialize_with = "number")]
    pub modulus: f64,
    /// Painted on the container behind the drawing surface.
    pub background_color: Option<String>,
}

impl Default for EffectConfig {
    fn default() -> Self {
        Self {
            speed: 1.0,
            line_width: 0.002,
            ripple_count: 8,
            color_layers: 3,
            rotation: 135.0,
            time_scale: 0.5,
            opacity: 1.0,
            wave_intensity: 0.0,
            animation_speed: 1.0,
            loop_duration: 0.7,
            scale: 1.0,
            color1: "#3b82f6".to_owned(),
            color2: "#8b5cf6".to_owned(),
            color3: "#ec4899".to_owned(),
            modulus: 0.2,
            background_color: None,
        }
    }
}

impl EffectConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Normalized parameters, ready to be written into the uniform table.
#[derive(Clone, Debug, PartialEq)]
pub struct EffectParams {
    pub speed: f32,
    pub line_width: f32,
    pub ripple_count: i32,
    pub color_layers: i32,
    /// Radians.
    pub rotation: f32,
    pub time_scale: f32,
    pub opacity: f32,
    pub wave_intensity: f32,
    pub animation_speed: f32,
    pub loop_duration: f32,
    pub scale: f32,
    pub colors: [Rgb; 3],
    pub modulus: f32,
}

impl EffectParams {
    /// Normalizes `config` and resolves its colors against `style`.
    ///
    /// Never fails: out-of-range counts are clamped and anything non-finite
    /// or non-positive where positivity is required falls back to the default.
    pub fn resolve(config: &EffectConfig, style: &dyn StyleSource) -> Self {
        let defaults = EffectConfig::default();
        let resolver = ColorResolver::new(style);

        Self {
            speed: non_negative(config.speed, defaults.speed),
            line_width: non_negative(config.line_width, defaults.line_width),
            ripple_count: config.ripple_count.clamp(1, MAX_RIPPLES) as i32,
            color_layers: config.color_layers.clamp(1, MAX_LAYERS) as i32,
            rotation: finite_or(config.rotation, defaults.rotation).to_radians() as f32,
            time_scale: finite_or(config.time_scale, defaults.time_scale) as f32,
            opacity: finite_or(config.opacity, defaults.opacity).clamp(0.0, 1.0) as f32,
            wave_intensity: non_negative(config.wave_intensity, defaults.wave_intensity),
            animation_speed: non_negative(config.animation_speed, defaults.animation_speed),
            loop_duration: positive(config.loop_duration, defaults.loop_duration),
            scale: positive(config.scale, defaults.scale),
            colors: [
                resolver.resolve(&config.color1),
                resolver.resolve(&config.color2),
                resolver.resolve(&config.color3),
            ],
            modulus: positive(config.modulus, defaults.modulus),
        }
    }

    /// Multiplier applied to wall-clock frame intervals before they reach `u_time`.
    pub fn time_rate(&self) -> f32 {
        self.speed * self.animation_speed
    }
}

/// `JSON.stringify` turns NaN and the infinities into `null`; keep them
/// non-finite so normalization substitutes the default.
fn number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

/// JS numbers arrive as floats; round them and let clamping handle the range.
fn count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let value = number(deserializer)?;
    if value.is_finite() {
        Ok(value.round().clamp(0.0, u32::MAX as f64) as u32)
    } else {
        Ok(0)
    }
}

fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

fn non_negative(value: f64, fallback: f64) -> f32 {
    finite_or(value, fallback).max(0.0) as f32
}

fn positive(value: f64, fallback: f64) -> f32 {
    if value.is_finite() && value > 0.0 {
        value as f32
    } else {
        fallback as f32
    }
}
