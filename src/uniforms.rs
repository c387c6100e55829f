//! What the shader currently believes: every uniform's value next to its
//! GPU-side location.

use crate::config::EffectParams;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Int(i32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
}

pub const RESOLUTION: &str = "u_resolution";
pub const TIME: &str = "u_time";
pub const LINE_WIDTH: &str = "u_lineWidth";
pub const RIPPLE_COUNT: &str = "u_rippleCount";
pub const COLOR_LAYERS: &str = "u_colorLayers";
pub const ROTATION: &str = "u_rotation";
pub const TIME_SCALE: &str = "u_timeScale";
pub const OPACITY: &str = "u_opacity";
pub const WAVE_INTENSITY: &str = "u_waveIntensity";
pub const LOOP_DURATION: &str = "u_loopDuration";
pub const SCALE: &str = "u_scale";
pub const COLOR1: &str = "u_color1";
pub const COLOR2: &str = "u_color2";
pub const COLOR3: &str = "u_color3";
pub const MODULUS: &str = "u_mod";

struct Slot<L> {
    name: &'static str,
    value: UniformValue,
    location: Option<L>,
}

/// Uniform values keyed by GLSL name, generic over the backend's location type.
///
/// Time only ever moves forward while the table lives; `patch` leaves it alone.
pub struct UniformTable<L> {
    slots: Vec<Slot<L>>,
    time: f32,
    time_rate: f32,
}

impl<L> UniformTable<L> {
    pub fn new(params: &EffectParams, resolution: (u32, u32)) -> Self {
        let mut table = Self {
            slots: Vec::with_capacity(15),
            time: 0.0,
            time_rate: params.time_rate(),
        };
        table.set(RESOLUTION, resolution_value(resolution));
        table.set(TIME, UniformValue::Float(0.0));
        table.patch(params);
        table
    }

    /// Overwrite every parameter uniform. Accumulated time is untouched.
    pub fn patch(&mut self, params: &EffectParams) {
        use UniformValue::{Float, Int, Vec3};

        self.time_rate = params.time_rate();
        self.set(LINE_WIDTH, Float(params.line_width));
        self.set(RIPPLE_COUNT, Int(params.ripple_count));
        self.set(COLOR_LAYERS, Int(params.color_layers));
        self.set(ROTATION, Float(params.rotation));
        self.set(TIME_SCALE, Float(params.time_scale));
        self.set(OPACITY, Float(params.opacity));
        self.set(WAVE_INTENSITY, Float(params.wave_intensity));
        self.set(LOOP_DURATION, Float(params.loop_duration));
        self.set(SCALE, Float(params.scale));
        self.set(COLOR1, Vec3(params.colors[0].to_array()));
        self.set(COLOR2, Vec3(params.colors[1].to_array()));
        self.set(COLOR3, Vec3(params.colors[2].to_array()));
        self.set(MODULUS, Float(params.modulus));
    }

    /// Advance accumulated time by `dt` seconds of wall clock, scaled by the
    /// configured speed. Negative or non-finite intervals are ignored.
    pub fn advance_time(&mut self, dt: f64) {
        if !dt.is_finite() || dt <= 0.0 {
            return;
        }
        self.time += dt as f32 * self.time_rate;
        self.set(TIME, UniformValue::Float(self.time));
    }

    pub fn set_resolution(&mut self, width: u32, height: u32) {
        self.set(RESOLUTION, resolution_value((width, height)));
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn get(&self, name: &str) -> Option<UniformValue> {
        self.slots
            .iter()
            .find(|slot| slot.name == name)
            .map(|slot| slot.value)
    }

    pub fn snapshot(&self) -> Vec<(&'static str, UniformValue)> {
        self.slots.iter().map(|slot| (slot.name, slot.value)).collect()
    }

    /// Look up every uniform's location once, after the program is linked.
    /// Uniforms the compiler optimized out stay without a location.
    pub fn bind_locations(&mut self, mut lookup: impl FnMut(&str) -> Option<L>) {
        for slot in &mut self.slots {
            slot.location = lookup(slot.name);
            if slot.location.is_none() {
                log::debug!("uniform {} has no location", slot.name);
            }
        }
    }

    /// Values paired with their locations, for upload.
    pub fn located(&self) -> impl Iterator<Item = (&L, UniformValue)> {
        self.slots
            .iter()
            .filter_map(|slot| slot.location.as_ref().map(|location| (location, slot.value)))
    }

    fn set(&mut self, name: &'static str, value: UniformValue) {
        match self.slots.iter_mut().find(|slot| slot.name == name) {
            Some(slot) => slot.value = value,
            None => self.slots.push(Slot {
                name,
                value,
                location: None,
            }),
        }
    }
}

fn resolution_value((width, height): (u32, u32)) -> UniformValue {
    UniformValue::Vec2([width as f32, height as f32])
}
