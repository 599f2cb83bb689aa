//! Animation parameters as pure functions of the published input and the
//! render loop's frame counter.

use ratatui::style::Color;

use crate::channel::AnimationInput;

/// Pulse used while paused or idle. Kept above zero so the art stays visible.
pub const RESTING_PULSE: f32 = 0.3;
/// Active-line length is folded into `0..INTENSITY_RANGE`.
pub const INTENSITY_RANGE: usize = 60;
const PULSE_RATE: f32 = 0.05;
const SPIN_RATE: f32 = 0.015;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisualState {
    /// Degrees, `[0, 360)`.
    pub hue: f32,
    /// `[0, 1]`.
    pub pulse_amplitude: f32,
    pub intensity: f32,
    pub is_playing: bool,
    /// Radians; scene rotation.
    pub angle: f32,
    /// Ring radius in canvas dots before scaling to the surface.
    pub radius: f32,
}

impl VisualState {
    pub fn derive(input: &AnimationInput, frame: u64) -> Self {
        let pulse = pulse_amplitude(frame, input.is_playing);
        let intensity = intensity(input.active_line.as_deref());
        VisualState {
            hue: hue(input.progress_ms, frame),
            pulse_amplitude: pulse,
            intensity,
            is_playing: input.is_playing,
            angle: angle(input.progress_ms, frame),
            radius: radius(intensity, pulse),
        }
    }

    pub fn color(&self, hue_offset: f32, saturation: f32) -> Color {
        hsv_to_color(self.hue + hue_offset, saturation, 1.0)
    }
}

pub fn pulse_amplitude(frame: u64, playing: bool) -> f32 {
    if playing {
        ((frame as f32 * PULSE_RATE).sin() + 1.0) / 2.0
    } else {
        RESTING_PULSE
    }
}

pub fn intensity(active_line: Option<&str>) -> f32 {
    active_line.map_or(0, |line| line.chars().count() % INTENSITY_RANGE) as f32
}

pub fn hue(progress_ms: u64, frame: u64) -> f32 {
    let from_progress = (progress_ms / 10) % 360;
    ((from_progress + frame % 360) % 360) as f32
}

pub fn angle(progress_ms: u64, frame: u64) -> f32 {
    (progress_ms as f64 / 1000.0 * 0.02 + frame as f64 * SPIN_RATE as f64) as f32
}

pub fn radius(intensity: f32, pulse: f32) -> f32 {
    (30.0 + intensity) * (0.5 + pulse)
}

pub fn hsv_to_color(hue: f32, saturation: f32, value: f32) -> Color {
    let h = hue.rem_euclid(360.0) / 60.0;
    let c = value * saturation.clamp(0.0, 1.0);
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = value - c;
    let to_u8 = |v: f32| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    Color::Rgb(to_u8(r), to_u8(g), to_u8(b))
}
