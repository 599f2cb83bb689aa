use std::f32::consts::TAU;
use std::sync::atomic::{AtomicU64, Ordering};

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Color,
    widgets::{Block, Widget},
};

use crate::visual::VisualState;

// Braille dot positions per character cell (2 wide x 4 tall):
//   col0: bits 0,1,2,6  (top to bottom)
//   col1: bits 3,4,5,7  (top to bottom)
const BRAILLE_BASE: u32 = 0x2800;
const BRAILLE_DOTS: [[u8; 4]; 2] = [
    [0x01, 0x02, 0x04, 0x40], // left column
    [0x08, 0x10, 0x20, 0x80], // right column
];

/// Scene height the geometry constants are tuned for, in dots.
const SCENE_HEIGHT: f32 = 300.0;

static NEXT_SURFACE_ID: AtomicU64 = AtomicU64::new(1);

/// The drawable region: a braille dot grid with a colour per cell.
///
/// Created once per session. Resizing reuses the same buffers and keeps the
/// id, so "is this still the same surface" is a cheap comparison.
pub struct Surface {
    id: u64,
    cols: u16,
    rows: u16,
    dots: Vec<u8>,
    colors: Vec<Color>,
}

impl Surface {
    pub fn new(cols: u16, rows: u16) -> Self {
        let cells = cols as usize * rows as usize;
        Surface {
            id: NEXT_SURFACE_ID.fetch_add(1, Ordering::Relaxed),
            cols,
            rows,
            dots: vec![0; cells],
            colors: vec![Color::Reset; cells],
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn cols(&self) -> u16 {
        self.cols
    }

    pub fn rows(&self) -> u16 {
        self.rows
    }

    /// Change the width in place. Height is fixed for the session.
    pub fn resize(&mut self, cols: u16) {
        if cols == self.cols {
            return;
        }
        self.cols = cols;
        let cells = cols as usize * self.rows as usize;
        self.dots.resize(cells, 0);
        self.colors.resize(cells, Color::Reset);
        self.clear();
    }

    pub fn clear(&mut self) {
        self.dots.fill(0);
        self.colors.fill(Color::Reset);
    }

    fn dot_width(&self) -> i32 {
        self.cols as i32 * 2
    }

    fn dot_height(&self) -> i32 {
        self.rows as i32 * 4
    }

    pub fn plot(&mut self, px: i32, py: i32, color: Color) {
        if px < 0 || py < 0 || px >= self.dot_width() || py >= self.dot_height() {
            return;
        }
        let (px, py) = (px as usize, py as usize);
        let cell = (py / 4) * self.cols as usize + px / 2;
        self.dots[cell] |= BRAILLE_DOTS[px % 2][py % 4];
        self.colors[cell] = color;
    }

    /// Glyph and colour for a cell, `None` when nothing was plotted there.
    pub fn cell(&self, col: u16, row: u16) -> Option<(char, Color)> {
        if col >= self.cols || row >= self.rows {
            return None;
        }
        let idx = row as usize * self.cols as usize + col as usize;
        let dots = self.dots[idx];
        if dots == 0 {
            return None;
        }
        let ch = char::from_u32(BRAILLE_BASE + dots as u32).unwrap_or(' ');
        Some((ch, self.colors[idx]))
    }

    #[cfg(test)]
    pub fn lit_cells(&self) -> usize {
        self.dots.iter().filter(|&&d| d != 0).count()
    }

    /// Rasterise the scene for one frame: two tilted rings that pulse with the
    /// beat and a ring of wobbling blocks around them.
    pub fn paint(&mut self, visual: &VisualState, frame: u64) {
        self.clear();
        let w = self.dot_width();
        let h = self.dot_height();
        if w == 0 || h == 0 {
            return;
        }
        let cx = w as f32 / 2.0;
        let cy = h as f32 / 2.0;
        let scale = h as f32 / SCENE_HEIGHT;
        let angle = visual.angle;
        let pulse = visual.pulse_amplitude;
        // Fake the slow 3D tumble by squashing each axis.
        let squash_x = (angle * 0.5).cos().abs().max(0.2);
        let squash_y = (angle * 0.25).cos().abs().max(0.2);

        for ring in 0..2 {
            let r = visual.radius * (1.0 + ring as f32 * 0.5) * scale;
            let spin = angle * (0.3 + ring as f32 * 0.2);
            let color = visual.color(ring as f32 * 30.0, 1.0);
            let thickness = 1 + (pulse * 2.0).round() as i32;
            let steps = ((r * TAU) as usize).clamp(24, 720);
            for step in 0..steps {
                let t = step as f32 / steps as f32 * TAU;
                let (sin, cos) = (t + spin).sin_cos();
                for layer in 0..thickness {
                    let rr = r + layer as f32;
                    let x = cx + rr * cos * squash_x;
                    let y = cy + rr * sin * squash_y;
                    self.plot(x.round() as i32, y.round() as i32, color);
                }
            }
        }

        let segments = 8.max((visual.intensity / 2.0) as usize);
        for seg in 0..segments {
            let seg_angle = seg as f32 / segments as f32 * TAU + angle;
            let wobble = smooth_noise(seg as f32 * 0.3, frame as f32 * 0.02);
            let ray = (h as f32 / 2.0 - 40.0 * scale).max(1.0) * (0.4 + wobble * 0.6);
            let x = cx + ray * seg_angle.cos() * squash_x;
            let y = cy + ray * seg_angle.sin() * squash_y;
            let size = ((10.0 + pulse * 20.0) * scale).max(1.0) as i32;
            let color = visual.color(seg as f32 * (360.0 / segments as f32), 0.8);
            let half = size / 2;
            for dy in -half..=half {
                for dx in -half..=half {
                    self.plot(x.round() as i32 + dx, y.round() as i32 + dy, color);
                }
            }
        }
    }
}

/// Cheap deterministic stand-in for Perlin noise, in `[0, 1]`.
fn smooth_noise(a: f32, b: f32) -> f32 {
    let v = (a * 2.1 + b).sin() * 0.6 + (a * 3.7 - b * 1.3).sin() * 0.4;
    (v * 0.5 + 0.5).clamp(0.0, 1.0)
}

/// Copies a [`Surface`] into the terminal buffer.
pub struct ArtWidget<'a> {
    surface: &'a Surface,
    block: Option<Block<'a>>,
}

impl<'a> ArtWidget<'a> {
    pub fn new(surface: &'a Surface) -> Self {
        ArtWidget {
            surface,
            block: None,
        }
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }
}

impl Widget for ArtWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner = if let Some(block) = self.block {
            let inner = block.inner(area);
            block.render(area, buf);
            inner
        } else {
            area
        };

        let cols = inner.width.min(self.surface.cols());
        let rows = inner.height.min(self.surface.rows());
        // Centre the surface when the area is wider than it.
        let x0 = inner.x + (inner.width - cols) / 2;
        let y0 = inner.y + (inner.height - rows) / 2;
        for row in 0..rows {
            for col in 0..cols {
                if let Some((ch, color)) = self.surface.cell(col, row) {
                    buf[(x0 + col, y0 + row)].set_char(ch).set_fg(color);
                }
            }
        }
    }
}
