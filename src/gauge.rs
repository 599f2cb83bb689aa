use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Color,
    widgets::{Block, Widget},
};

/// One-row bar with rounded ends, used for track progress.
pub struct RoundedGauge<'a> {
    ratio: f64,
    filled_color: Color,
    dimmed_color: Color,
    block: Option<Block<'a>>,
}

impl<'a> RoundedGauge<'a> {
    pub fn new(ratio: f64, filled_color: Color) -> Self {
        RoundedGauge {
            ratio: if ratio.is_nan() { 0.0 } else { ratio.clamp(0.0, 1.0) },
            filled_color,
            dimmed_color: Color::DarkGray,
            block: None,
        }
    }

    pub fn dimmed_color(mut self, color: Color) -> Self {
        self.dimmed_color = color;
        self
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }
}

impl Widget for RoundedGauge<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner = if let Some(block) = self.block {
            let inner = block.inner(area);
            block.render(area, buf);
            inner
        } else {
            area
        };

        if inner.width < 2 || inner.height == 0 {
            return;
        }

        let width = inner.width as usize;
        let filled = (self.ratio * width as f64).round() as usize;
        let y = inner.y;

        for col in 0..width {
            let x = inner.x + col as u16;
            let (ch, fg) = if col < filled {
                if col == 0 {
                    ('╺', self.filled_color)
                } else if col == filled - 1 && filled < width {
                    ('╸', self.filled_color)
                } else {
                    ('━', self.filled_color)
                }
            } else if col == 0 {
                ('╶', self.dimmed_color)
            } else if col == width - 1 {
                ('╴', self.dimmed_color)
            } else {
                ('─', self.dimmed_color)
            };
            buf[(x, y)].set_char(ch).set_fg(fg).set_bg(Color::Reset);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(ratio: f64, width: u16) -> String {
        let area = Rect::new(0, 0, width, 1);
        let mut buf = Buffer::empty(area);
        RoundedGauge::new(ratio, Color::Cyan).render(area, &mut buf);
        (0..width).map(|x| buf[(x, 0)].symbol().to_string()).collect()
    }

    #[test]
    fn empty_bar() {
        assert_eq!(row(0.0, 5), "╶───╴");
    }

    #[test]
    fn half_bar() {
        assert_eq!(row(0.5, 6), "╺━╸──╴");
    }

    #[test]
    fn full_bar() {
        assert_eq!(row(1.0, 4), "╺━━━");
        assert_eq!(row(7.0, 4), "╺━━━");
    }

    #[test]
    fn nan_is_empty() {
        assert_eq!(row(f64::NAN, 3), "╶─╴");
    }
}
