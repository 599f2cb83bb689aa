use ratatui::{
    layout::{Alignment, Rect},
    text::Line,
    widgets::{Block, BorderType, Borders},
    Frame,
};

use crate::gauge::RoundedGauge;
use crate::theme::Theme;

pub fn format_ms(ms: u64) -> String {
    let secs = ms / 1000;
    format!("{}:{:02}", secs / 60, secs % 60)
}

pub fn progress_label(elapsed_ms: u64, total_ms: u64) -> String {
    if total_ms == 0 {
        format_ms(elapsed_ms)
    } else {
        format!("{} / {}", format_ms(elapsed_ms), format_ms(total_ms))
    }
}

pub fn progress_ratio(elapsed_ms: u64, total_ms: u64) -> f64 {
    if total_ms == 0 {
        0.0
    } else {
        (elapsed_ms as f64 / total_ms as f64).min(1.0)
    }
}

pub fn draw_progress(frame: &mut Frame, area: Rect, elapsed_ms: u64, total_ms: u64, theme: &Theme) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title(" Progress ")
        .title(
            Line::from(format!(" {} ", progress_label(elapsed_ms, total_ms))).alignment(Alignment::Right),
        );

    let gauge = RoundedGauge::new(progress_ratio(elapsed_ms, total_ms), theme.accent)
        .dimmed_color(theme.dimmed)
        .block(block);
    frame.render_widget(gauge, area);
}
