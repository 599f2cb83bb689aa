use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
    Frame,
};

use crate::theme::Theme;

fn build_control_spans(show_lyrics: bool, show_art: bool, theme: &Theme) -> Vec<Span<'static>> {
    let key_style = Style::default().fg(Color::Black).bg(theme.secondary);
    let toggle = |on: bool| Style::default().fg(if on { theme.accent } else { Color::Reset });
    vec![
        Span::styled(" l ", key_style),
        Span::styled(if show_lyrics { " Lyrics On  " } else { " Lyrics Off  " }, toggle(show_lyrics)),
        Span::styled(" a ", key_style),
        Span::styled(if show_art { " Art On  " } else { " Art Off  " }, toggle(show_art)),
        Span::styled(" t ", key_style),
        Span::raw(format!(" Theme: {}  ", theme.name)),
        Span::styled(" q ", key_style),
        Span::raw(" Quit"),
    ]
}

/// Wrap spans into lines, breaking at group boundaries (every 2 spans = key + label).
fn wrap_lines(spans: Vec<Span<'static>>, inner_w: usize) -> Vec<Line<'static>> {
    if inner_w == 0 {
        return vec![Line::from(spans)];
    }
    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut current: Vec<Span<'static>> = Vec::new();
    let mut current_w: usize = 0;
    for chunk in spans.chunks(2) {
        let group_w: usize = Line::from(chunk.to_vec()).width();
        if current_w + group_w > inner_w && current_w > 0 {
            lines.push(Line::from(std::mem::take(&mut current)));
            current_w = 0;
        }
        current.extend(chunk.iter().cloned());
        current_w += group_w;
    }
    if !current.is_empty() {
        lines.push(Line::from(current));
    }
    lines
}

pub fn controls_height(width: u16, show_lyrics: bool, show_art: bool, theme: &Theme) -> u16 {
    let spans = build_control_spans(show_lyrics, show_art, theme);
    let lines = wrap_lines(spans, width.saturating_sub(2) as usize);
    lines.len() as u16 + 2 // +2 for borders
}

pub fn draw_controls(frame: &mut Frame, area: Rect, show_lyrics: bool, show_art: bool, theme: &Theme) {
    let spans = build_control_spans(show_lyrics, show_art, theme);
    let lines = wrap_lines(spans, area.width.saturating_sub(2) as usize);
    let help = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .title(" Controls "),
    );
    frame.render_widget(help, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::THEMES;

    #[test]
    fn wide_terminal_fits_one_line() {
        assert_eq!(controls_height(200, true, true, &THEMES[0]), 3);
    }

    #[test]
    fn narrow_terminal_wraps_by_group() {
        let spans = build_control_spans(true, false, &THEMES[0]);
        let lines = wrap_lines(spans, 20);
        assert!(lines.len() >= 3);
        // Every line starts with a key badge.
        assert!(lines.iter().all(|l| l.spans[0].content.starts_with(' ') && l.spans[0].content.len() <= 3));
    }
}
