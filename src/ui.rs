use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
    Frame,
};

use crate::{
    channel::{AnimationInput, PlaybackStatus},
    controls::{controls_height, draw_controls},
    now_playing::{draw_art_overlay, draw_now_playing_bar, ArtPixels, NOW_PLAYING_HEIGHT},
    progress::draw_progress,
    renderer::Renderer,
    theme::{Theme, THEMES},
};

/// Display toggles and the album art for the current track.
pub struct UiState {
    pub theme: usize,
    pub show_lyrics: bool,
    pub show_art: bool,
    pub window_len: usize,
    /// Image URL the pixels were made from.
    pub art: Option<(String, ArtPixels)>,
}

impl UiState {
    pub fn theme(&self) -> &'static Theme {
        &THEMES[self.theme % THEMES.len()]
    }
}

/// Canvas width for a terminal `width` columns wide.
pub fn canvas_cols(term_width: u16, fixed: Option<u16>) -> u16 {
    let available = term_width.saturating_sub(2);
    fixed.map_or(available, |cols| cols.min(available))
}

pub fn draw(frame: &mut Frame, renderer: &Renderer, ui: &UiState) {
    let theme = ui.theme();
    let input = renderer.input();
    let area = frame.area();

    let canvas_h = renderer.surface().rows() + 2;
    let lyrics_h = if ui.show_lyrics { ui.window_len as u16 + 2 } else { 0 };
    let controls_h = controls_height(area.width, ui.show_lyrics, ui.show_art, theme);
    let chunks = Layout::vertical([
        Constraint::Length(NOW_PLAYING_HEIGHT),
        Constraint::Length(canvas_h),
        Constraint::Length(lyrics_h),
        Constraint::Length(3),
        Constraint::Length(controls_h),
        Constraint::Min(0),
    ])
    .split(area);

    draw_now_playing_bar(frame, chunks[0], input, theme);
    draw_canvas(frame, chunks[1], renderer, ui, theme);
    if ui.show_lyrics {
        draw_lyrics(frame, chunks[2], input, theme);
    }
    draw_progress(frame, chunks[3], input.progress_ms, input.duration_ms, theme);
    draw_controls(frame, chunks[4], ui.show_lyrics, ui.show_art, theme);
}

fn status_caption(input: &AnimationInput) -> Option<&'static str> {
    match input.status {
        PlaybackStatus::Connecting => Some("connecting…"),
        PlaybackStatus::Idle => Some("nothing playing"),
        PlaybackStatus::Disconnected => Some("disconnected"),
        PlaybackStatus::Active if !input.is_playing => Some("paused"),
        PlaybackStatus::Active => None,
    }
}

fn draw_canvas(frame: &mut Frame, area: Rect, renderer: &Renderer, ui: &UiState, theme: &Theme) {
    let input = renderer.input();
    let mut block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(renderer.visual().color(0.0, 0.6)));
    if let Some(caption) = status_caption(input) {
        block = block.title_bottom(
            Line::from(Span::styled(format!(" {caption} "), Style::default().fg(theme.dimmed)))
                .alignment(Alignment::Center),
        );
    }
    frame.render_widget(renderer.widget().block(block), area);

    let current_art = input
        .track
        .as_ref()
        .and_then(|t| t.album_art_url.as_deref());
    if let (true, Some((url, pixels)), Some(current)) = (ui.show_art, ui.art.as_ref(), current_art) {
        if url == current {
            draw_art_overlay(frame, area, pixels);
        }
    }
}

fn lyric_lines<'a>(input: &'a AnimationInput, theme: &Theme) -> Vec<Line<'a>> {
    if input.window.is_empty() {
        let note = match input.status {
            PlaybackStatus::Active if input.lyrics_pending => "Looking up lyrics…",
            PlaybackStatus::Active => "No lyrics found",
            _ => "",
        };
        return vec![Line::styled(note, Style::default().fg(theme.dimmed))];
    }
    input
        .window
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let style = if i == 0 {
                Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(theme.dimmed)
            };
            Line::styled(text.as_str(), style)
        })
        .collect()
}

fn draw_lyrics(frame: &mut Frame, area: Rect, input: &AnimationInput, theme: &Theme) {
    let panel = Paragraph::new(lyric_lines(input, theme))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .title(" Lyrics "),
        );
    frame.render_widget(panel, area);
}
