use std::{
    fs,
    path::{Path, PathBuf},
    sync::mpsc,
    thread,
};

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Widget, Wrap},
    Frame,
};

use crate::channel::{AnimationInput, PlaybackStatus};
use crate::config::{cache_hash, config_dir};
use crate::theme::Theme;

pub const ART_ROWS: u16 = 8;
pub const ART_COLS: u16 = ART_ROWS * 2; // 2 cols per row for square aspect
pub const NOW_PLAYING_HEIGHT: u16 = 4;

// Album art pixel grid: rows of (R, G, B) tuples
pub type ArtPixels = Vec<Vec<(u8, u8, u8)>>;

fn art_cache_path(url: &str) -> PathBuf {
    config_dir().join("cache").join("art").join(cache_hash(url))
}

pub fn fetch_album_art(url: &str, cols: u16, rows: u16) -> Option<ArtPixels> {
    let cache_path = art_cache_path(url);
    if let Some(pixels) = load_cached_art(&cache_path, cols, rows) {
        return Some(pixels);
    }
    let bytes = match ureq::get(url).call().and_then(|mut r| r.body_mut().read_to_vec()) {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::debug!(url, "album art download failed: {err}");
            return None;
        }
    };
    let img = match image::load_from_memory(&bytes) {
        Ok(img) => img,
        Err(err) => {
            tracing::debug!(url, "album art is not an image: {err}");
            return None;
        }
    };
    store_cached_art(&cache_path, &bytes);
    Some(to_pixels(&img, cols, rows))
}

/// Decode a cached image. A file that no longer decodes is removed so the
/// next lookup downloads it again.
fn load_cached_art(path: &Path, cols: u16, rows: u16) -> Option<ArtPixels> {
    let bytes = fs::read(path).ok()?;
    match image::load_from_memory(&bytes) {
        Ok(img) => Some(to_pixels(&img, cols, rows)),
        Err(err) => {
            tracing::debug!(?path, "dropping unreadable cached art: {err}");
            if let Err(err) = fs::remove_file(path) {
                tracing::debug!(?path, "could not remove cached art: {err}");
            }
            None
        }
    }
}

fn store_cached_art(path: &Path, bytes: &[u8]) {
    let written = match path.parent() {
        Some(parent) => fs::create_dir_all(parent).and_then(|()| fs::write(path, bytes)),
        None => fs::write(path, bytes),
    };
    if let Err(err) = written {
        tracing::debug!(?path, "could not cache album art: {err}");
    }
}

fn to_pixels(img: &image::DynamicImage, cols: u16, rows: u16) -> ArtPixels {
    let px_w = cols as u32;
    let px_h = (rows as u32) * 2; // half-block = 2 pixels per row
    let rgb = img
        .resize_exact(px_w, px_h, image::imageops::FilterType::Lanczos3)
        .to_rgb8();
    (0..px_h)
        .map(|y| {
            (0..px_w)
                .map(|x| {
                    let p = rgb.get_pixel(x, y);
                    (p[0], p[1], p[2])
                })
                .collect()
        })
        .collect()
}

/// Download (or load from cache) on a worker thread. The receiver yields
/// `(url, pixels)` so a late result for a previous track can be ignored.
pub fn spawn_art_fetch(url: String, cols: u16, rows: u16) -> mpsc::Receiver<(String, ArtPixels)> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        if let Some(pixels) = fetch_album_art(&url, cols, rows) {
            let _ = tx.send((url, pixels));
        }
    });
    rx
}

struct AlbumArtWidget<'a> {
    pixels: &'a [Vec<(u8, u8, u8)>],
}

impl Widget for AlbumArtWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let art_rows = self.pixels.len() / 2;
        let art_cols = self.pixels.first().map(|r| r.len()).unwrap_or(0);
        let rows = (area.height as usize).min(art_rows);
        let cols = (area.width as usize).min(art_cols);
        for cy in 0..rows {
            let top_row = &self.pixels[cy * 2];
            let bot_row = self.pixels.get(cy * 2 + 1).unwrap_or(top_row);
            for cx in 0..cols {
                let (tr, tg, tb) = top_row[cx];
                let (br, bg, bb) = bot_row.get(cx).copied().unwrap_or(top_row[cx]);
                buf[(area.x + cx as u16, area.y + cy as u16)]
                    .set_char('▀')
                    .set_fg(Color::Rgb(tr, tg, tb))
                    .set_bg(Color::Rgb(br, bg, bb));
            }
        }
    }
}

/// Album art in the top-left corner of `area`, inset by 1 cell to sit inside
/// the canvas border.
pub fn draw_art_overlay(frame: &mut Frame, area: Rect, pixels: &ArtPixels) {
    let art_w = ART_COLS.min(area.width.saturating_sub(2));
    let art_h = ART_ROWS.min(area.height.saturating_sub(2));
    if art_w == 0 || art_h == 0 {
        return;
    }
    let art_rect = Rect::new(area.x + 1, area.y + 1, art_w, art_h);
    frame.render_widget(AlbumArtWidget { pixels }, art_rect);
}

fn status_badge(input: &AnimationInput, theme: &Theme) -> Span<'static> {
    let (label, bg) = match input.status {
        PlaybackStatus::Connecting => ("Connecting", theme.dimmed),
        PlaybackStatus::Idle => ("Idle", theme.dimmed),
        PlaybackStatus::Disconnected => ("Disconnected", theme.negative),
        PlaybackStatus::Active if input.is_playing => ("Playing", theme.accent),
        PlaybackStatus::Active => ("Paused", theme.secondary),
    };
    Span::styled(format!(" {label} "), Style::default().fg(Color::Black).bg(bg))
}

/// Two-line bar: status badge + title, then the artists.
pub fn draw_now_playing_bar(frame: &mut Frame, area: Rect, input: &AnimationInput, theme: &Theme) {
    let mut title_spans = vec![status_badge(input, theme), Span::raw("  ")];
    let mut lines = Vec::with_capacity(2);
    match (&input.track, input.status) {
        (_, PlaybackStatus::Disconnected) => {
            title_spans.push(Span::styled(
                "Player API rejected the token",
                Style::default().fg(theme.negative),
            ));
            lines.push(Line::from(title_spans));
            lines.push(Line::styled(
                "         Get a fresh token and restart with --token or SPOTIFY_TOKEN",
                Style::default().fg(theme.dimmed),
            ));
        }
        (Some(track), _) => {
            let mut title_style = Style::default().fg(theme.text).add_modifier(Modifier::BOLD);
            if !input.is_playing {
                title_style = title_style.add_modifier(Modifier::DIM);
            }
            title_spans.push(Span::styled(track.name.clone(), title_style));
            if let Some(idx) = input.active_index {
                title_spans.push(Span::styled(
                    format!("  {}/{}", idx + 1, input.line_count),
                    Style::default().fg(theme.dimmed),
                ));
            }
            lines.push(Line::from(title_spans));
            lines.push(Line::from(vec![
                Span::raw("         "),
                Span::styled(track.artist_line(), Style::default().fg(theme.dimmed)),
            ]));
        }
        (None, PlaybackStatus::Connecting) => {
            title_spans.push(Span::styled("Waiting for the player…", Style::default().fg(theme.dimmed)));
            lines.push(Line::from(title_spans));
        }
        (None, _) => {
            title_spans.push(Span::styled("Nothing playing", Style::default().fg(theme.dimmed)));
            lines.push(Line::from(title_spans));
        }
    }

    let bar = Paragraph::new(lines).wrap(Wrap { trim: true }).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .title(" Now Playing "),
    );
    frame.render_widget(bar, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::THEMES;

    #[test]
    fn pixels_have_requested_shape() {
        let img = image::DynamicImage::new_rgb8(64, 64);
        let px = to_pixels(&img, 16, 8);
        assert_eq!(px.len(), 16);
        assert!(px.iter().all(|row| row.len() == 16));
    }

    #[test]
    fn badge_reflects_state() {
        let theme = &THEMES[0];
        let mut input = AnimationInput {
            status: PlaybackStatus::Active,
            is_playing: true,
            ..AnimationInput::default()
        };
        assert_eq!(status_badge(&input, theme).content, " Playing ");
        input.is_playing = false;
        assert_eq!(status_badge(&input, theme).content, " Paused ");
        input.status = PlaybackStatus::Disconnected;
        assert_eq!(status_badge(&input, theme).content, " Disconnected ");
    }

    #[test]
    fn art_cache_path_is_stable() {
        assert_eq!(art_cache_path("https://a/b.jpg"), art_cache_path("https://a/b.jpg"));
        assert_ne!(art_cache_path("https://a/b.jpg"), art_cache_path("https://a/c.jpg"));
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("tui-lyrics-art-{name}-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn corrupt_cached_art_is_discarded() {
        let dir = scratch_dir("corrupt");
        let path = dir.join("cover");
        fs::write(&path, b"definitely not a jpeg").unwrap();
        assert!(load_cached_art(&path, 16, 8).is_none());
        assert!(!path.exists());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn cached_art_round_trips() {
        let dir = scratch_dir("valid");
        let path = dir.join("nested").join("cover");
        let mut png = std::io::Cursor::new(Vec::new());
        image::DynamicImage::new_rgb8(8, 8)
            .write_to(&mut png, image::ImageFormat::Png)
            .unwrap();
        store_cached_art(&path, png.get_ref());
        let px = load_cached_art(&path, 16, 8).unwrap();
        assert_eq!(px.len(), 16);
        assert!(path.exists());
        let _ = fs::remove_dir_all(&dir);
    }
}
