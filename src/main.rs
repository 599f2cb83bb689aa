mod channel;
mod config;
mod controls;
mod error;
mod estimator;
mod gauge;
mod lyrics;
mod mapper;
mod now_playing;
mod progress;
mod renderer;
mod session;
mod snapshot;
mod theme;
mod ui;
mod visual;
mod visualizer;

use std::{
    fs,
    path::PathBuf,
    sync::{mpsc, Arc, Mutex},
};

use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::DefaultTerminal;
use tracing_subscriber::EnvFilter;

use crate::{
    config::{config_dir, AppConfig},
    error::{AppError, Result},
    lyrics::WebLyrics,
    now_playing::{spawn_art_fetch, ArtPixels, ART_COLS, ART_ROWS},
    renderer::Renderer,
    session::{Session, SessionConfig},
    snapshot::SpotifySource,
    theme::{next_theme, theme_index},
    ui::{canvas_cols, UiState},
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Live lyrics and visuals for whatever Spotify is playing", long_about = None)]
struct Cli {
    /// Bearer token for the Spotify Web API.
    #[arg(long, env = "SPOTIFY_TOKEN", hide_env_values = true)]
    token: Option<String>,
    /// Config file (JSON). Defaults to config.json in the config directory.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Poll interval in milliseconds.
    #[arg(long)]
    poll_ms: Option<u64>,
    /// Colour theme name.
    #[arg(short, long)]
    theme: Option<String>,
    /// Don't download or show album art.
    #[arg(long)]
    no_art: bool,
    /// Where to write logs. Defaults to tui-lyrics.log in the config directory.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Cli {
    fn apply(&self, cfg: &mut AppConfig) {
        if let Some(token) = &self.token {
            cfg.token = Some(token.clone());
        }
        if let Some(ms) = self.poll_ms {
            cfg.poll_interval_ms = ms;
        }
        if let Some(theme) = &self.theme {
            cfg.theme = theme.clone();
        }
        if self.no_art {
            cfg.show_art = false;
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_file.clone())?;

    let config_path = cli.config.clone().unwrap_or_else(AppConfig::default_path);
    let mut cfg = AppConfig::load(&config_path)?;
    cli.apply(&mut cfg);
    let token = cfg
        .token
        .clone()
        .filter(|t| !t.trim().is_empty())
        .ok_or(AppError::MissingToken)?;

    tracing::info!(?config_path, poll_ms = cfg.poll_interval_ms, "starting");
    let source = SpotifySource::new(&cfg.api_base, token.trim(), cfg.request_timeout());
    let lyric_source = Arc::new(WebLyrics::new(&cfg.lyrics_base, cfg.request_timeout()));
    let session = Session::start(SessionConfig::from(&cfg), source, lyric_source);

    let mut terminal = ratatui::init();
    let result = run(&mut terminal, &cfg, &session);
    ratatui::restore();
    session.shutdown();
    tracing::info!("bye");
    result
}

fn init_tracing(log_file: Option<PathBuf>) -> Result<()> {
    // The terminal belongs to the UI, so logs go to a file.
    let path = log_file.unwrap_or_else(|| config_dir().join("tui-lyrics.log"));
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = fs::OpenOptions::new().create(true).append(true).open(&path)?;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init();
    Ok(())
}

struct App {
    renderer: Renderer,
    ui: UiState,
    art_rx: Option<mpsc::Receiver<(String, ArtPixels)>>,
    art_requested: Option<String>,
    fixed_cols: Option<u16>,
}

impl App {
    fn new(cfg: &AppConfig, session: &Session, term_width: u16) -> Self {
        App {
            renderer: Renderer::new(
                session.subscriber(),
                canvas_cols(term_width, cfg.canvas_cols),
                cfg.canvas_rows.max(1),
            ),
            ui: UiState {
                theme: theme_index(&cfg.theme),
                show_lyrics: true,
                show_art: cfg.show_art,
                window_len: cfg.window_len.max(1),
                art: None,
            },
            art_rx: None,
            art_requested: None,
            fixed_cols: cfg.canvas_cols,
        }
    }

    /// Start an art download when the track's image changes; collect it when
    /// it arrives. Never blocks.
    fn poll_art(&mut self) {
        if let Some(rx) = &self.art_rx {
            if let Ok(art) = rx.try_recv() {
                self.ui.art = Some(art);
                self.art_rx = None;
            }
        }
        if !self.ui.show_art {
            return;
        }
        let wanted = self
            .renderer
            .input()
            .track
            .as_ref()
            .and_then(|t| t.album_art_url.clone());
        if let Some(url) = wanted {
            if self.art_requested.as_deref() != Some(url.as_str()) {
                tracing::debug!(%url, "fetching album art");
                self.art_rx = Some(spawn_art_fetch(url.clone(), ART_COLS, ART_ROWS));
                self.art_requested = Some(url);
            }
        }
    }

    fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return false,
            KeyCode::Char('l') => self.ui.show_lyrics = !self.ui.show_lyrics,
            KeyCode::Char('a') => self.ui.show_art = !self.ui.show_art,
            KeyCode::Char('t') => self.ui.theme = next_theme(self.ui.theme),
            _ => {}
        }
        true
    }
}

fn run(terminal: &mut DefaultTerminal, cfg: &AppConfig, session: &Session) -> Result<()> {
    let size = terminal.size()?;
    let mut app = App::new(cfg, session, size.width);
    let frame_interval = cfg.frame_interval();
    tracing::debug!(surface = app.renderer.surface().id(), cols = app.renderer.surface().cols(), "render loop started");

    loop {
        app.renderer.tick();
        app.poll_art();
        terminal.draw(|f| ui::draw(f, &app.renderer, &app.ui))?;

        if event::poll(frame_interval)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if !app.handle_key(key.code) {
                        break;
                    }
                }
                Event::Resize(width, _) => {
                    app.renderer.resize(canvas_cols(width, app.fixed_cols));
                    tracing::debug!(surface = app.renderer.surface().id(), cols = app.renderer.surface().cols(), "canvas resized");
                }
                _ => {}
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_overrides_file_config() {
        let cli = Cli::parse_from(["tui-lyrics", "--token", "abc", "--poll-ms", "2000", "--theme", "Nord", "--no-art"]);
        let mut cfg = AppConfig::default();
        cli.apply(&mut cfg);
        assert_eq!(cfg.token.as_deref(), Some("abc"));
        assert_eq!(cfg.poll_interval_ms, 2000);
        assert_eq!(cfg.theme, "Nord");
        assert!(!cfg.show_art);
    }

    #[test]
    fn cli_leaves_unset_values_alone() {
        let cli = Cli::parse_from(["tui-lyrics", "--config", "/tmp/x.json"]);
        let mut cfg = AppConfig {
            theme: "Dracula".into(),
            ..AppConfig::default()
        };
        cli.apply(&mut cfg);
        assert_eq!(cfg.theme, "Dracula");
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/x.json")));
    }
}
