use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::mapper::DEFAULT_WINDOW_LEN;

/// Directory holding the config file, the log and the album-art cache.
pub fn config_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "tui-lyrics")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".tui-lyrics"))
}

/// Stable short file name for a cache key (e.g. an image URL).
pub fn cache_hash(key: &str) -> String {
    use std::hash::{DefaultHasher, Hash, Hasher};
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Bearer credential for the player API. Usually supplied on the
    /// command line or via `SPOTIFY_TOKEN` rather than the file.
    #[serde(skip_serializing)]
    pub token: Option<String>,
    pub api_base: String,
    pub lyrics_base: String,
    pub request_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub update_interval_ms: u64,
    pub frame_interval_ms: u64,
    pub drift_tolerance_ms: u64,
    pub window_len: usize,
    pub canvas_rows: u16,
    /// Fixed canvas width; follows the terminal when unset.
    pub canvas_cols: Option<u16>,
    pub theme: String,
    pub show_art: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_base: "https://api.spotify.com/v1".into(),
            lyrics_base: "https://api.lyrics.ovh/v1".into(),
            request_timeout_ms: 4_000,
            poll_interval_ms: 5_000,
            update_interval_ms: 500,
            frame_interval_ms: 33,
            drift_tolerance_ms: 1_500,
            window_len: DEFAULT_WINDOW_LEN,
            canvas_rows: 12,
            canvas_cols: None,
            theme: "Default".into(),
            show_art: true,
        }
    }
}

impl AppConfig {
    /// Read `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(?path, "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(err) => return Err(err.into()),
        };
        Self::from_json(&text).map_err(|source| AppError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_json(text: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn default_path() -> PathBuf {
        config_dir().join("config.json")
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(250))
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms.max(10))
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms.clamp(5, 1_000))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let cfg = AppConfig::from_json(r#"{ "poll_interval_ms": 2000, "theme": "Nord" }"#).unwrap();
        assert_eq!(cfg.poll_interval_ms, 2000);
        assert_eq!(cfg.theme, "Nord");
        assert_eq!(cfg.window_len, 4);
        assert_eq!(cfg.update_interval_ms, 500);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = std::env::temp_dir().join(format!("tui-lyrics-cfg-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(AppConfig::load(&path), Err(AppError::Config { .. })));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_file_means_defaults() {
        let path = std::env::temp_dir().join("tui-lyrics-definitely-missing.json");
        assert_eq!(AppConfig::load(&path).unwrap(), AppConfig::default());
    }

    #[test]
    fn intervals_have_floors() {
        let cfg = AppConfig {
            poll_interval_ms: 0,
            frame_interval_ms: 0,
            ..AppConfig::default()
        };
        assert_eq!(cfg.poll_interval(), Duration::from_millis(250));
        assert_eq!(cfg.frame_interval(), Duration::from_millis(5));
    }
}
