use std::path::PathBuf;

/// Result alias for application setup and teardown.
pub type Result<T> = std::result::Result<T, AppError>;

/// Why a snapshot poll produced no usable data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PollError {
    /// Credential rejected. Terminal for the session: the poller stops and
    /// the display switches to "disconnected".
    #[error("player API rejected the credential (status {0})")]
    Unauthorized(u16),
    /// Timeout, 5xx, malformed body. The next scheduled poll retries.
    #[error("player API request failed: {0}")]
    Transient(String),
}

impl From<ureq::Error> for PollError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code @ (401 | 403)) => PollError::Unauthorized(code),
            ureq::Error::StatusCode(code) => PollError::Transient(format!("status {code}")),
            other => PollError::Transient(other.to_string()),
        }
    }
}

/// Lyric lookup failures. All of them degrade to an empty lyric document.
#[derive(Debug, thiserror::Error)]
pub enum LyricsError {
    #[error("no lyrics found")]
    NotFound,
    #[error("lyrics request failed: {0}")]
    Transport(#[from] ureq::Error),
    #[error("unexpected lyrics payload: {0}")]
    Malformed(String),
}

impl From<serde_json::Error> for LyricsError {
    fn from(err: serde_json::Error) -> Self {
        LyricsError::Malformed(err.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("invalid config file {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("no access token: pass --token or set SPOTIFY_TOKEN")]
    MissingToken,
}
