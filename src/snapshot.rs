use std::time::{Duration, Instant};

use serde::Deserialize;

use crate::error::PollError;

/// What is playing, independent of where in the track we are.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TrackInfo {
    pub id: String,
    pub name: String,
    pub artists: Vec<String>,
    pub album_art_url: Option<String>,
}

impl TrackInfo {
    pub fn primary_artist(&self) -> &str {
        self.artists.first().map(String::as_str).unwrap_or("")
    }

    pub fn artist_line(&self) -> String {
        self.artists.join(", ")
    }
}

/// One report of remote playback state. Never mutated after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackSnapshot {
    pub track: TrackInfo,
    pub duration_ms: u64,
    pub reported_progress_ms: u64,
    pub is_playing: bool,
    pub fetched_at: Instant,
}

impl TrackSnapshot {
    pub fn track_id(&self) -> &str {
        &self.track.id
    }
}

/// Anything that can be asked "what is playing right now?".
pub trait SnapshotSource: Send + 'static {
    /// `Ok(None)` means nothing is playing.
    fn poll(&mut self) -> Result<Option<TrackSnapshot>, PollError>;
}

#[derive(Debug, Deserialize)]
struct PlayerResponse {
    #[serde(default)]
    is_playing: bool,
    #[serde(default)]
    progress_ms: Option<u64>,
    #[serde(default)]
    item: Option<PlayerItem>,
}

#[derive(Debug, Deserialize)]
struct PlayerItem {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    duration_ms: u64,
    #[serde(default)]
    artists: Vec<NamedEntity>,
    #[serde(default)]
    album: Option<Album>,
}

#[derive(Debug, Deserialize)]
struct NamedEntity {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Album {
    #[serde(default)]
    images: Vec<Image>,
}

#[derive(Debug, Deserialize)]
struct Image {
    url: String,
}

/// Turn a player response body into a snapshot stamped with `fetched_at`.
pub fn parse_player_response(
    body: &str,
    fetched_at: Instant,
) -> Result<Option<TrackSnapshot>, PollError> {
    if body.trim().is_empty() {
        return Ok(None);
    }
    let resp: PlayerResponse = serde_json::from_str(body)
        .map_err(|e| PollError::Transient(format!("malformed player response: {e}")))?;
    let Some(item) = resp.item else {
        return Ok(None);
    };

    let artists: Vec<String> = item.artists.into_iter().map(|a| a.name).collect();
    // Local files and some episodes come without an id.
    let id = item
        .id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| format!("local:{}:{}", artists.first().map(String::as_str).unwrap_or(""), item.name));
    let album_art_url = item
        .album
        .and_then(|a| a.images.into_iter().next())
        .map(|img| img.url);

    Ok(Some(TrackSnapshot {
        track: TrackInfo {
            id,
            name: item.name,
            artists,
            album_art_url,
        },
        duration_ms: item.duration_ms,
        reported_progress_ms: resp.progress_ms.unwrap_or(0),
        is_playing: resp.is_playing,
        fetched_at,
    }))
}

/// Polls the Spotify Web API "get playback state" endpoint.
pub struct SpotifySource {
    agent: ureq::Agent,
    url: String,
    auth_header: String,
}

impl SpotifySource {
    pub fn new(api_base: &str, token: &str, timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        SpotifySource {
            agent,
            url: format!("{}/me/player", api_base.trim_end_matches('/')),
            auth_header: format!("Bearer {token}"),
        }
    }
}

impl SnapshotSource for SpotifySource {
    fn poll(&mut self) -> Result<Option<TrackSnapshot>, PollError> {
        let mut resp = self
            .agent
            .get(self.url.as_str())
            .header("Authorization", self.auth_header.as_str())
            .call()?;
        let fetched_at = Instant::now();
        if resp.status().as_u16() == 204 {
            return Ok(None);
        }
        let body = resp.body_mut().read_to_string()?;
        parse_player_response(&body, fetched_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAYING: &str = r#"{
        "is_playing": true,
        "progress_ms": 50000,
        "item": {
            "id": "4uLU6hMCjMI75M1A2tKUQC",
            "name": "Never Gonna Give You Up",
            "duration_ms": 213000,
            "artists": [{ "name": "Rick Astley" }, { "name": "Someone Else" }],
            "album": { "images": [{ "url": "https://i.scdn.co/image/large" }, { "url": "https://i.scdn.co/image/small" }] }
        }
    }"#;

    #[test]
    fn parses_playing_track() {
        let now = Instant::now();
        let snap = parse_player_response(PLAYING, now).unwrap().unwrap();
        assert_eq!(snap.track_id(), "4uLU6hMCjMI75M1A2tKUQC");
        assert_eq!(snap.duration_ms, 213_000);
        assert_eq!(snap.reported_progress_ms, 50_000);
        assert!(snap.is_playing);
        assert_eq!(snap.fetched_at, now);
        assert_eq!(snap.track.primary_artist(), "Rick Astley");
        assert_eq!(snap.track.artist_line(), "Rick Astley, Someone Else");
        assert_eq!(snap.track.album_art_url.as_deref(), Some("https://i.scdn.co/image/large"));
    }

    #[test]
    fn missing_item_is_nothing_playing() {
        let body = r#"{ "is_playing": false, "progress_ms": null, "item": null }"#;
        assert_eq!(parse_player_response(body, Instant::now()).unwrap(), None);
        assert_eq!(parse_player_response("", Instant::now()).unwrap(), None);
    }

    #[test]
    fn garbage_is_transient() {
        assert!(matches!(
            parse_player_response("<html>", Instant::now()),
            Err(PollError::Transient(_))
        ));
    }

    #[test]
    fn local_file_gets_synthesised_id() {
        let body = r#"{ "is_playing": true, "progress_ms": 10, "item": {
            "id": null, "name": "Demo", "duration_ms": 1000, "artists": [{ "name": "Me" }] } }"#;
        let snap = parse_player_response(body, Instant::now()).unwrap().unwrap();
        assert_eq!(snap.track_id(), "local:Me:Demo");
        assert_eq!(snap.track.album_art_url, None);
    }
}
