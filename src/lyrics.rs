use std::time::Duration;

use crate::error::LyricsError;

/// Lyric sheet for one track. No lines means no lyrics, not a failure.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LyricDocument {
    pub track_id: String,
    pub lines: Vec<String>,
}

impl LyricDocument {
    pub fn empty(track_id: impl Into<String>) -> Self {
        LyricDocument {
            track_id: track_id.into(),
            lines: Vec::new(),
        }
    }
}

/// Trim every line and drop the blank ones.
pub fn normalize_lines(blob: &str) -> Vec<String> {
    blob.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Anything that can look up plain lyrics by title and artist.
pub trait LyricSource: Send + Sync + 'static {
    fn fetch_lines(&self, title: &str, artist: &str) -> Result<Vec<String>, LyricsError>;
}

/// Fetch a sheet, mapping every failure to an empty document.
pub fn acquire(source: &dyn LyricSource, track_id: &str, title: &str, artist: &str) -> LyricDocument {
    match source.fetch_lines(title, artist) {
        Ok(lines) => {
            tracing::debug!(track_id, lines = lines.len(), "lyrics loaded");
            LyricDocument {
                track_id: track_id.to_string(),
                lines,
            }
        }
        Err(LyricsError::NotFound) => {
            tracing::debug!(track_id, title, artist, "no lyrics found");
            LyricDocument::empty(track_id)
        }
        Err(err) => {
            tracing::warn!(track_id, title, artist, "lyrics lookup failed: {err}");
            LyricDocument::empty(track_id)
        }
    }
}

/// lyrics.ovh first, then a Genius search and page scrape.
pub struct WebLyrics {
    agent: ureq::Agent,
    ovh_base: String,
}

impl WebLyrics {
    pub fn new(ovh_base: &str, timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        WebLyrics {
            agent,
            ovh_base: ovh_base.trim_end_matches('/').to_string(),
        }
    }

    fn get_text(&self, url: &str) -> Result<String, LyricsError> {
        let mut resp = self.agent.get(url).call().map_err(|err| match err {
            ureq::Error::StatusCode(404) => LyricsError::NotFound,
            other => LyricsError::Transport(other),
        })?;
        Ok(resp.body_mut().read_to_string()?)
    }

    fn fetch_ovh(&self, artist: &str, title: &str) -> Result<String, LyricsError> {
        let url = format!("{}/{}/{}", self.ovh_base, url_encode(artist), url_encode(title));
        let json: serde_json::Value = serde_json::from_str(&self.get_text(&url)?)?;
        let text = json
            .get("lyrics")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .unwrap_or_default();
        if text.is_empty() {
            Err(LyricsError::NotFound)
        } else {
            Ok(text.to_string())
        }
    }

    fn fetch_genius(&self, artist: &str, title: &str) -> Result<String, LyricsError> {
        let query = if artist.is_empty() {
            title.to_string()
        } else {
            format!("{title} {artist}")
        };
        let search_url = format!("https://genius.com/api/search?q={}", url_encode(&query));
        let json: serde_json::Value = serde_json::from_str(&self.get_text(&search_url)?)?;
        let hits = json
            .pointer("/response/hits")
            .and_then(|v| v.as_array())
            .ok_or_else(|| LyricsError::Malformed("search response without hits".into()))?;

        let song_url = pick_genius_hit(hits, artist)
            .ok_or(LyricsError::NotFound)?
            .to_string();

        let page = self.get_text(&song_url)?;
        let text = extract_genius_lyrics(&page);
        if text.is_empty() {
            Err(LyricsError::NotFound)
        } else {
            Ok(text)
        }
    }
}

impl LyricSource for WebLyrics {
    fn fetch_lines(&self, title: &str, artist: &str) -> Result<Vec<String>, LyricsError> {
        let blob = match self.fetch_ovh(artist, title) {
            Ok(blob) => blob,
            Err(err) => {
                tracing::debug!(title, artist, "lyrics.ovh miss ({err}), trying genius");
                self.fetch_genius(artist, title)?
            }
        };
        let lines = normalize_lines(&blob);
        if lines.is_empty() {
            Err(LyricsError::NotFound)
        } else {
            Ok(lines)
        }
    }
}

/// Song page URL of the first hit whose primary artist matches `artist`.
/// With no artist to match, the top hit is taken.
fn pick_genius_hit<'a>(hits: &'a [serde_json::Value], artist: &str) -> Option<&'a str> {
    let wanted = artist.to_lowercase();
    hits.iter()
        .filter_map(|hit| hit.get("result"))
        .find(|result| {
            wanted.is_empty()
                || result
                    .pointer("/primary_artist/name")
                    .and_then(|v| v.as_str())
                    .is_some_and(|name| name.to_lowercase().contains(&wanted))
        })
        .and_then(|result| result.get("url"))
        .and_then(|v| v.as_str())
}

fn url_encode(s: &str) -> String {
    let mut out = String::new();
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char);
            }
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}

/// Pull the text out of every `data-lyrics-container` div on a song page.
fn extract_genius_lyrics(page: &str) -> String {
    let mut lyrics = String::new();
    let marker = "data-lyrics-container=\"true\"";
    let mut search_from = 0;
    while let Some(pos) = page[search_from..].find(marker) {
        let abs = search_from + pos;
        let content_start = match page[abs..].find('>') {
            Some(p) => abs + p + 1,
            None => break,
        };
        // Matching </div>, accounting for nested divs
        let mut depth = 1;
        let mut i = content_start;
        while i < page.len() && depth > 0 {
            if page[i..].starts_with("</div>") {
                depth -= 1;
                if depth == 0 {
                    break;
                }
                i += 6;
            } else if page[i..].starts_with("<div") {
                depth += 1;
                i += 4;
            } else {
                i += page[i..].chars().next().map_or(1, |c| c.len_utf8());
            }
        }
        let text = html_to_text(&page[content_start..i]);
        if !text.is_empty() {
            if !lyrics.is_empty() {
                lyrics.push('\n');
            }
            lyrics.push_str(&text);
        }
        search_from = i;
    }
    strip_genius_header(lyrics.trim())
}

// Genius often prepends "12 ContributorsSong Title Lyrics" to the first block.
fn strip_genius_header(text: &str) -> String {
    if let Some(pos) = text.find(" Lyrics") {
        let before = &text[..pos];
        if before.contains("Contributor") {
            return text[pos + " Lyrics".len()..].trim().to_string();
        }
    }
    text.to_string()
}

fn html_to_text(html: &str) -> String {
    let mut out = String::new();
    let mut in_tag = false;
    let mut tag_buf = String::new();
    let mut entity_buf = String::new();
    let mut in_entity = false;

    for ch in html.chars() {
        if in_entity {
            entity_buf.push(ch);
            if ch == ';' {
                out.push_str(&decode_entity(&entity_buf));
                entity_buf.clear();
                in_entity = false;
            } else if entity_buf.len() > 10 {
                out.push_str(&entity_buf);
                entity_buf.clear();
                in_entity = false;
            }
        } else if in_tag {
            tag_buf.push(ch);
            if ch == '>' {
                if tag_buf.to_lowercase().starts_with("<br") {
                    out.push('\n');
                }
                tag_buf.clear();
                in_tag = false;
            }
        } else if ch == '<' {
            in_tag = true;
            tag_buf.clear();
            tag_buf.push(ch);
        } else if ch == '&' {
            in_entity = true;
            entity_buf.clear();
            entity_buf.push(ch);
        } else {
            out.push(ch);
        }
    }
    if in_entity {
        out.push_str(&entity_buf);
    }
    out
}

fn decode_entity(entity: &str) -> String {
    match entity {
        "&amp;" => "&".into(),
        "&lt;" => "<".into(),
        "&gt;" => ">".into(),
        "&quot;" => "\"".into(),
        "&apos;" | "&#x27;" => "'".into(),
        "&nbsp;" => " ".into(),
        _ => entity
            .strip_prefix("&#")
            .and_then(|rest| rest.strip_suffix(';'))
            .and_then(|num| match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok(),
                None => num.parse::<u32>().ok(),
            })
            .and_then(char::from_u32)
            .map(|c| c.to_string())
            .unwrap_or_else(|| entity.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Result<Vec<String>, fn() -> LyricsError>);

    impl LyricSource for Fixed {
        fn fetch_lines(&self, _title: &str, _artist: &str) -> Result<Vec<String>, LyricsError> {
            self.0.clone().map_err(|make| make())
        }
    }

    #[test]
    fn normalizes_blob() {
        let blob = "  Never gonna give you up \r\n\n\n   Never gonna let you down\n\t\n";
        assert_eq!(
            normalize_lines(blob),
            vec!["Never gonna give you up", "Never gonna let you down"]
        );
        assert!(normalize_lines("\n \n").is_empty());
    }

    #[test]
    fn failures_degrade_to_empty_document() {
        let miss = Fixed(Err(|| LyricsError::NotFound));
        assert_eq!(acquire(&miss, "t1", "Song", "Artist"), LyricDocument::empty("t1"));

        let broken = Fixed(Err(|| LyricsError::Malformed("bad".into())));
        assert_eq!(acquire(&broken, "t2", "Song", "Artist"), LyricDocument::empty("t2"));
    }

    #[test]
    fn success_is_tagged_with_track() {
        let ok = Fixed(Ok(vec!["one".into(), "two".into()]));
        let doc = acquire(&ok, "t3", "Song", "Artist");
        assert_eq!(doc.track_id, "t3");
        assert_eq!(doc.lines.len(), 2);
    }

    fn hit(artist: &str, url: &str) -> serde_json::Value {
        serde_json::json!({ "result": { "primary_artist": { "name": artist }, "url": url } })
    }

    #[test]
    fn genius_hit_must_match_artist() {
        let hits = vec![hit("Other", "https://genius.com/other"), hit("The Band", "https://genius.com/band")];
        assert_eq!(pick_genius_hit(&hits, "band"), Some("https://genius.com/band"));
        assert_eq!(pick_genius_hit(&hits[..1], "Band"), None);
        assert_eq!(pick_genius_hit(&[], "Band"), None);
    }

    #[test]
    fn genius_hit_without_artist_takes_top_result() {
        let hits = vec![hit("Other", "https://genius.com/other")];
        assert_eq!(pick_genius_hit(&hits, ""), Some("https://genius.com/other"));
    }

    #[test]
    fn first_line_mentioning_lyrics_is_kept() {
        let text = "Sing the Lyrics to me\nSecond line";
        assert_eq!(strip_genius_header(text), text);
        assert_eq!(strip_genius_header("5 ContributorsSong Lyrics\nFirst"), "First");
    }

    #[test]
    fn url_encoding() {
        assert_eq!(url_encode("AC/DC"), "AC%2FDC");
        assert_eq!(url_encode("Rock & Roll"), "Rock%20%26%20Roll");
    }

    #[test]
    fn decodes_entities() {
        assert_eq!(decode_entity("&amp;"), "&");
        assert_eq!(decode_entity("&#39;"), "'");
        assert_eq!(decode_entity("&#x41;"), "A");
        assert_eq!(decode_entity("&bogus;"), "&bogus;");
        assert_eq!(decode_entity("&;"), "&;");
    }

    #[test]
    fn scrapes_genius_page() {
        let page = r#"<html><div class="x" data-lyrics-container="true">3 ContributorsSong Lyrics[Verse 1]<br/>Hello <i>there</i><div>nested</div><br>It&#x27;s me</div>
            <div data-lyrics-container="true">Second &amp; last</div></html>"#;
        let text = extract_genius_lyrics(page);
        assert_eq!(
            normalize_lines(&text),
            vec!["[Verse 1]", "Hello therenested", "It's me", "Second & last"]
        );
    }
}
