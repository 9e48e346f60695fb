use std::sync::LazyLock;

use regex::Regex;
use url::Url;

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("hardcoded regex pattern is valid"));
static HYPHEN_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-{2,}").expect("hardcoded regex pattern is valid"));

/// Text fragments only ever seen on interstitials served instead of content.
pub const BLOCK_SIGNATURES: [&str; 2] = ["security check", "too many requests"];

/// Renders arbitrary text as a hyphenated URL path segment.
///
/// Keeps ASCII word characters, whitespace and hyphens, turns whitespace runs
/// into single hyphens, collapses repeated hyphens and trims hyphens at both
/// ends. Case is preserved.
pub fn slugify(input: &str) -> String {
    let kept: String = input
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-' || c.is_whitespace())
        .collect();
    let hyphenated = WHITESPACE_RUN.replace_all(kept.trim(), "-");
    let collapsed = HYPHEN_RUN.replace_all(&hyphenated, "-");
    collapsed.trim_matches('-').to_string()
}

/// Builds `<base>/Info/<slug(song)>-<slug(artist)>/<track_id>`.
pub fn build_track_url(base_url: &str, artist_name: &str, song_name: &str, track_id: &str) -> String {
    format!(
        "{base}/Info/{song}-{artist}/{id}",
        base = base_url.trim_end_matches('/'),
        song = slugify(song_name),
        artist = slugify(artist_name),
        id = track_id.trim()
    )
}

/// Returns true when the page text looks like a rate-limit or challenge page.
pub fn is_block_page(text: &str) -> bool {
    let lowered = text.to_lowercase();
    BLOCK_SIGNATURES
        .iter()
        .any(|signature| lowered.contains(signature))
}

/// Returns the last non-empty path segment of an absolute URL.
///
/// Query strings and fragments are ignored. An URL without path segments
/// yields an empty string.
pub fn last_path_segment(href: &str) -> Result<String, url::ParseError> {
    let url = Url::parse(href.trim())?;
    Ok(url
        .path_segments()
        .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
        .unwrap_or_default()
        .to_string())
}

/// Accepts a bare Spotify track id, a `spotify:track:<id>` URI or an
/// `open.spotify.com/.../track/<id>` URL and returns the id.
pub fn spotify_track_id(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if let Some(id) = input.strip_prefix("spotify:track:") {
        return is_spotify_id(id).then(|| id.to_string());
    }

    if let Ok(url) = Url::parse(input) {
        if !url.host_str()?.ends_with("spotify.com") {
            return None;
        }
        let segments: Vec<&str> = url.path_segments()?.collect();
        let position = segments.iter().position(|s| *s == "track")?;
        let id = segments.get(position + 1)?;
        return is_spotify_id(id).then(|| id.to_string());
    }

    is_spotify_id(input).then(|| input.to_string())
}

fn is_spotify_id(candidate: &str) -> bool {
    !candidate.is_empty() && candidate.chars().all(|c| c.is_ascii_alphanumeric())
}
