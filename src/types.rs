use std::path::PathBuf;

use scraper::Html;
use serde::{Deserialize, Serialize, Serializer, ser::SerializeMap};
use tabled::Tabled;

/// Input of a single scrape invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeRequest {
    pub artist_name: String,
    pub song_name: String,
    pub track_id: String,
}

impl ScrapeRequest {
    /// Builds a request, rejecting blank fields.
    ///
    /// The track identifier is otherwise opaque: a malformed one produces a
    /// URL that fails to resolve and surfaces as an extraction failure.
    pub fn new(artist_name: &str, song_name: &str, track_id: &str) -> Result<Self, String> {
        for (label, value) in [
            ("artist name", artist_name),
            ("song name", song_name),
            ("track identifier", track_id),
        ] {
            if value.trim().is_empty() {
                return Err(format!("{} cannot be empty", label));
            }
        }

        Ok(Self {
            artist_name: artist_name.trim().to_string(),
            song_name: song_name.trim().to_string(),
            track_id: track_id.trim().to_string(),
        })
    }
}

/// The fixed attribute schema read from a track page.
///
/// Numeric fields stay raw text; missing fields are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackAttributes {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub key: String,
    pub camelot: String,
    pub bpm: String,
    pub duration: String,
    pub release_date: String,
    pub explicit: bool,
    pub popularity: String,
    pub energy: String,
    pub danceability: String,
    pub happiness: String,
    pub acousticness: String,
    pub instrumentalness: String,
    pub liveness: String,
    pub speechiness: String,
    pub loudness: String,
    pub album_art: String,
    pub recommendations: Vec<RecommendationEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationEntry {
    pub title: String,
    pub artist: String,
    pub track_id: String,
    pub key: String,
    pub bpm: String,
    pub camelot: String,
    pub popularity: String,
    pub album_art: String,
}

/// Outcome of one scrape invocation. Exactly one variant is produced.
///
/// `source_url` is absent on failures raised before navigation started
/// (for instance when no browser could be launched).
#[derive(Debug, Clone, PartialEq)]
pub enum ScrapeResult {
    Success {
        source_url: String,
        data: TrackAttributes,
        screenshot: PathBuf,
    },
    Failure {
        source_url: Option<String>,
        error: String,
        screenshot: PathBuf,
    },
}

impl ScrapeResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ScrapeResult::Success { .. })
    }

    pub fn source_url(&self) -> Option<&str> {
        match self {
            ScrapeResult::Success { source_url, .. } => Some(source_url),
            ScrapeResult::Failure { source_url, .. } => source_url.as_deref(),
        }
    }

    pub fn data(&self) -> Option<&TrackAttributes> {
        match self {
            ScrapeResult::Success { data, .. } => Some(data),
            ScrapeResult::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ScrapeResult::Success { .. } => None,
            ScrapeResult::Failure { error, .. } => Some(error),
        }
    }

    pub fn screenshot(&self) -> &PathBuf {
        match self {
            ScrapeResult::Success { screenshot, .. } | ScrapeResult::Failure { screenshot, .. } => {
                screenshot
            }
        }
    }
}

// Wire shape: {success, sourceUrl?, data, error?, screenshot}. A failure that
// reached the page carries an empty `data` object, one raised before navigation
// carries neither `sourceUrl` nor `data`.
impl Serialize for ScrapeResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        match self {
            ScrapeResult::Success {
                source_url, data, ..
            } => {
                map.serialize_entry("success", &true)?;
                map.serialize_entry("sourceUrl", source_url)?;
                map.serialize_entry("data", data)?;
            }
            ScrapeResult::Failure {
                source_url, error, ..
            } => {
                map.serialize_entry("success", &false)?;
                if let Some(source_url) = source_url {
                    map.serialize_entry("sourceUrl", source_url)?;
                    map.serialize_entry("data", &serde_json::Map::new())?;
                }
                map.serialize_entry("error", error)?;
            }
        }
        map.serialize_entry("screenshot", &self.screenshot().display().to_string())?;
        map.end()
    }
}

/// Rendered page content captured after navigation settled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSnapshot {
    pub html: String,
    /// Visible text of the body, one block per line.
    pub text: String,
}

impl PageSnapshot {
    pub fn new(html: String, text: String) -> Self {
        Self { html, text }
    }

    /// Builds a snapshot whose text is derived from the markup itself.
    ///
    /// Text nodes are joined with newlines, skipping script and style content.
    /// Used when the browser cannot report `innerText`, and by tests.
    pub fn from_html(html: &str) -> Self {
        Self {
            html: html.to_string(),
            text: visible_text(&Html::parse_document(html)),
        }
    }
}

pub fn visible_text(document: &Html) -> String {
    let mut lines: Vec<&str> = Vec::new();
    for node in document.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };

        let hidden = node
            .parent()
            .and_then(|parent| parent.value().as_element().map(|el| el.name().to_string()))
            .map(|name| matches!(name.as_str(), "script" | "style" | "noscript" | "template" | "title"))
            .unwrap_or(false);
        if hidden {
            continue;
        }

        let trimmed = text.trim();
        if !trimmed.is_empty() {
            lines.push(trimmed);
        }
    }
    lines.join("\n")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlbumArtist {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlbumImage {
    pub url: String,
    pub height: Option<u32>,
    pub width: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackAlbum {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub images: Vec<AlbumImage>,
}

/// Subset of the Spotify `GET /tracks/{id}` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub name: String,
    pub artists: Vec<AlbumArtist>,
    pub album: TrackAlbum,
}

impl TryFrom<&Track> for ScrapeRequest {
    type Error = String;

    fn try_from(track: &Track) -> Result<Self, Self::Error> {
        let artist = track
            .artists
            .first()
            .map(|artist| artist.name.as_str())
            .unwrap_or_default();
        ScrapeRequest::new(artist, &track.name, &track.id)
    }
}

#[derive(Tabled)]
pub struct AttributeTableRow {
    pub field: String,
    pub value: String,
}

#[derive(Tabled)]
pub struct RecommendationTableRow {
    pub title: String,
    pub artist: String,
    pub key: String,
    pub bpm: String,
    pub camelot: String,
    pub popularity: String,
    pub track_id: String,
}

impl From<&RecommendationEntry> for RecommendationTableRow {
    fn from(entry: &RecommendationEntry) -> Self {
        Self {
            title: entry.title.clone(),
            artist: entry.artist.clone(),
            key: entry.key.clone(),
            bpm: entry.bpm.clone(),
            camelot: entry.camelot.clone(),
            popularity: entry.popularity.clone(),
            track_id: entry.track_id.clone(),
        }
    }
}

impl TrackAttributes {
    /// Flattens the scalar fields into `field | value` rows for display.
    pub fn table_rows(&self) -> Vec<AttributeTableRow> {
        let explicit = if self.explicit { "Yes" } else { "No" };
        [
            ("Title", self.title.as_str()),
            ("Artist", self.artist.as_str()),
            ("Album", self.album.as_str()),
            ("Key", self.key.as_str()),
            ("Camelot", self.camelot.as_str()),
            ("BPM", self.bpm.as_str()),
            ("Duration", self.duration.as_str()),
            ("Release Date", self.release_date.as_str()),
            ("Explicit", explicit),
            ("Popularity", self.popularity.as_str()),
            ("Energy", self.energy.as_str()),
            ("Danceability", self.danceability.as_str()),
            ("Happiness", self.happiness.as_str()),
            ("Acousticness", self.acousticness.as_str()),
            ("Instrumentalness", self.instrumentalness.as_str()),
            ("Liveness", self.liveness.as_str()),
            ("Speechiness", self.speechiness.as_str()),
            ("Loudness", self.loudness.as_str()),
            ("Album Art", self.album_art.as_str()),
        ]
        .into_iter()
        .map(|(field, value)| AttributeTableRow {
            field: field.to_string(),
            value: value.to_string(),
        })
        .collect()
    }
}
