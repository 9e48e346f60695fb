//! Field extraction from a rendered track page.
//!
//! Two passes run over a [`PageSnapshot`]:
//!
//! 1. A structural pass reads title, artist and album from the first element
//!    matching an ordered list of selectors.
//! 2. A pattern pass searches the visible text with an ordered table of
//!    regular expressions per field. The labeled form ("Key: F Minor") comes
//!    first, the bare form ("120 BPM") second, and the first match wins.
//!
//! A page where the structural pass finds nothing yields no record at all.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};

use crate::types::{PageSnapshot, TrackAttributes};

use super::recommendations;

const TITLE_SELECTORS: [&str; 3] = ["h1", "[class*=\"title\"]", "[class*=\"name\"]"];
const ARTIST_SELECTORS: [&str; 2] = ["[class*=\"artist\"]", "[class*=\"performer\"]"];
const ALBUM_SELECTORS: [&str; 1] = ["[class*=\"album\"]"];

static TITLE: LazyLock<Vec<Selector>> = LazyLock::new(|| selectors(&TITLE_SELECTORS));
static ARTIST: LazyLock<Vec<Selector>> = LazyLock::new(|| selectors(&ARTIST_SELECTORS));
static ALBUM: LazyLock<Vec<Selector>> = LazyLock::new(|| selectors(&ALBUM_SELECTORS));
static IMAGE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img").expect("hardcoded selector is valid"));

static EXPLICIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Explicit:\s*Yes").expect("hardcoded regex pattern is valid"));

fn selectors(candidates: &[&str]) -> Vec<Selector> {
    candidates
        .iter()
        .map(|css| Selector::parse(css).expect("hardcoded selector is valid"))
        .collect()
}

/// Fields read by the pattern pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Key,
    Camelot,
    Bpm,
    Duration,
    ReleaseDate,
    Popularity,
    Energy,
    Danceability,
    Happiness,
    Acousticness,
    Instrumentalness,
    Liveness,
    Speechiness,
    Loudness,
}

impl Field {
    fn slot<'a>(&self, attrs: &'a mut TrackAttributes) -> &'a mut String {
        match self {
            Field::Key => &mut attrs.key,
            Field::Camelot => &mut attrs.camelot,
            Field::Bpm => &mut attrs.bpm,
            Field::Duration => &mut attrs.duration,
            Field::ReleaseDate => &mut attrs.release_date,
            Field::Popularity => &mut attrs.popularity,
            Field::Energy => &mut attrs.energy,
            Field::Danceability => &mut attrs.danceability,
            Field::Happiness => &mut attrs.happiness,
            Field::Acousticness => &mut attrs.acousticness,
            Field::Instrumentalness => &mut attrs.instrumentalness,
            Field::Liveness => &mut attrs.liveness,
            Field::Speechiness => &mut attrs.speechiness,
            Field::Loudness => &mut attrs.loudness,
        }
    }
}

/// Ordered patterns for one field. Capture group 1 is the value.
pub struct FieldPatterns {
    pub field: Field,
    pub patterns: Vec<Regex>,
}

fn field(field: Field, patterns: &[&str]) -> FieldPatterns {
    FieldPatterns {
        field,
        patterns: patterns
            .iter()
            .map(|p| Regex::new(p).expect("hardcoded regex pattern is valid"))
            .collect(),
    }
}

fn percentage(target: Field, label: &str) -> FieldPatterns {
    field(
        target,
        &[
            format!(r"(?i)\b{label}:\s*(\d{{1,3}})").as_str(),
            format!(r"(?i)\b(\d{{1,3}})\s*{label}\b").as_str(),
        ],
    )
}

static FIELD_PATTERNS: LazyLock<Vec<FieldPatterns>> = LazyLock::new(|| {
    vec![
        field(
            Field::Key,
            &[
                r"(?i)\bKey:\s*([A-G][♯♭#b]?\s*(?:Major|Minor))",
                r"\b([A-G][♯♭#b]?\s+(?:Major|Minor))\b",
            ],
        ),
        field(
            Field::Camelot,
            &[
                r"(?i)\bCamelot:\s*(\d{1,2}[AB])\b",
                r"(?i)\b(\d{1,2}[AB])\s*Camelot\b",
            ],
        ),
        field(
            Field::Bpm,
            &[
                r"(?i)\b(?:BPM|Tempo):\s*(\d+(?:\.\d+)?)",
                r"(?i)\b(\d+(?:\.\d+)?)\s*BPM\b",
            ],
        ),
        field(
            Field::Duration,
            &[
                r"(?i)\bDuration:\s*(\d{1,2}:\d{2}(?::\d{2})?)",
                r"(?i)\b(\d{1,2}:\d{2}(?::\d{2})?)\s*Duration\b",
            ],
        ),
        field(
            Field::ReleaseDate,
            &[
                r"(?i)\bRelease Date:\s*([A-Z][a-z]+\.? \d{1,2}, \d{4}|\d{4}-\d{2}-\d{2})",
                r"(?i)\b([A-Z][a-z]+\.? \d{1,2}, \d{4}|\d{4}-\d{2}-\d{2})\s*Release Date\b",
            ],
        ),
        percentage(Field::Popularity, "Popularity"),
        percentage(Field::Energy, "Energy"),
        percentage(Field::Danceability, "Danceability"),
        percentage(Field::Happiness, "Happiness"),
        percentage(Field::Acousticness, "Acousticness"),
        percentage(Field::Instrumentalness, "Instrumentalness"),
        percentage(Field::Liveness, "Liveness"),
        percentage(Field::Speechiness, "Speechiness"),
        field(
            Field::Loudness,
            &[
                r"(?i)\bLoudness:\s*(-?\d+(?:\.\d+)?\s*dB)",
                r"(?i)(-?\d+(?:\.\d+)?\s*dB)\s*Loudness\b",
            ],
        ),
    ]
});

pub fn pattern_table() -> &'static [FieldPatterns] {
    &FIELD_PATTERNS
}

/// Returns the first capture of the first matching pattern for `field`.
pub fn match_field(field: Field, text: &str) -> Option<String> {
    let entry = FIELD_PATTERNS.iter().find(|entry| entry.field == field)?;
    first_match(&entry.patterns, text)
}

fn first_match(patterns: &[Regex], text: &str) -> Option<String> {
    patterns.iter().find_map(|pattern| {
        pattern
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
    })
}

/// Trimmed text of the first element with non-empty text, trying selectors in order.
fn first_text(document: &Html, candidates: &[Selector]) -> Option<String> {
    candidates.iter().find_map(|selector| {
        document.select(selector).find_map(|element| {
            let text = element.text().collect::<String>().trim().to_string();
            (!text.is_empty()).then_some(text)
        })
    })
}

fn album_art(document: &Html) -> String {
    document
        .select(&IMAGE)
        .find(|img| {
            let attrs = img.value();
            [attrs.attr("alt"), attrs.attr("src")]
                .into_iter()
                .flatten()
                .any(|value| value.to_lowercase().contains("album"))
        })
        .and_then(|img| img.value().attr("src"))
        .unwrap_or_default()
        .to_string()
}

/// Extracts the full attribute record, or `None` if the page did not load
/// as a track page.
pub fn extract_track(snapshot: &PageSnapshot) -> Option<TrackAttributes> {
    let document = Html::parse_document(&snapshot.html);
    extract_from_document(&document, &snapshot.text)
}

pub fn extract_from_document(document: &Html, text: &str) -> Option<TrackAttributes> {
    let title = first_text(document, &TITLE);
    let artist = first_text(document, &ARTIST);
    let album = first_text(document, &ALBUM);

    if title.is_none() && artist.is_none() && album.is_none() {
        return None;
    }

    let mut attrs = TrackAttributes {
        title: title.unwrap_or_default(),
        artist: artist.unwrap_or_default(),
        album: album.unwrap_or_default(),
        explicit: EXPLICIT.is_match(text),
        album_art: album_art(document),
        ..Default::default()
    };

    for entry in FIELD_PATTERNS.iter() {
        if let Some(value) = first_match(&entry.patterns, text) {
            *entry.field.slot(&mut attrs) = value;
        }
    }

    attrs.recommendations = recommendations::parse_recommendations(document);
    Some(attrs)
}
