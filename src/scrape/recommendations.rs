//! Related-track cards.
//!
//! Each card is one repeating fragment. Its four stat cells carry no labels
//! and are read by position: key, tempo, camelot, popularity. A card whose
//! Spotify link yields no track id is dropped without complaint.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

use crate::{types::RecommendationEntry, utils, warning};

pub const CARD_SELECTOR: &str = "div.track-recommendation";
pub const TITLE_SELECTOR: &str = ".track-recommendation-title";
pub const ARTIST_SELECTOR: &str = ".track-recommendation-artist";
pub const LINK_SELECTOR: &str = "a[href*=\"open.spotify.com\"]";
pub const STAT_SELECTOR: &str = ".track-recommendation-stat";

static CARD: LazyLock<Selector> = LazyLock::new(|| selector(CARD_SELECTOR));
static TITLE: LazyLock<Selector> = LazyLock::new(|| selector(TITLE_SELECTOR));
static ARTIST: LazyLock<Selector> = LazyLock::new(|| selector(ARTIST_SELECTOR));
static LINK: LazyLock<Selector> = LazyLock::new(|| selector(LINK_SELECTOR));
static STAT: LazyLock<Selector> = LazyLock::new(|| selector(STAT_SELECTOR));
static IMAGE: LazyLock<Selector> = LazyLock::new(|| selector("img"));

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("hardcoded selector is valid")
}

#[derive(Debug, Error)]
pub enum FragmentError {
    #[error("unparseable track link {href:?}: {source}")]
    Link {
        href: String,
        source: url::ParseError,
    },
}

/// Parses every card in document order, skipping the ones without a track id.
pub fn parse_recommendations(document: &Html) -> Vec<RecommendationEntry> {
    let mut entries = Vec::new();
    for (index, card) in document.select(&CARD).enumerate() {
        match parse_fragment(card) {
            Ok(Some(entry)) => entries.push(entry),
            Ok(None) => {}
            Err(e) => warning!("Skipping recommendation #{}: {}", index + 1, e),
        }
    }
    entries
}

pub fn parse_fragment(card: ElementRef<'_>) -> Result<Option<RecommendationEntry>, FragmentError> {
    let track_id = match card.select(&LINK).next().and_then(|a| a.value().attr("href")) {
        Some(href) => utils::last_path_segment(href).map_err(|source| FragmentError::Link {
            href: href.to_string(),
            source,
        })?,
        None => String::new(),
    };

    if track_id.is_empty() {
        return Ok(None);
    }

    let stats: Vec<String> = card.select(&STAT).map(text_of).collect();
    let stat = |index: usize| stats.get(index).cloned().unwrap_or_default();

    Ok(Some(RecommendationEntry {
        title: first_text(card, &TITLE),
        artist: first_text(card, &ARTIST),
        track_id,
        key: stat(0),
        bpm: stat(1),
        camelot: stat(2),
        popularity: stat(3),
        album_art: card
            .select(&IMAGE)
            .next()
            .and_then(|img| img.value().attr("src"))
            .unwrap_or_default()
            .to_string(),
    }))
}

fn first_text(card: ElementRef<'_>, selector: &Selector) -> String {
    card.select(selector).next().map(text_of).unwrap_or_default()
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}
