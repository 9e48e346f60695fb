//! # Spotify Integration Module
//!
//! Upstream track metadata lookup. The scraper itself only needs an artist
//! name, a song name and a track id; this module turns a bare Spotify track
//! id into those three values.
//!
//! Authentication is the caller's business: every call takes a ready bearer
//! token (see [`crate::config::spotify_access_token`]).
//!
//! ## API Coverage
//!
//! - `GET /tracks/{id}` - Track name, artists and album
//!
//! ## Error Types
//!
//! Functions return `reqwest::Error` for network failures, non-success
//! statuses and unexpected response bodies.

pub mod track;
