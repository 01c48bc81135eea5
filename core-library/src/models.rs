//! Domain models for the podcast catalogue
//!
//! These mirror the JSON the API returns. Wire names that differ from the
//! Rust field names are mapped with serde attributes so the rest of the core
//! never sees `file`, `about` or `_id`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{LibraryError, Result};

// =============================================================================
// Tracks
// =============================================================================

/// Uploader of a track.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Owner {
    pub id: String,
    pub name: String,
}

/// One audio asset with metadata. Read-only on the client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub title: String,
    /// Remote audio URL
    #[serde(rename = "file")]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,
    pub owner: Owner,
    /// Category tag, e.g. "Business" or "Others"
    #[serde(default)]
    pub category: String,
    #[serde(rename = "about", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Which view produced a [`TrackList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ListProvenance {
    Latest,
    Recommended,
    RecentlyPlayed,
    PlaylistAudios,
    Favorites,
    Uploads,
    History,
    #[default]
    Other,
}

impl ListProvenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListProvenance::Latest => "latest",
            ListProvenance::Recommended => "recommended",
            ListProvenance::RecentlyPlayed => "recently-played",
            ListProvenance::PlaylistAudios => "playlist-audios",
            ListProvenance::Favorites => "favorites",
            ListProvenance::Uploads => "uploads",
            ListProvenance::History => "history",
            ListProvenance::Other => "other",
        }
    }
}

impl fmt::Display for ListProvenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered tracks plus the view they came from.
///
/// Two lists are the same list when their ordered ids match; provenance and
/// metadata are ignored. That comparison decides whether playback resumes
/// the loaded queue or replaces it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TrackList {
    tracks: Vec<Track>,
    provenance: ListProvenance,
}

impl TrackList {
    pub fn new(tracks: Vec<Track>, provenance: ListProvenance) -> Self {
        Self { tracks, provenance }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn provenance(&self) -> ListProvenance {
        self.provenance
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Track> {
        self.tracks.iter()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.tracks.iter().map(|t| t.id.as_str()).collect()
    }

    /// Ordered-id equality.
    pub fn same_as(&self, other: &TrackList) -> bool {
        self.tracks.len() == other.tracks.len()
            && self
                .tracks
                .iter()
                .zip(other.tracks.iter())
                .all(|(a, b)| a.id == b.id)
    }

    /// Index of the first track with `id`.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.tracks.iter().position(|t| t.id == id)
    }

    /// Like [`TrackList::index_of`] but fails when the track is absent.
    pub fn require_index(&self, id: &str) -> Result<usize> {
        self.index_of(id).ok_or_else(|| LibraryError::NotFound {
            entity_type: "track".to_string(),
            id: id.to_string(),
        })
    }
}

impl From<Vec<Track>> for TrackList {
    fn from(tracks: Vec<Track>) -> Self {
        Self::new(tracks, ListProvenance::Other)
    }
}

impl<'a> IntoIterator for &'a TrackList {
    type Item = &'a Track;
    type IntoIter = std::slice::Iter<'a, Track>;

    fn into_iter(self) -> Self::IntoIter {
        self.tracks.iter()
    }
}

// =============================================================================
// Playback rate
// =============================================================================

/// A playback speed from the fixed menu 0.25x ..= 2x in 0.25 steps.
///
/// Stored as a count of quarters so equality is exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlaybackRate(u8);

impl PlaybackRate {
    pub const NORMAL: PlaybackRate = PlaybackRate(4);

    /// Every accepted rate, slowest first.
    pub const ALL: [PlaybackRate; 8] = [
        PlaybackRate(1),
        PlaybackRate(2),
        PlaybackRate(3),
        PlaybackRate(4),
        PlaybackRate(5),
        PlaybackRate(6),
        PlaybackRate(7),
        PlaybackRate(8),
    ];

    pub fn new(rate: f32) -> Result<Self> {
        let quarters = rate * 4.0;
        let rounded = quarters.round();
        if !rate.is_finite() || (quarters - rounded).abs() > 1e-4 || !(1.0..=8.0).contains(&rounded)
        {
            return Err(LibraryError::InvalidInput {
                field: "rate".to_string(),
                message: format!("{} is not one of 0.25, 0.5, ... 2.0", rate),
            });
        }
        Ok(Self(rounded as u8))
    }

    pub fn as_f32(&self) -> f32 {
        f32::from(self.0) / 4.0
    }
}

impl Default for PlaybackRate {
    fn default() -> Self {
        Self::NORMAL
    }
}

impl TryFrom<f32> for PlaybackRate {
    type Error = LibraryError;

    fn try_from(rate: f32) -> Result<Self> {
        Self::new(rate)
    }
}

impl From<PlaybackRate> for f32 {
    fn from(rate: PlaybackRate) -> f32 {
        rate.as_f32()
    }
}

impl fmt::Display for PlaybackRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x", self.as_f32())
    }
}

impl Serialize for PlaybackRate {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_f32(self.as_f32())
    }
}

impl<'de> Deserialize<'de> for PlaybackRate {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let rate = f32::deserialize(deserializer)?;
        PlaybackRate::new(rate).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Playlists
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub title: String,
    pub visibility: Visibility,
    /// Number of tracks in the playlist
    #[serde(default)]
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistAudios {
    pub id: String,
    pub title: String,
    pub audios: Vec<Track>,
}

impl PlaylistAudios {
    pub fn into_track_list(self) -> TrackList {
        TrackList::new(self.audios, ListProvenance::PlaylistAudios)
    }
}

// =============================================================================
// History
// =============================================================================

/// A single listened entry inside a [`HistoryDay`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryAudio {
    /// Id of the history entry itself
    pub id: String,
    pub audio_id: String,
    pub date: String,
    pub title: String,
}

/// History grouped by calendar day, newest first as the server returns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryDay {
    pub date: String,
    pub audios: Vec<HistoryAudio>,
}

/// Drop the entries whose entry id is in `ids`, then drop days left empty.
pub fn without_history_entries(days: &[HistoryDay], ids: &[String]) -> Vec<HistoryDay> {
    days.iter()
        .filter_map(|day| {
            let audios: Vec<HistoryAudio> = day
                .audios
                .iter()
                .filter(|audio| !ids.contains(&audio.id))
                .cloned()
                .collect();
            (!audios.is_empty()).then(|| HistoryDay {
                date: day.date.clone(),
                audios,
            })
        })
        .collect()
}

/// Progress report body for `POST /history`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub audio_id: String,
    /// Position reached, in seconds
    pub progress: f64,
    pub date: DateTime<Utc>,
}

// =============================================================================
// Profiles
// =============================================================================

/// The signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default)]
    pub followers: u32,
    #[serde(default)]
    pub followings: u32,
}

/// Another user's profile as shown on their public page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicProfile {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub followers: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}
