//! Domain models for the mirrored catalog
//!
//! Three shapes per entity: the remote *payload* (what a gateway
//! deserializes off the wire, with optional fields a partial fetch may
//! omit), the persisted *record* (what the entity cache stores), and the
//! published *view* (the snapshot the UI layer observes). Conversions
//! between them are pure; no I/O happens here.
//!
//! Entities reference each other by id only. Album ↔ track ↔ artist
//! links are resolved through the entity repositories, never embedded as
//! object pointers, which keeps cache invalidation local to one record.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Entity Kind
// =============================================================================

/// The cacheable entity kinds the mirror knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Artist,
    Album,
    Track,
    Playlist,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Artist => "artist",
            EntityKind::Album => "album",
            EntityKind::Track => "track",
            EntityKind::Playlist => "playlist",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "artist" => Ok(EntityKind::Artist),
            "album" => Ok(EntityKind::Album),
            "track" => Ok(EntityKind::Track),
            "playlist" => Ok(EntityKind::Playlist),
            other => Err(format!("unknown entity kind: {}", other)),
        }
    }
}

// =============================================================================
// Artist
// =============================================================================

/// Artist as the remote reports it. `genres` and `follower_count` are
/// only present on a full fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistPayload {
    pub id: String,
    pub name: String,
    pub image_url: Option<String>,
    pub genres: Option<Vec<String>>,
    pub follower_count: Option<u64>,
}

impl ArtistPayload {
    /// Whether this payload populates every field a full record carries.
    pub fn is_full(&self) -> bool {
        self.genres.is_some() && self.follower_count.is_some()
    }
}

/// Persisted artist record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
    pub id: String,
    pub name: String,
    pub image_url: Option<String>,
    pub genres: Vec<String>,
    pub follower_count: Option<u64>,
}

impl Artist {
    /// Validate record data
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("Artist id cannot be empty".to_string());
        }
        if self.name.trim().is_empty() {
            return Err("Artist name cannot be empty".to_string());
        }
        Ok(())
    }

    pub fn to_view(&self) -> ArtistView {
        ArtistView {
            id: self.id.clone(),
            name: self.name.clone(),
            image_url: self.image_url.clone(),
            genre_line: self.genres.join(", "),
        }
    }
}

impl From<ArtistPayload> for Artist {
    fn from(payload: ArtistPayload) -> Self {
        Self {
            id: payload.id,
            name: payload.name,
            image_url: payload.image_url,
            genres: payload.genres.unwrap_or_default(),
            follower_count: payload.follower_count,
        }
    }
}

impl Artist {
    /// Merge a payload over the previously stored record. Full-only
    /// fields the payload omits are carried forward, so a partial
    /// refresh never guts a record a full fetch populated.
    pub fn merge_payload(payload: ArtistPayload, previous: Artist) -> Self {
        Self {
            id: payload.id,
            name: payload.name,
            image_url: payload.image_url,
            genres: payload.genres.unwrap_or(previous.genres),
            follower_count: payload.follower_count.or(previous.follower_count),
        }
    }
}

/// Artist snapshot published to observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistView {
    pub id: String,
    pub name: String,
    pub image_url: Option<String>,
    /// Comma-joined genre list, empty until a full fetch.
    pub genre_line: String,
}

// =============================================================================
// Album
// =============================================================================

/// Album as the remote reports it. `track_ids` is only present on a full
/// fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumPayload {
    pub id: String,
    pub name: String,
    pub artist_ids: Vec<String>,
    pub artist_names: Vec<String>,
    pub year: Option<i32>,
    pub image_url: Option<String>,
    pub track_ids: Option<Vec<String>>,
}

impl AlbumPayload {
    pub fn is_full(&self) -> bool {
        self.track_ids.is_some()
    }
}

/// Persisted album record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Album {
    pub id: String,
    pub name: String,
    /// Artist references by id; resolved through the artist repository.
    pub artist_ids: Vec<String>,
    pub artist_names: Vec<String>,
    pub year: Option<i32>,
    pub image_url: Option<String>,
    pub track_ids: Vec<String>,
}

impl Album {
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("Album id cannot be empty".to_string());
        }
        if self.name.trim().is_empty() {
            return Err("Album name cannot be empty".to_string());
        }
        if let Some(year) = self.year {
            if !(1900..=2100).contains(&year) {
                return Err(format!("Album year {} is out of valid range", year));
            }
        }
        Ok(())
    }

    pub fn to_view(&self) -> AlbumView {
        AlbumView {
            id: self.id.clone(),
            name: self.name.clone(),
            artist_line: self.artist_names.join(", "),
            year: self.year,
            image_url: self.image_url.clone(),
            track_count: self.track_ids.len(),
        }
    }
}

impl From<AlbumPayload> for Album {
    fn from(payload: AlbumPayload) -> Self {
        Self {
            id: payload.id,
            name: payload.name,
            artist_ids: payload.artist_ids,
            artist_names: payload.artist_names,
            year: payload.year,
            image_url: payload.image_url,
            track_ids: payload.track_ids.unwrap_or_default(),
        }
    }
}

impl Album {
    /// Merge a payload over the previously stored record, keeping the
    /// track list when the payload omits it.
    pub fn merge_payload(payload: AlbumPayload, previous: Album) -> Self {
        Self {
            id: payload.id,
            name: payload.name,
            artist_ids: payload.artist_ids,
            artist_names: payload.artist_names,
            year: payload.year.or(previous.year),
            image_url: payload.image_url,
            track_ids: payload.track_ids.unwrap_or(previous.track_ids),
        }
    }
}

/// Album snapshot published to observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumView {
    pub id: String,
    pub name: String,
    pub artist_line: String,
    pub year: Option<i32>,
    pub image_url: Option<String>,
    /// Zero until a full fetch has populated the track list.
    pub track_count: usize,
}

// =============================================================================
// Track
// =============================================================================

/// Track as the remote reports it. Audio properties are only present on a
/// full fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackPayload {
    pub id: String,
    pub title: String,
    pub album_id: Option<String>,
    pub artist_ids: Vec<String>,
    pub artist_names: Vec<String>,
    pub track_number: Option<i32>,
    pub duration_ms: Option<i64>,
}

impl TrackPayload {
    pub fn is_full(&self) -> bool {
        self.duration_ms.is_some()
    }
}

/// Persisted track record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub album_id: Option<String>,
    pub artist_ids: Vec<String>,
    pub artist_names: Vec<String>,
    pub track_number: Option<i32>,
    pub duration_ms: Option<i64>,
}

impl Track {
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("Track id cannot be empty".to_string());
        }
        if self.title.trim().is_empty() {
            return Err("Track title cannot be empty".to_string());
        }
        if let Some(duration) = self.duration_ms {
            if duration <= 0 {
                return Err("Track duration must be positive".to_string());
            }
        }
        if let Some(number) = self.track_number {
            if number <= 0 {
                return Err("Track number must be positive".to_string());
            }
        }
        Ok(())
    }

    pub fn to_view(&self) -> TrackView {
        TrackView {
            id: self.id.clone(),
            title: self.title.clone(),
            artist_line: self.artist_names.join(", "),
            album_id: self.album_id.clone(),
            duration_label: self.duration_ms.map(format_duration).unwrap_or_default(),
        }
    }
}

impl From<TrackPayload> for Track {
    fn from(payload: TrackPayload) -> Self {
        Self {
            id: payload.id,
            title: payload.title,
            album_id: payload.album_id,
            artist_ids: payload.artist_ids,
            artist_names: payload.artist_names,
            track_number: payload.track_number,
            duration_ms: payload.duration_ms,
        }
    }
}

impl Track {
    /// Merge a payload over the previously stored record, keeping the
    /// audio properties when the payload omits them.
    pub fn merge_payload(payload: TrackPayload, previous: Track) -> Self {
        Self {
            id: payload.id,
            title: payload.title,
            album_id: payload.album_id.or(previous.album_id),
            artist_ids: payload.artist_ids,
            artist_names: payload.artist_names,
            track_number: payload.track_number.or(previous.track_number),
            duration_ms: payload.duration_ms.or(previous.duration_ms),
        }
    }
}

/// Track snapshot published to observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackView {
    pub id: String,
    pub title: String,
    pub artist_line: String,
    pub album_id: Option<String>,
    /// `m:ss` label, empty until a full fetch.
    pub duration_label: String,
}

/// Format milliseconds as an `m:ss` label.
fn format_duration(ms: i64) -> String {
    let total_secs = ms / 1000;
    format!("{}:{:02}", total_secs / 60, total_secs % 60)
}

// =============================================================================
// Playlist
// =============================================================================

/// Playlist as the remote reports it. The item list is only present on a
/// full fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistPayload {
    pub id: String,
    pub name: String,
    pub owner_id: String,
    pub image_url: Option<String>,
    pub item_ids: Option<Vec<String>>,
}

impl PlaylistPayload {
    pub fn is_full(&self) -> bool {
        self.item_ids.is_some()
    }
}

/// Persisted playlist record. Items reference tracks by id; duplicates
/// are legal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    pub owner_id: String,
    pub image_url: Option<String>,
    pub item_ids: Vec<String>,
}

impl Playlist {
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("Playlist id cannot be empty".to_string());
        }
        if self.name.trim().is_empty() {
            return Err("Playlist name cannot be empty".to_string());
        }
        Ok(())
    }

    pub fn to_view(&self) -> PlaylistView {
        PlaylistView {
            id: self.id.clone(),
            name: self.name.clone(),
            owner_id: self.owner_id.clone(),
            image_url: self.image_url.clone(),
            item_count: self.item_ids.len(),
        }
    }
}

impl From<PlaylistPayload> for Playlist {
    fn from(payload: PlaylistPayload) -> Self {
        Self {
            id: payload.id,
            name: payload.name,
            owner_id: payload.owner_id,
            image_url: payload.image_url,
            item_ids: payload.item_ids.unwrap_or_default(),
        }
    }
}

impl Playlist {
    /// Merge a payload over the previously stored record, keeping the
    /// item list when the payload omits it.
    pub fn merge_payload(payload: PlaylistPayload, previous: Playlist) -> Self {
        Self {
            id: payload.id,
            name: payload.name,
            owner_id: payload.owner_id,
            image_url: payload.image_url,
            item_ids: payload.item_ids.unwrap_or(previous.item_ids),
        }
    }
}

/// Playlist snapshot published to observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistView {
    pub id: String,
    pub name: String,
    pub owner_id: String,
    pub image_url: Option<String>,
    pub item_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_kind_round_trips_through_str() {
        for kind in [
            EntityKind::Artist,
            EntityKind::Album,
            EntityKind::Track,
            EntityKind::Playlist,
        ] {
            assert_eq!(kind.as_str().parse::<EntityKind>().unwrap(), kind);
        }
        assert!("podcast".parse::<EntityKind>().is_err());
    }

    #[test]
    fn partial_artist_payload_is_not_full() {
        let payload = ArtistPayload {
            id: "ar1".into(),
            name: "Artist".into(),
            image_url: None,
            genres: None,
            follower_count: None,
        };
        assert!(!payload.is_full());

        let artist: Artist = payload.into();
        assert!(artist.genres.is_empty());
        artist.validate().unwrap();
    }

    #[test]
    fn full_album_payload_carries_tracks_into_record() {
        let payload = AlbumPayload {
            id: "al1".into(),
            name: "Album".into(),
            artist_ids: vec!["ar1".into()],
            artist_names: vec!["Artist".into()],
            year: Some(2001),
            image_url: None,
            track_ids: Some(vec!["t1".into(), "t2".into()]),
        };
        assert!(payload.is_full());

        let album: Album = payload.into();
        assert_eq!(album.to_view().track_count, 2);
    }

    #[test]
    fn track_duration_label_formats_m_ss() {
        let track = Track {
            id: "t1".into(),
            title: "Song".into(),
            album_id: None,
            artist_ids: vec![],
            artist_names: vec!["A".into(), "B".into()],
            track_number: Some(1),
            duration_ms: Some(125_000),
        };
        let view = track.to_view();
        assert_eq!(view.duration_label, "2:05");
        assert_eq!(view.artist_line, "A, B");
    }

    #[test]
    fn partial_payload_merges_over_full_record() {
        let full: Artist = ArtistPayload {
            id: "ar1".into(),
            name: "Artist".into(),
            image_url: None,
            genres: Some(vec!["rock".into()]),
            follower_count: Some(42),
        }
        .into();

        let partial = ArtistPayload {
            id: "ar1".into(),
            name: "Artist (renamed)".into(),
            image_url: None,
            genres: None,
            follower_count: None,
        };
        let merged = Artist::merge_payload(partial, full);
        assert_eq!(merged.name, "Artist (renamed)");
        assert_eq!(merged.genres, vec!["rock".to_string()]);
        assert_eq!(merged.follower_count, Some(42));
    }

    #[test]
    fn validation_rejects_blank_names() {
        let mut playlist = Playlist {
            id: "pl1".into(),
            name: "Mix".into(),
            owner_id: "u1".into(),
            image_url: None,
            item_ids: vec![],
        };
        playlist.validate().unwrap();
        playlist.name = "  ".into();
        assert!(playlist.validate().is_err());
    }
}
