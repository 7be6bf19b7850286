use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

/// One entry of the storage listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub mime_type: Option<String>,
}

/// Parsed tag data returned by the metadata service for one file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    #[serde(deserialize_with = "deserialize_year")]
    pub year: Option<u32>,
    pub genre: Option<Vec<String>>,
    pub duration: Option<f64>,
    pub bitrate: Option<f64>,
    pub album_art_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default, deserialize_with = "deserialize_year")]
    pub year: Option<u32>,
    #[serde(default)]
    pub genre: Option<Vec<String>>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub bitrate: Option<f64>,
    #[serde(default)]
    pub album_art_url: Option<String>,
}

impl Track {
    /// Merge a listing entry with its metadata. Metadata wins for tag fields,
    /// the listing keeps identity.
    pub fn from_parts(file: FileEntry, metadata: Option<TrackMetadata>) -> Self {
        let meta = metadata.unwrap_or_default();
        Self {
            id: file.id,
            name: file.name,
            mime_type: file.mime_type,
            title: non_blank(meta.title),
            artist: non_blank(meta.artist),
            album: non_blank(meta.album),
            year: meta.year,
            genre: meta.genre.filter(|g| !g.is_empty()),
            duration: meta.duration.filter(|d| d.is_finite() && *d >= 0.0),
            bitrate: meta.bitrate,
            album_art_url: non_blank(meta.album_art_url),
        }
    }

    /// Tag title, or the file name when the file carries no title.
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.name)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Years arrive either as numbers (tag parser) or as strings (enrichment).
fn deserialize_year<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum YearRepr {
        Number(u32),
        Float(f64),
        Text(String),
    }

    Ok(match Option::<YearRepr>::deserialize(deserializer)? {
        Some(YearRepr::Number(n)) => Some(n),
        Some(YearRepr::Float(f)) if f.is_finite() && f >= 0.0 => Some(f as u32),
        Some(YearRepr::Text(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Enriched artist data from the artist-info service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArtistInfo {
    pub name: String,
    pub bio: Option<String>,
    pub image: Option<String>,
    pub listeners: Option<u64>,
    pub playcount: Option<u64>,
    pub tags: Vec<String>,
}

/// Album summary kept in the lookup cache.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AlbumInfo {
    pub name: String,
    pub artist: Option<String>,
    pub year: Option<u32>,
    pub album_art_url: Option<String>,
    pub genres: Vec<String>,
    pub track_count: usize,
}

/// The full known set of playable tracks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    tracks: Vec<Track>,
    last_fetched: Option<DateTime<Utc>>,
}

impl Catalog {
    pub fn new(tracks: Vec<Track>, last_fetched: Option<DateTime<Utc>>) -> Self {
        let mut catalog = Self::default();
        catalog.replace(tracks, last_fetched);
        catalog
    }

    /// Replace the whole catalog. Duplicate ids keep their first occurrence.
    pub fn replace(&mut self, tracks: Vec<Track>, fetched_at: Option<DateTime<Utc>>) {
        let mut seen: HashSet<String> = HashSet::with_capacity(tracks.len());
        let mut unique = Vec::with_capacity(tracks.len());
        for track in tracks {
            if seen.insert(track.id.clone()) {
                unique.push(track);
            } else {
                warn!(track_id = %track.id, "duplicate track id in catalog, dropping");
            }
        }
        self.tracks = unique;
        self.last_fetched = fetched_at;
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn get(&self, id: &str) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn last_fetched(&self) -> Option<DateTime<Utc>> {
        self.last_fetched
    }
}
