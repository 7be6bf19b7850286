//! Grouped views derived from the flat catalog.
//!
//! Every function here is a pure, order-preserving derivation: groups appear
//! in the order their first track appears in the catalog and tracks keep
//! their catalog order inside a group.

use std::cmp::Reverse;

use super::model::Track;

/// Tracks sharing one album (or artist) name.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackGroup {
    pub name: String,
    pub tracks: Vec<Track>,
}

impl TrackGroup {
    /// Artist of the first track, the way album cards are labelled.
    pub fn lead_artist(&self) -> Option<&str> {
        self.tracks.first().and_then(|t| t.artist.as_deref())
    }

    pub fn year(&self) -> Option<u32> {
        self.tracks.iter().find_map(|t| t.year)
    }

    pub fn artwork(&self) -> Option<&str> {
        self.tracks.iter().find_map(|t| t.album_art_url.as_deref())
    }
}

fn group_by<F>(tracks: &[Track], key: F) -> Vec<TrackGroup>
where
    F: Fn(&Track) -> Option<&str>,
{
    let mut groups: Vec<TrackGroup> = Vec::new();
    for track in tracks {
        let Some(name) = key(track) else {
            continue;
        };
        match groups.iter_mut().find(|g| g.name == name) {
            Some(group) => group.tracks.push(track.clone()),
            None => groups.push(TrackGroup {
                name: name.to_string(),
                tracks: vec![track.clone()],
            }),
        }
    }
    groups
}

/// Group tracks by album. Tracks without an album are skipped.
pub fn group_by_album(tracks: &[Track]) -> Vec<TrackGroup> {
    group_by(tracks, |t| t.album.as_deref())
}

/// Group tracks by artist. Tracks without an artist are skipped.
pub fn group_by_artist(tracks: &[Track]) -> Vec<TrackGroup> {
    group_by(tracks, |t| t.artist.as_deref())
}

/// Newest tracks first, using the storage id as the recency key.
pub fn recently_added(tracks: &[Track], limit: usize) -> Vec<Track> {
    let mut sorted: Vec<Track> = tracks.to_vec();
    sorted.sort_by_key(|t| Reverse(t.id.clone()));
    sorted.truncate(limit);
    sorted
}

/// First `limit` distinct albums in catalog order.
pub fn featured_albums(tracks: &[Track], limit: usize) -> Vec<TrackGroup> {
    let mut groups = group_by_album(tracks);
    groups.truncate(limit);
    groups
}

pub fn album_tracks(tracks: &[Track], album: &str) -> Vec<Track> {
    tracks
        .iter()
        .filter(|t| t.album.as_deref() == Some(album))
        .cloned()
        .collect()
}

/// An artist's tracks grouped by album.
pub fn artist_albums(tracks: &[Track], artist: &str) -> Vec<TrackGroup> {
    let own: Vec<Track> = tracks
        .iter()
        .filter(|t| t.artist.as_deref() == Some(artist))
        .cloned()
        .collect();
    group_by_album(&own)
}
