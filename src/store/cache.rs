use std::collections::BTreeMap;

use crate::library::{AlbumInfo, ArtistInfo};

/// Session-lifetime cache of enrichment results, keyed by display name.
///
/// Entries never expire; writes are last-write-wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LookupCache {
    artists: BTreeMap<String, ArtistInfo>,
    albums: BTreeMap<String, AlbumInfo>,
}

impl LookupCache {
    pub fn from_maps(
        artists: BTreeMap<String, ArtistInfo>,
        albums: BTreeMap<String, AlbumInfo>,
    ) -> Self {
        Self { artists, albums }
    }

    pub fn artist(&self, name: &str) -> Option<&ArtistInfo> {
        self.artists.get(name)
    }

    pub fn album(&self, name: &str) -> Option<&AlbumInfo> {
        self.albums.get(name)
    }

    pub fn contains_artist(&self, name: &str) -> bool {
        self.artists.contains_key(name)
    }

    pub fn contains_album(&self, name: &str) -> bool {
        self.albums.contains_key(name)
    }

    pub fn set_artist(&mut self, name: &str, info: ArtistInfo) {
        self.artists.insert(name.to_string(), info);
    }

    pub fn set_album(&mut self, name: &str, info: AlbumInfo) {
        self.albums.insert(name.to_string(), info);
    }

    pub fn remove_album(&mut self, name: &str) -> Option<AlbumInfo> {
        self.albums.remove(name)
    }

    pub fn artists(&self) -> &BTreeMap<String, ArtistInfo> {
        &self.artists
    }

    pub fn albums(&self) -> &BTreeMap<String, AlbumInfo> {
        &self.albums
    }
}
