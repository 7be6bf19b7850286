//! The application store: catalog, lookup cache, queue and playback flags.
//!
//! Every mutation goes through a method here and bumps `revision`, which the
//! runtime uses to decide when the store needs writing back to disk.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::library::{Catalog, Track};

use super::cache::LookupCache;
use super::persist::PersistedState;

/// How the current track relates to the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackContext {
    /// Nothing selected.
    Idle,
    /// The current track is the queue entry at `index`.
    FromQueue { index: usize },
    /// The current track was started outside the queue.
    Adhoc,
}

#[derive(Debug, Default)]
pub struct PlayerStore {
    catalog: Catalog,
    cache: LookupCache,
    queue: Vec<Track>,
    current_track: Option<Track>,
    is_playing: bool,
    revision: u64,
}

impl PlayerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from its persisted snapshot. Playback starts paused.
    pub fn from_snapshot(state: PersistedState) -> Self {
        Self {
            catalog: Catalog::new(state.library, state.last_fetched),
            cache: LookupCache::from_maps(state.cached_artists, state.cached_albums),
            queue: state.queue,
            current_track: state.current_track,
            is_playing: false,
            revision: 0,
        }
    }

    pub fn snapshot(&self) -> PersistedState {
        PersistedState {
            current_track: self.current_track.clone(),
            queue: self.queue.clone(),
            library: self.catalog.tracks().to_vec(),
            last_fetched: self.catalog.last_fetched(),
            cached_artists: self.cache.artists().clone(),
            cached_albums: self.cache.albums().clone(),
        }
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn cache(&self) -> &LookupCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut LookupCache {
        self.touch();
        &mut self.cache
    }

    pub fn queue(&self) -> &[Track] {
        &self.queue
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.current_track.as_ref()
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn replace_library(&mut self, tracks: Vec<Track>, fetched_at: Option<DateTime<Utc>>) {
        self.catalog.replace(tracks, fetched_at);
        self.touch();
    }

    /// Select a track without checking it against the catalog or queue.
    pub fn set_current_track(&mut self, track: Option<Track>) {
        self.current_track = track;
        if self.current_track.is_none() {
            self.is_playing = false;
        }
        self.touch();
    }

    /// Returns `false` when asked to play with nothing selected.
    pub fn set_is_playing(&mut self, playing: bool) -> bool {
        if playing && self.current_track.is_none() {
            debug!("refusing to play without a current track");
            return false;
        }
        if self.is_playing != playing {
            self.is_playing = playing;
            self.touch();
        }
        true
    }

    pub fn set_queue(&mut self, tracks: Vec<Track>) {
        self.queue = tracks;
        self.touch();
    }

    pub fn add_to_queue(&mut self, tracks: impl IntoIterator<Item = Track>) {
        let before = self.queue.len();
        self.queue.extend(tracks);
        if self.queue.len() != before {
            self.touch();
        }
    }

    /// Remove every queue entry with this id.
    pub fn remove_from_queue(&mut self, id: &str) {
        let before = self.queue.len();
        self.queue.retain(|t| t.id != id);
        if self.queue.len() != before {
            self.touch();
        }
    }

    /// Empty the queue; the current track keeps playing.
    pub fn clear_queue(&mut self) {
        if !self.queue.is_empty() {
            self.queue.clear();
            self.touch();
        }
    }

    fn current_queue_index(&self) -> Option<usize> {
        let current = self.current_track.as_ref()?;
        self.queue.iter().position(|t| t.id == current.id)
    }

    pub fn context(&self) -> PlaybackContext {
        match (&self.current_track, self.current_queue_index()) {
            (None, _) => PlaybackContext::Idle,
            (Some(_), Some(index)) => PlaybackContext::FromQueue { index },
            (Some(_), None) => PlaybackContext::Adhoc,
        }
    }

    /// Move to the following queue entry. No wraparound.
    pub fn next(&mut self) -> bool {
        let Some(index) = self.current_queue_index() else {
            return false;
        };
        let Some(track) = self.queue.get(index + 1).cloned() else {
            return false;
        };
        self.current_track = Some(track);
        self.touch();
        true
    }

    /// Move to the preceding queue entry. No wraparound.
    pub fn previous(&mut self) -> bool {
        let Some(index) = self.current_queue_index() else {
            return false;
        };
        if index == 0 {
            return false;
        }
        self.current_track = Some(self.queue[index - 1].clone());
        self.touch();
        true
    }

    /// Queue an album and start it. With `Some(i)` the queue is rotated so
    /// that `tracks[i]` comes first and the tracks before it wrap to the end.
    pub fn play_album(&mut self, tracks: Vec<Track>, start: Option<usize>) {
        if tracks.is_empty() {
            return;
        }
        let start = start.filter(|&i| i < tracks.len()).unwrap_or(0);

        let mut queue = tracks;
        queue.rotate_left(start);
        self.current_track = queue.first().cloned();
        self.queue = queue;
        self.is_playing = true;
        self.touch();
    }

    /// Play one track outside the queue.
    pub fn play_track(&mut self, track: Track) {
        self.current_track = Some(track);
        self.is_playing = true;
        self.touch();
    }

    /// Natural end of the current track: continue with the queue successor
    /// or stop on the finished track.
    pub fn advance_after_end(&mut self) -> bool {
        if self.next() {
            self.is_playing = true;
            true
        } else {
            if self.is_playing {
                self.is_playing = false;
                self.touch();
            }
            false
        }
    }
}
