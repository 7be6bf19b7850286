//! Artist and album enrichment, fronted by the lookup cache.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::thread;

use tracing::{debug, info, warn};

use crate::api::ArtistSource;
use crate::store::LookupCache;
use crate::task::{CancelToken, Generations};

use super::model::{AlbumInfo, ArtistInfo, Track};

#[derive(Debug)]
pub enum LookupEvent {
    Artist {
        request: u64,
        name: String,
        info: Option<ArtistInfo>,
    },
}

struct InFlight {
    request: u64,
    name: String,
    cancel: CancelToken,
}

/// At most one artist lookup runs at a time; starting another cancels it.
#[derive(Default)]
pub struct ArtistLookups {
    requests: Generations,
    in_flight: Option<InFlight>,
    /// Names that came back unknown or failed this session. Not persisted.
    unresolved: HashSet<String>,
}

impl ArtistLookups {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a lookup for `name` unless the cache already answers it or the
    /// same lookup is already running. Returns whether a request was issued.
    pub fn ensure(
        &mut self,
        name: &str,
        cache: &LookupCache,
        source: Arc<dyn ArtistSource>,
        tx: &Sender<LookupEvent>,
    ) -> bool {
        if cache.contains_artist(name) || self.unresolved.contains(name) {
            return false;
        }
        if self.pending() == Some(name) {
            return false;
        }

        self.cancel();
        let request = self.requests.advance();
        let cancel = CancelToken::new();
        self.in_flight = Some(InFlight {
            request,
            name: name.to_string(),
            cancel: cancel.clone(),
        });

        let tx = tx.clone();
        let name = name.to_string();
        debug!(request, artist = %name, "artist lookup started");
        thread::spawn(move || {
            let info = match source.artist_info(&name) {
                Ok(info) => info,
                Err(e) => {
                    warn!(artist = %name, error = %e, "artist lookup failed");
                    None
                }
            };
            if cancel.is_cancelled() {
                debug!(request, artist = %name, "artist lookup cancelled");
                return;
            }
            let _ = tx.send(LookupEvent::Artist {
                request,
                name,
                info,
            });
        });
        true
    }

    /// Drop interest in the running lookup; its result will not be written.
    pub fn cancel(&mut self) {
        if let Some(previous) = self.in_flight.take() {
            previous.cancel.cancel();
        }
    }

    /// Allow another lookup for a name that previously came back empty.
    pub fn forget(&mut self, name: &str) -> bool {
        self.unresolved.remove(name)
    }

    pub fn pending(&self) -> Option<&str> {
        self.in_flight.as_ref().map(|f| f.name.as_str())
    }

    /// Write a finished lookup into the cache. Returns the artist name when
    /// the cache was updated.
    pub fn accept(&mut self, event: LookupEvent, cache: &mut LookupCache) -> Option<String> {
        let LookupEvent::Artist {
            request,
            name,
            info,
        } = event;

        match &self.in_flight {
            Some(f) if f.request == request && !f.cancel.is_cancelled() => {}
            _ => {
                debug!(request, artist = %name, "dropping stale artist lookup");
                return None;
            }
        }
        self.in_flight = None;

        let Some(info) = info else {
            info!(artist = %name, "artist not found");
            self.unresolved.insert(name);
            return None;
        };
        cache.set_artist(&name, info);
        Some(name)
    }
}

/// Summarise an album from the catalog tracks that carry it.
pub fn album_info(name: &str, tracks: &[Track]) -> AlbumInfo {
    let own: Vec<&Track> = tracks
        .iter()
        .filter(|t| t.album.as_deref() == Some(name))
        .collect();

    let mut genres: Vec<String> = Vec::new();
    for g in own.iter().filter_map(|t| t.genre.as_ref()).flatten() {
        if !genres.contains(g) {
            genres.push(g.clone());
        }
    }

    AlbumInfo {
        name: name.to_string(),
        artist: own.iter().find_map(|t| t.artist.clone()),
        year: own.iter().find_map(|t| t.year),
        album_art_url: own.iter().find_map(|t| t.album_art_url.clone()),
        genres,
        track_count: own.len(),
    }
}
