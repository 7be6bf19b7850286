use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::*;
use crate::api::{ApiError, ArtistSource, LibrarySource};
use crate::config::TrackDisplayField;
use crate::store::LookupCache;
use crate::task::CancelToken;

fn track(id: &str, album: Option<&str>) -> Track {
    Track {
        id: id.to_string(),
        name: format!("{id}.mp3"),
        mime_type: Some("audio/mpeg".into()),
        title: Some(format!("Song {id}")),
        artist: Some("Band".into()),
        album: album.map(str::to_string),
        year: None,
        genre: None,
        duration: Some(180.0),
        bitrate: None,
        album_art_url: None,
    }
}

fn file(id: &str) -> FileEntry {
    FileEntry {
        id: id.to_string(),
        name: format!("{id}.flac"),
        mime_type: Some("audio/flac".into()),
    }
}

struct FakeLibrary {
    files: Vec<FileEntry>,
    failing: Vec<String>,
    metadata_calls: AtomicUsize,
}

impl FakeLibrary {
    fn new(ids: &[&str]) -> Self {
        Self {
            files: ids.iter().map(|id| file(id)).collect(),
            failing: Vec::new(),
            metadata_calls: AtomicUsize::new(0),
        }
    }
}

impl LibrarySource for FakeLibrary {
    fn list_files(&self) -> Result<Vec<FileEntry>, ApiError> {
        Ok(self.files.clone())
    }

    fn metadata(&self, file_id: &str) -> Result<TrackMetadata, ApiError> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.iter().any(|f| f == file_id) {
            return Err(ApiError::Status {
                url: format!("http://fake/api/metadata?fileId={file_id}"),
                status: 500,
            });
        }
        Ok(TrackMetadata {
            title: Some(format!("Title {file_id}")),
            artist: Some("Band".into()),
            album: Some("Record".into()),
            ..TrackMetadata::default()
        })
    }
}

struct BrokenListing;

impl LibrarySource for BrokenListing {
    fn list_files(&self) -> Result<Vec<FileEntry>, ApiError> {
        Err(ApiError::Transport {
            url: "http://fake/api/files".into(),
            message: "connection refused".into(),
        })
    }

    fn metadata(&self, _file_id: &str) -> Result<TrackMetadata, ApiError> {
        unreachable!("metadata is never fetched without a listing")
    }
}

#[derive(Default)]
struct FakeArtists {
    known: HashMap<String, ArtistInfo>,
    calls: Mutex<Vec<String>>,
}

impl FakeArtists {
    fn with(name: &str) -> Self {
        let mut known = HashMap::new();
        known.insert(
            name.to_string(),
            ArtistInfo {
                name: name.to_string(),
                bio: Some("Formed in a garage.".into()),
                listeners: Some(1200),
                ..ArtistInfo::default()
            },
        );
        Self {
            known,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl ArtistSource for FakeArtists {
    fn artist_info(&self, name: &str) -> Result<Option<ArtistInfo>, ApiError> {
        self.calls.lock().unwrap().push(name.to_string());
        Ok(self.known.get(name).cloned())
    }
}

#[test]
fn album_grouping_preserves_first_appearance_order() {
    let tracks = vec![
        track("1", Some("A")),
        track("2", Some("A")),
        track("3", Some("B")),
    ];
    let groups = group_by_album(&tracks);

    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].name, "A");
    let ids: Vec<&str> = groups[0].tracks.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2"]);
    assert_eq!(groups[1].name, "B");
    assert_eq!(groups[1].tracks[0].id, "3");
}

#[test]
fn grouping_skips_tracks_without_the_key() {
    let tracks = vec![track("1", None), track("2", Some("A")), track("3", None)];
    let groups = group_by_album(&tracks);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].tracks.len(), 1);

    let by_artist = group_by_artist(&tracks);
    assert_eq!(by_artist.len(), 1);
    assert_eq!(by_artist[0].tracks.len(), 3);
}

#[test]
fn recently_added_sorts_ids_descending_and_truncates() {
    let tracks = vec![
        track("a1", None),
        track("c3", None),
        track("b2", None),
        track("d4", None),
    ];
    let recent: Vec<String> = recently_added(&tracks, 3)
        .into_iter()
        .map(|t| t.id)
        .collect();
    assert_eq!(recent, vec!["d4", "c3", "b2"]);
}

#[test]
fn featured_albums_takes_first_distinct_names() {
    let tracks = vec![
        track("1", Some("X")),
        track("2", Some("Y")),
        track("3", Some("X")),
        track("4", Some("Z")),
    ];
    let names: Vec<String> = featured_albums(&tracks, 2)
        .into_iter()
        .map(|g| g.name)
        .collect();
    assert_eq!(names, vec!["X", "Y"]);
}

#[test]
fn artist_albums_only_include_that_artist() {
    let mut other = track("9", Some("A"));
    other.artist = Some("Someone Else".into());
    let tracks = vec![track("1", Some("A")), other, track("2", Some("B"))];

    let albums = artist_albums(&tracks, "Band");
    assert_eq!(albums.len(), 2);
    assert_eq!(albums[0].tracks.len(), 1);
    assert_eq!(album_tracks(&tracks, "A").len(), 2);
}

#[test]
fn display_from_fields_can_format_artist_title() {
    let t = track("1", Some("Record"));
    assert_eq!(
        display_from_fields(
            &t,
            &[TrackDisplayField::Artist, TrackDisplayField::Title],
            " - "
        ),
        "Band - Song 1"
    );

    let mut untitled = track("2", None);
    untitled.title = None;
    untitled.artist = Some("   ".into());
    assert_eq!(
        display_from_fields(
            &untitled,
            &[TrackDisplayField::Artist, TrackDisplayField::Title],
            " - "
        ),
        "2.mp3"
    );
}

#[test]
fn display_from_fields_skips_missing_values() {
    let mut t = track("1", None);
    t.year = Some(1999);
    t.genre = Some(vec!["Rock".into(), "Pop".into()]);
    assert_eq!(
        display_from_fields(
            &t,
            &[
                TrackDisplayField::Album,
                TrackDisplayField::Year,
                TrackDisplayField::Genre
            ],
            " | "
        ),
        "1999 | Rock, Pop"
    );
}

#[test]
fn from_parts_prefers_metadata_and_keeps_identity() {
    let merged = Track::from_parts(
        file("f1"),
        Some(TrackMetadata {
            title: Some("  Real Title ".into()),
            artist: Some("".into()),
            duration: Some(-3.0),
            ..TrackMetadata::default()
        }),
    );
    assert_eq!(merged.id, "f1");
    assert_eq!(merged.name, "f1.flac");
    assert_eq!(merged.title.as_deref(), Some("Real Title"));
    assert_eq!(merged.artist, None);
    assert_eq!(merged.duration, None);

    let bare = Track::from_parts(file("f2"), None);
    assert_eq!(bare.display_title(), "f2.flac");
}

#[test]
fn catalog_replace_drops_duplicate_ids() {
    let mut first = track("1", Some("A"));
    first.title = Some("first".into());
    let mut dup = track("1", Some("B"));
    dup.title = Some("second".into());

    let catalog = Catalog::new(vec![first, track("2", None), dup], None);
    assert_eq!(catalog.len(), 2);
    assert_eq!(
        catalog.get("1").and_then(|t| t.title.as_deref()),
        Some("first")
    );
}

#[test]
fn build_catalog_preserves_listing_order_and_degrades_failures() {
    let mut source = FakeLibrary::new(&["5", "1", "4", "2", "3"]);
    source.failing.push("4".into());

    let outcome = build_catalog(&source, &CancelToken::new(), 3).unwrap();
    let ids: Vec<&str> = outcome.tracks.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["5", "1", "4", "2", "3"]);
    assert_eq!(outcome.metadata_failures, 1);
    assert_eq!(source.metadata_calls.load(Ordering::SeqCst), 5);

    let failed = &outcome.tracks[2];
    assert_eq!(failed.title, None);
    assert_eq!(failed.display_title(), "4.flac");
    assert_eq!(outcome.tracks[0].title.as_deref(), Some("Title 5"));
}

#[test]
fn build_catalog_fails_when_listing_fails() {
    let result = build_catalog(&BrokenListing, &CancelToken::new(), 4);
    assert!(matches!(result, Err(RefreshError::Listing(_))));
}

#[test]
fn build_catalog_honours_cancellation() {
    let source = FakeLibrary::new(&["1", "2"]);
    let cancel = CancelToken::new();
    cancel.cancel();
    let result = build_catalog(&source, &cancel, 2);
    assert!(matches!(result, Err(RefreshError::Cancelled)));
    assert_eq!(source.metadata_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn stale_refresh_generations_are_discarded() {
    let source: Arc<dyn LibrarySource> = Arc::new(FakeLibrary::new(&["1", "2"]));
    let (tx, rx) = mpsc::channel();
    let mut refresher = Refresher::new(2);

    let first = refresher.start(source.clone(), tx.clone());
    let second = refresher.start(source, tx);
    assert!(second > first);
    assert!(refresher.is_refreshing());

    let mut committed = Vec::new();
    for _ in 0..2 {
        let LibraryEvent::Refreshed { generation, result } =
            rx.recv_timeout(Duration::from_secs(5)).unwrap();
        if refresher.accept(generation) {
            committed.push((generation, result.unwrap().tracks.len()));
        }
    }

    assert_eq!(committed, vec![(second, 2)]);
    assert!(!refresher.is_refreshing());
}

#[test]
fn cached_artist_is_not_looked_up_again() {
    let source = Arc::new(FakeArtists::with("Band"));
    let (tx, rx) = mpsc::channel();
    let mut cache = LookupCache::default();
    let mut lookups = ArtistLookups::new();

    assert!(lookups.ensure("Band", &cache, source.clone(), &tx));
    let event = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(lookups.accept(event, &mut cache).as_deref(), Some("Band"));
    assert_eq!(
        cache.artist("Band").and_then(|a| a.listeners),
        Some(1200)
    );

    assert!(!lookups.ensure("Band", &cache, source.clone(), &tx));
    assert_eq!(source.call_count(), 1);
}

#[test]
fn unknown_artist_leaves_cache_untouched() {
    let source = Arc::new(FakeArtists::default());
    let (tx, rx) = mpsc::channel();
    let mut cache = LookupCache::default();
    let mut lookups = ArtistLookups::new();

    assert!(lookups.ensure("Nobody", &cache, source, &tx));
    let event = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(lookups.accept(event, &mut cache), None);
    assert!(!cache.contains_artist("Nobody"));
    assert_eq!(lookups.pending(), None);
}

#[test]
fn unknown_artist_is_not_asked_for_again_until_forgotten() {
    let source = Arc::new(FakeArtists::default());
    let (tx, rx) = mpsc::channel();
    let mut cache = LookupCache::default();
    let mut lookups = ArtistLookups::new();

    // The event loop drains results and re-ensures the wanted artist every tick.
    for _ in 0..5 {
        while let Ok(event) = rx.recv_timeout(Duration::from_millis(200)) {
            lookups.accept(event, &mut cache);
        }
        lookups.ensure("Nobody", &cache, source.clone(), &tx);
    }
    while let Ok(event) = rx.recv_timeout(Duration::from_millis(200)) {
        lookups.accept(event, &mut cache);
    }
    assert_eq!(source.call_count(), 1);
    assert!(!cache.contains_artist("Nobody"));

    assert!(lookups.forget("Nobody"));
    assert!(lookups.ensure("Nobody", &cache, source.clone(), &tx));
    rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(source.call_count(), 2);
}

#[test]
fn cancelled_lookup_never_reaches_the_cache() {
    let source = Arc::new(FakeArtists::with("Band"));
    let (tx, rx) = mpsc::channel();
    let mut cache = LookupCache::default();
    let mut lookups = ArtistLookups::new();

    assert!(lookups.ensure("Band", &cache, source, &tx));
    lookups.cancel();
    assert_eq!(lookups.pending(), None);

    // The worker may or may not have sent before noticing the cancel.
    if let Ok(event) = rx.recv_timeout(Duration::from_millis(500)) {
        assert_eq!(lookups.accept(event, &mut cache), None);
    }
    assert!(!cache.contains_artist("Band"));
}

#[test]
fn album_info_summarises_catalog_tracks() {
    let mut a = track("1", Some("Record"));
    a.year = Some(2001);
    a.genre = Some(vec!["Rock".into()]);
    let mut b = track("2", Some("Record"));
    b.genre = Some(vec!["Rock".into(), "Indie".into()]);
    b.album_art_url = Some("http://art/1.jpg".into());
    let tracks = vec![a, track("3", Some("Other")), b];

    let info = album_info("Record", &tracks);
    assert_eq!(info.track_count, 2);
    assert_eq!(info.artist.as_deref(), Some("Band"));
    assert_eq!(info.year, Some(2001));
    assert_eq!(info.genres, vec!["Rock", "Indie"]);
    assert_eq!(info.album_art_url.as_deref(), Some("http://art/1.jpg"));
}
