//! Bulk library refresh.
//!
//! A refresh lists the drive folder, fetches metadata for every file on a
//! few worker threads and reports the merged tracks back to the event loop.
//! Each refresh gets a generation; only the latest generation may commit,
//! so an older refresh finishing late can never overwrite a newer catalog.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::Sender;
use std::thread;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::{ApiError, LibrarySource};
use crate::task::{CancelToken, Generations};

use super::model::{Track, TrackMetadata};

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("file listing failed: {0}")]
    Listing(#[from] ApiError),
    #[error("refresh cancelled")]
    Cancelled,
}

#[derive(Debug)]
pub struct RefreshOutcome {
    pub tracks: Vec<Track>,
    /// Files whose metadata could not be fetched; they carry listing fields only.
    pub metadata_failures: usize,
}

#[derive(Debug)]
pub enum LibraryEvent {
    Refreshed {
        generation: u64,
        result: Result<RefreshOutcome, RefreshError>,
    },
}

/// List every file and merge in its metadata, preserving listing order.
pub fn build_catalog(
    source: &dyn LibrarySource,
    cancel: &CancelToken,
    concurrency: usize,
) -> Result<RefreshOutcome, RefreshError> {
    let files = source.list_files()?;
    if cancel.is_cancelled() {
        return Err(RefreshError::Cancelled);
    }

    let total = files.len();
    let workers = concurrency.clamp(1, total.max(1));
    let next = AtomicUsize::new(0);
    let mut metadata: Vec<Option<TrackMetadata>> = vec![None; total];
    let mut metadata_failures = 0usize;

    thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                scope.spawn(|| {
                    let mut fetched = Vec::new();
                    while !cancel.is_cancelled() {
                        let i = next.fetch_add(1, Ordering::Relaxed);
                        let Some(file) = files.get(i) else {
                            break;
                        };
                        fetched.push((i, source.metadata(&file.id)));
                    }
                    fetched
                })
            })
            .collect();

        for handle in handles {
            // A panicking worker leaves its files with listing fields only.
            for (i, result) in handle.join().unwrap_or_default() {
                match result {
                    Ok(m) => metadata[i] = Some(m),
                    Err(e) => {
                        metadata_failures += 1;
                        warn!(file_id = %files[i].id, error = %e, "metadata fetch failed");
                    }
                }
            }
        }
    });

    if cancel.is_cancelled() {
        return Err(RefreshError::Cancelled);
    }

    let tracks: Vec<Track> = files
        .into_iter()
        .zip(metadata)
        .map(|(file, meta)| Track::from_parts(file, meta))
        .collect();

    Ok(RefreshOutcome {
        tracks,
        metadata_failures,
    })
}

/// Issues refreshes and decides which results may commit.
pub struct Refresher {
    generations: Generations,
    in_flight: Option<CancelToken>,
    concurrency: usize,
}

impl Refresher {
    pub fn new(concurrency: usize) -> Self {
        Self {
            generations: Generations::new(),
            in_flight: None,
            concurrency: concurrency.max(1),
        }
    }

    /// Start a refresh on a background thread, cancelling any earlier one.
    pub fn start(&mut self, source: Arc<dyn LibrarySource>, tx: Sender<LibraryEvent>) -> u64 {
        if let Some(previous) = self.in_flight.take() {
            previous.cancel();
        }

        let generation = self.generations.advance();
        let cancel = CancelToken::new();
        self.in_flight = Some(cancel.clone());
        let concurrency = self.concurrency;

        info!(generation, "library refresh started");
        thread::spawn(move || {
            let result = build_catalog(source.as_ref(), &cancel, concurrency);
            if tx.send(LibraryEvent::Refreshed { generation, result }).is_err() {
                debug!(generation, "refresh finished after the event loop exited");
            }
        });

        generation
    }

    /// Whether a result from `generation` may be committed.
    pub fn accept(&mut self, generation: u64) -> bool {
        if self.generations.is_current(generation) {
            self.in_flight = None;
            true
        } else {
            info!(
                generation,
                latest = self.generations.latest(),
                "discarding stale refresh result"
            );
            false
        }
    }

    pub fn is_refreshing(&self) -> bool {
        self.in_flight.is_some()
    }
}
