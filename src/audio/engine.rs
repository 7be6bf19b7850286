//! Playback engine: turns store changes into output requests and output
//! feedback into store changes.
//!
//! The engine never owns playback intent. `PlayerStore::is_playing` and the
//! current track are the source of truth; the engine observes them on
//! `sync` and reconciles the output, tracking what the output is doing in
//! `EngineStatus`.

use tracing::{debug, info, warn};

use crate::api::stream_url;
use crate::library::Track;
use crate::store::PlayerStore;

use super::types::{AudioOutput, EngineStatus, OutputEvent, TrackUnavailable};

pub struct PlaybackEngine<O: AudioOutput> {
    output: O,
    base_url: String,
    status: EngineStatus,
    load_id: u64,
    loaded_track: Option<String>,
    position: f64,
    duration: Option<f64>,
    volume: f32,
    failure: Option<TrackUnavailable>,
    /// Position to apply once a reload for a seek has loaded.
    pending_seek: Option<f64>,
}

impl<O: AudioOutput> PlaybackEngine<O> {
    pub fn new(mut output: O, base_url: &str, volume: f32) -> Self {
        let volume = volume.clamp(0.0, 1.0);
        output.set_volume(volume);
        Self {
            output,
            base_url: base_url.to_string(),
            status: EngineStatus::Stopped,
            load_id: 0,
            loaded_track: None,
            position: 0.0,
            duration: None,
            volume,
            failure: None,
            pending_seek: None,
        }
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    pub fn status(&self) -> EngineStatus {
        self.status
    }

    /// Seconds into the loaded track.
    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn failure(&self) -> Option<&TrackUnavailable> {
        self.failure.as_ref()
    }

    pub fn loaded_track_id(&self) -> Option<&str> {
        self.loaded_track.as_deref()
    }

    fn begin_load(&mut self, track: &Track) {
        self.load_id += 1;
        self.loaded_track = Some(track.id.clone());
        self.position = 0.0;
        self.duration = track.duration;
        self.failure = None;
        self.pending_seek = None;
        self.status = EngineStatus::Loading;

        let url = stream_url(&self.base_url, &track.id);
        debug!(load_id = self.load_id, track_id = %track.id, "loading track");
        self.output.load(self.load_id, &url);
    }

    /// Reconcile the output with the store's current track and play intent.
    pub fn sync(&mut self, store: &PlayerStore) {
        let Some(track) = store.current_track() else {
            if self.loaded_track.take().is_some() {
                debug!("current track cleared, stopping output");
                self.output.stop();
                self.status = EngineStatus::Stopped;
                self.position = 0.0;
                self.duration = None;
            }
            return;
        };

        if self.loaded_track.as_deref() != Some(track.id.as_str()) {
            self.begin_load(track);
            return;
        }

        match (self.status, store.is_playing()) {
            (EngineStatus::Paused, true) => {
                self.output.play();
                self.status = EngineStatus::Playing;
            }
            (EngineStatus::Playing, false) => {
                self.output.pause();
                self.status = EngineStatus::Paused;
            }
            // A finished or failed stream cannot resume; start it over.
            (EngineStatus::Ended | EngineStatus::Failed, true) => self.begin_load(track),
            _ => {}
        }
    }

    pub fn handle_event(&mut self, event: OutputEvent, store: &mut PlayerStore) {
        if self.loaded_track.is_none() || event.load_id() != self.load_id {
            debug!(
                event_load = event.load_id(),
                current_load = self.load_id,
                "ignoring stale output event"
            );
            return;
        }

        match event {
            OutputEvent::Loaded { duration, .. } => {
                if let Some(d) = duration.filter(|d| d.is_finite() && *d > 0.0) {
                    self.duration = Some(d);
                }
                if let Some(target) = self.pending_seek.take() {
                    self.position = self.clamp_position(target);
                    self.output.seek(self.position);
                }
                if store.is_playing() {
                    self.output.play();
                    self.status = EngineStatus::Playing;
                } else {
                    self.status = EngineStatus::Paused;
                }
            }
            OutputEvent::TimeUpdate { position, .. } => {
                if matches!(self.status, EngineStatus::Playing | EngineStatus::Paused) {
                    self.position = self.clamp_position(position);
                }
            }
            OutputEvent::Ended { .. } => {
                self.status = EngineStatus::Ended;
                if let Some(d) = self.duration {
                    self.position = d;
                }
                // The user may have picked another track since this load began.
                let still_current = store.current_track().map(|t| t.id.as_str())
                    == self.loaded_track.as_deref();
                if still_current {
                    let advanced = store.advance_after_end();
                    debug!(advanced, "track ended");
                } else {
                    debug!("track ended after a new selection, not advancing");
                }
                self.sync(store);
            }
            OutputEvent::LoadFailed { reason, .. } => {
                let track_id = self.loaded_track.clone().unwrap_or_default();
                warn!(track_id = %track_id, reason = %reason, "track unavailable");
                self.status = EngineStatus::Failed;
                store.set_is_playing(false);
                self.failure = Some(TrackUnavailable { track_id, reason });
            }
        }
    }

    pub fn play(&mut self, store: &mut PlayerStore) {
        if store.set_is_playing(true) {
            self.sync(store);
        }
    }

    pub fn pause(&mut self, store: &mut PlayerStore) {
        store.set_is_playing(false);
        self.sync(store);
    }

    pub fn toggle(&mut self, store: &mut PlayerStore) {
        if store.is_playing() {
            self.pause(store);
        } else {
            self.play(store);
        }
    }

    pub fn next(&mut self, store: &mut PlayerStore) -> bool {
        let moved = store.next();
        if moved {
            self.sync(store);
        }
        moved
    }

    pub fn previous(&mut self, store: &mut PlayerStore) -> bool {
        let moved = store.previous();
        if moved {
            self.sync(store);
        }
        moved
    }

    /// Reload the current track after a failure.
    pub fn retry(&mut self, store: &mut PlayerStore) -> bool {
        if self.status != EngineStatus::Failed {
            return false;
        }
        let Some(track) = store.current_track().cloned() else {
            return false;
        };
        info!(track_id = %track.id, "retrying track");
        store.set_is_playing(true);
        self.begin_load(&track);
        true
    }

    fn clamp_position(&self, seconds: f64) -> f64 {
        let lower = seconds.max(0.0);
        match self.duration {
            Some(d) => lower.min(d),
            None => lower,
        }
    }

    /// Jump to an absolute position, playing or paused. A finished stream
    /// is reloaded and positioned once it has loaded.
    pub fn seek(&mut self, target: f64) {
        let target = if target.is_finite() { target } else { 0.0 };
        let clamped = self.clamp_position(target);
        match self.status {
            EngineStatus::Playing | EngineStatus::Paused => {
                self.output.seek(clamped);
                self.position = clamped;
            }
            EngineStatus::Ended => {
                let Some(track_id) = self.loaded_track.clone() else {
                    return;
                };
                self.load_id += 1;
                self.status = EngineStatus::Loading;
                self.position = clamped;
                self.pending_seek = Some(clamped);
                debug!(load_id = self.load_id, track_id = %track_id, "reloading finished track to seek");
                let url = stream_url(&self.base_url, &track_id);
                self.output.load(self.load_id, &url);
            }
            _ => {}
        }
    }

    pub fn seek_by(&mut self, delta: f64) {
        self.seek(self.position + delta);
    }

    pub fn set_volume(&mut self, volume: f32) {
        let volume = if volume.is_nan() { 0.0 } else { volume.clamp(0.0, 1.0) };
        self.volume = volume;
        self.output.set_volume(volume);
    }
}
