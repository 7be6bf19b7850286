//! Audio-related small types.
//!
//! This module defines the output capability the playback engine drives,
//! the commands understood by the audio thread and the feedback events it
//! reports back.

use std::time::Duration;

/// Where the playback engine sends its requests.
///
/// Every load is tagged with a `load_id`; feedback for an older load is
/// stale and must be ignored by the receiver.
pub trait AudioOutput {
    /// Point the output at a new stream. Playback starts paused.
    fn load(&mut self, load_id: u64, url: &str);
    fn play(&mut self);
    fn pause(&mut self);
    /// Absolute position in seconds.
    fn seek(&mut self, seconds: f64);
    /// Linear gain in `[0, 1]`.
    fn set_volume(&mut self, volume: f32);
    fn stop(&mut self);
}

/// Feedback from the output, tagged with the load it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputEvent {
    /// The stream is decoded and attached; `duration` is in seconds when known.
    Loaded { load_id: u64, duration: Option<f64> },
    LoadFailed { load_id: u64, reason: String },
    /// Periodic position report in seconds.
    TimeUpdate { load_id: u64, position: f64 },
    /// The stream played to its natural end.
    Ended { load_id: u64 },
}

impl OutputEvent {
    pub fn load_id(&self) -> u64 {
        match self {
            Self::Loaded { load_id, .. }
            | Self::LoadFailed { load_id, .. }
            | Self::TimeUpdate { load_id, .. }
            | Self::Ended { load_id } => *load_id,
        }
    }
}

#[derive(Debug)]
pub enum AudioCmd {
    /// Download, decode and attach a new stream, replacing the current one.
    Load { load_id: u64, url: String },
    /// Resume (or start) the attached stream.
    Play,
    /// Pause the attached stream.
    Pause,
    /// Jump to an absolute position.
    Seek(Duration),
    SetVolume(f32),
    /// Drop the attached stream.
    Stop,
    /// Quit the audio thread, optionally fading out over `fade_out_ms` milliseconds.
    Quit { fade_out_ms: u64 },
    /// A download started by `Load` finished on its helper thread.
    StreamReady {
        load_id: u64,
        bytes: Result<Vec<u8>, String>,
    },
}

/// Engine lifecycle for the loaded track.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum EngineStatus {
    /// Nothing loaded.
    #[default]
    Stopped,
    Loading,
    Playing,
    Paused,
    /// Played to the end with nothing queued after it.
    Ended,
    Failed,
}

impl EngineStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Loading => "loading",
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Ended => "ended",
            Self::Failed => "unavailable",
        }
    }
}

/// A track that could not be played. Recoverable: the queue is intact and
/// the track can be retried.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackUnavailable {
    pub track_id: String,
    pub reason: String,
}
