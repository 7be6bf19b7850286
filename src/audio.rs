mod engine;
mod player;
mod sink;
mod thread;
mod types;

pub use engine::PlaybackEngine;
pub use player::AudioPlayer;
pub use types::{AudioCmd, AudioOutput, EngineStatus, OutputEvent, TrackUnavailable};
