use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::debug;

use crate::api::StreamSource;
use crate::config::AudioSettings;

use super::thread::spawn_audio_thread;
use super::types::{AudioCmd, AudioOutput, OutputEvent};

/// Handle to the audio thread. Cheap to call from the event loop; all work
/// happens on the thread.
pub struct AudioPlayer {
    tx: Sender<AudioCmd>,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl AudioPlayer {
    /// Spawn the audio thread. Output feedback arrives on the returned receiver.
    pub fn new(
        source: Arc<dyn StreamSource>,
        audio_settings: &AudioSettings,
    ) -> (Self, Receiver<OutputEvent>) {
        let (tx, rx) = mpsc::channel::<AudioCmd>();
        let (events_tx, events_rx) = mpsc::channel::<OutputEvent>();

        let audio_handle =
            spawn_audio_thread(rx, tx.clone(), events_tx, source, audio_settings.volume);

        (
            Self {
                tx,
                join: Mutex::new(Some(audio_handle)),
            },
            events_rx,
        )
    }

    pub fn send(&self, cmd: AudioCmd) -> Result<(), mpsc::SendError<AudioCmd>> {
        self.tx.send(cmd)
    }

    fn send_or_log(&self, cmd: AudioCmd) {
        if let Err(e) = self.send(cmd) {
            debug!(cmd = ?e.0, "audio thread is gone");
        }
    }

    pub fn quit_softly(&self, fade_out: Duration) {
        let _ = self.send(AudioCmd::Quit {
            fade_out_ms: fade_out.as_millis() as u64,
        });

        if let Ok(mut j) = self.join.lock() {
            if let Some(h) = j.take() {
                let _ = h.join();
            }
        }
    }
}

impl AudioOutput for AudioPlayer {
    fn load(&mut self, load_id: u64, url: &str) {
        self.send_or_log(AudioCmd::Load {
            load_id,
            url: url.to_string(),
        });
    }

    fn play(&mut self) {
        self.send_or_log(AudioCmd::Play);
    }

    fn pause(&mut self) {
        self.send_or_log(AudioCmd::Pause);
    }

    fn seek(&mut self, seconds: f64) {
        let target = Duration::try_from_secs_f64(seconds.max(0.0)).unwrap_or_default();
        self.send_or_log(AudioCmd::Seek(target));
    }

    fn set_volume(&mut self, volume: f32) {
        self.send_or_log(AudioCmd::SetVolume(volume));
    }

    fn stop(&mut self) {
        self.send_or_log(AudioCmd::Stop);
    }
}
