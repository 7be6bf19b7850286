use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;

use rodio::{OutputStream, OutputStreamBuilder, Sink};
use tracing::{debug, info, warn};

use crate::api::StreamSource;
use crate::task::CancelToken;

use super::sink::{create_sink_from_bytes, fade_out_sink};
use super::types::{AudioCmd, OutputEvent};

/// Cadence of position reports and end-of-stream checks.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// The stream currently owned by the thread.
struct Current {
    load_id: u64,
    /// `None` while the download is still running.
    sink: Option<Sink>,
    /// Stops the download once this stream is replaced.
    download: CancelToken,
    want_playing: bool,
    ended_sent: bool,
}

/// Abandon a stream: stop its download and its playback.
fn release(old: Current) {
    old.download.cancel();
    if let Some(sink) = old.sink {
        sink.stop();
    }
}

pub(super) fn spawn_audio_thread(
    rx: Receiver<AudioCmd>,
    tx_cmd: Sender<AudioCmd>,
    events: Sender<OutputEvent>,
    source: Arc<dyn StreamSource>,
    initial_volume: f32,
) -> JoinHandle<()> {
    thread::spawn(move || {
        // A missing device is not fatal: every load reports a failure instead.
        let stream: Option<OutputStream> = match OutputStreamBuilder::open_default_stream() {
            Ok(mut stream) => {
                // rodio logs to stderr when OutputStream is dropped. That's useful in debugging,
                // but noisy for a TUI app.
                stream.log_on_drop(false);
                Some(stream)
            }
            Err(e) => {
                warn!(error = %e, "no audio output device");
                None
            }
        };

        let mut current: Option<Current> = None;
        let mut volume = initial_volume.clamp(0.0, 1.0);

        let emit = |event: OutputEvent| {
            if events.send(event).is_err() {
                debug!("output event dropped, receiver gone");
            }
        };

        loop {
            match rx.recv_timeout(POLL_INTERVAL) {
                Ok(cmd) => match cmd {
                    AudioCmd::Load { load_id, url } => {
                        if let Some(old) = current.take() {
                            release(old);
                        }
                        let download = CancelToken::new();
                        current = Some(Current {
                            load_id,
                            sink: None,
                            download: download.clone(),
                            want_playing: false,
                            ended_sent: false,
                        });

                        if stream.is_none() {
                            emit(OutputEvent::LoadFailed {
                                load_id,
                                reason: "no audio output device".to_string(),
                            });
                            continue;
                        }

                        // Download off-thread so commands keep flowing meanwhile.
                        let source = source.clone();
                        let tx_cmd = tx_cmd.clone();
                        debug!(load_id, url = %url, "stream download started");
                        thread::spawn(move || {
                            let bytes = source
                                .fetch_stream(&url, &download)
                                .map_err(|e| e.to_string());
                            let _ = tx_cmd.send(AudioCmd::StreamReady { load_id, bytes });
                        });
                    }

                    AudioCmd::StreamReady { load_id, bytes } => {
                        let Some(cur) = current.as_mut().filter(|c| c.load_id == load_id) else {
                            debug!(load_id, "discarding stale stream download");
                            continue;
                        };
                        let Some(stream) = stream.as_ref() else {
                            continue;
                        };

                        let attached =
                            bytes.and_then(|bytes| create_sink_from_bytes(stream, bytes, volume));
                        match attached {
                            Ok((sink, duration)) => {
                                if cur.want_playing {
                                    sink.play();
                                }
                                cur.sink = Some(sink);
                                emit(OutputEvent::Loaded {
                                    load_id,
                                    duration: duration.map(|d| d.as_secs_f64()),
                                });
                            }
                            Err(reason) => {
                                warn!(load_id, reason = %reason, "stream could not be loaded");
                                emit(OutputEvent::LoadFailed { load_id, reason });
                            }
                        }
                    }

                    AudioCmd::Play => {
                        if let Some(cur) = current.as_mut() {
                            cur.want_playing = true;
                            if let Some(s) = cur.sink.as_ref() {
                                s.play();
                            }
                        }
                    }

                    AudioCmd::Pause => {
                        if let Some(cur) = current.as_mut() {
                            cur.want_playing = false;
                            if let Some(s) = cur.sink.as_ref() {
                                s.pause();
                            }
                        }
                    }

                    AudioCmd::Seek(target) => {
                        let Some(cur) = current.as_mut() else {
                            continue;
                        };
                        if let Some(s) = cur.sink.as_ref() {
                            match s.try_seek(target) {
                                Ok(()) => cur.ended_sent = false,
                                Err(e) => warn!(error = %e, "seek failed"),
                            }
                        }
                    }

                    AudioCmd::SetVolume(v) => {
                        volume = v.clamp(0.0, 1.0);
                        if let Some(s) = current.as_ref().and_then(|c| c.sink.as_ref()) {
                            s.set_volume(volume);
                        }
                    }

                    AudioCmd::Stop => {
                        if let Some(old) = current.take() {
                            release(old);
                        }
                    }

                    AudioCmd::Quit { fade_out_ms } => {
                        let current = current.take();
                        if let Some(cur) = &current {
                            cur.download.cancel();
                        }
                        if let Some(s) = current.and_then(|c| c.sink) {
                            if !s.is_paused() {
                                // Fade out gently before stopping.
                                fade_out_sink(&s, fade_out_ms);
                            }
                            s.stop();
                        }
                        info!("audio thread exiting");
                        break;
                    }
                },
                Err(RecvTimeoutError::Timeout) => {
                    let Some(cur) = current.as_mut() else {
                        continue;
                    };
                    let Some(s) = cur.sink.as_ref() else {
                        continue;
                    };
                    if s.is_paused() {
                        continue;
                    }
                    if s.empty() {
                        if !cur.ended_sent {
                            cur.ended_sent = true;
                            emit(OutputEvent::Ended {
                                load_id: cur.load_id,
                            });
                        }
                    } else {
                        emit(OutputEvent::TimeUpdate {
                            load_id: cur.load_id,
                            position: s.get_pos().as_secs_f64(),
                        });
                    }
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
    })
}
