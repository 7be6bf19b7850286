//! Utilities for creating `rodio` sinks from downloaded stream bytes.
//!
//! The helper here decodes an in-memory stream and prepares a paused
//! `Sink` at the current volume.

use std::io::Cursor;
use std::time::Duration;

use rodio::{Decoder, OutputStream, Sink, Source};

/// Create a paused `Sink` playing `bytes`, plus the decoded duration if the
/// container reports one.
pub(super) fn create_sink_from_bytes(
    stream: &OutputStream,
    bytes: Vec<u8>,
    volume: f32,
) -> Result<(Sink, Option<Duration>), String> {
    if bytes.is_empty() {
        return Err("empty stream".to_string());
    }

    let source = Decoder::new(Cursor::new(bytes)).map_err(|e| format!("cannot decode stream: {e}"))?;
    let duration = source.total_duration();

    let sink = Sink::connect_new(stream.mixer());
    sink.pause();
    sink.set_volume(volume);
    sink.append(source);
    Ok((sink, duration))
}

/// Ramp the sink volume down to silence over `fade_out_ms`.
pub(super) fn fade_out_sink(sink: &Sink, fade_out_ms: u64) {
    if fade_out_ms == 0 {
        sink.set_volume(0.0);
        return;
    }
    let steps: u64 = 20;
    let step_ms = (fade_out_ms / steps).max(1);
    let start = sink.volume();
    for step in 1..=steps {
        let t = step as f32 / steps as f32;
        sink.set_volume(start * (1.0 - t));
        std::thread::sleep(Duration::from_millis(step_ms));
    }
    sink.set_volume(0.0);
}
