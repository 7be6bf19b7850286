use crate::api::stream_url;
use crate::app::App;
use crate::audio::EngineStatus;
use crate::mpris::{MprisHandle, MprisPlayback};

/// Map engine status and play intent onto the MPRIS playback status.
pub fn mpris_playback(status: EngineStatus, has_track: bool, is_playing: bool) -> MprisPlayback {
    match status {
        _ if !has_track => MprisPlayback::Stopped,
        EngineStatus::Stopped | EngineStatus::Ended => MprisPlayback::Stopped,
        _ if is_playing => MprisPlayback::Playing,
        _ => MprisPlayback::Paused,
    }
}

pub fn update_mpris(mpris: &MprisHandle, app: &App, status: EngineStatus, base_url: &str) {
    let track = app.store.current_track();
    let url = track.map(|t| stream_url(base_url, &t.id));
    mpris.set_track_metadata(track, url);
    mpris.set_playback(mpris_playback(
        status,
        track.is_some(),
        app.store.is_playing(),
    ));
}
