use super::*;
use std::sync::mpsc;

fn make_track() -> Track {
    Track {
        id: "1aB-x_9".to_string(),
        name: "test.mp3".to_string(),
        mime_type: Some("audio/mpeg".to_string()),
        title: Some("Test Title".to_string()),
        artist: Some("Test Artist".to_string()),
        album: Some("Test Album".to_string()),
        year: None,
        genre: None,
        duration: Some(1.234567),
        bitrate: None,
        album_art_url: None,
    }
}

#[test]
fn set_track_metadata_sets_and_clears_shared_state() {
    let state = Arc::new(Mutex::new(SharedState::default()));
    let handle = MprisHandle {
        state: state.clone(),
    };

    let track = make_track();
    handle.set_track_metadata(
        Some(&track),
        Some("http://srv/api/stream?fileId=1aB-x_9".to_string()),
    );

    {
        let s = state.lock().unwrap();
        assert_eq!(s.title.as_deref(), Some("Test Title"));
        assert_eq!(s.artist, vec!["Test Artist".to_string()]);
        assert_eq!(s.album.as_deref(), Some("Test Album"));
        assert!(s.url.as_deref().unwrap().contains("fileId=1aB-x_9"));
        assert_eq!(s.length_micros, Some(1_234_567));
        assert_eq!(
            s.track_id.as_ref().map(|p| p.as_str()),
            Some("/org/mpris/MediaPlayer2/track/1aB_x_9")
        );
    }

    handle.set_track_metadata(None, None);
    {
        let s = state.lock().unwrap();
        assert_eq!(s.title, None);
        assert!(s.artist.is_empty());
        assert_eq!(s.album, None);
        assert_eq!(s.url, None);
        assert_eq!(s.length_micros, None);
        assert!(s.track_id.is_none());
    }
}

#[test]
fn untitled_tracks_fall_back_to_the_file_name() {
    let state = Arc::new(Mutex::new(SharedState::default()));
    let handle = MprisHandle {
        state: state.clone(),
    };
    let mut track = make_track();
    track.title = None;
    track.artist = None;
    handle.set_track_metadata(Some(&track), None);

    let s = state.lock().unwrap();
    assert_eq!(s.title.as_deref(), Some("test.mp3"));
    assert!(s.artist.is_empty());
}

#[test]
fn object_paths_are_sanitised() {
    assert_eq!(
        track_object_path("").map(|p| p.as_str().to_string()),
        Some("/org/mpris/MediaPlayer2/track/_".to_string())
    );
    assert_eq!(
        track_object_path("a.b/c").map(|p| p.as_str().to_string()),
        Some("/org/mpris/MediaPlayer2/track/a_b_c".to_string())
    );
}

#[test]
fn playback_status_maps_state_to_mpris_strings() {
    let state = Arc::new(Mutex::new(SharedState::default()));
    let (tx, _rx) = mpsc::channel::<ControlCmd>();
    let iface = PlayerIface {
        tx,
        state: state.clone(),
    };

    assert_eq!(iface.playback_status(), "Stopped");

    state.lock().unwrap().playback = MprisPlayback::Playing;
    assert_eq!(iface.playback_status(), "Playing");

    state.lock().unwrap().playback = MprisPlayback::Paused;
    assert_eq!(iface.playback_status(), "Paused");
}

#[test]
fn metadata_includes_expected_keys_when_present() {
    let state = Arc::new(Mutex::new(SharedState::default()));
    let (tx, _rx) = mpsc::channel::<ControlCmd>();
    let iface = PlayerIface {
        tx,
        state: state.clone(),
    };

    let handle = MprisHandle {
        state: state.clone(),
    };
    handle.set_track_metadata(Some(&make_track()), Some("http://srv/x".to_string()));

    let map = iface.metadata();
    for k in [
        "mpris:trackid",
        "xesam:title",
        "xesam:artist",
        "xesam:album",
        "xesam:url",
        "mpris:length",
    ] {
        assert!(map.contains_key(k), "missing key: {k}");
    }

    handle.set_track_metadata(None, None);
    let map = iface.metadata();
    assert!(map.contains_key("xesam:title"));
    assert!(!map.contains_key("mpris:trackid"));
}

#[test]
fn player_methods_forward_control_commands() {
    let state = Arc::new(Mutex::new(SharedState::default()));
    let (tx, rx) = mpsc::channel::<ControlCmd>();
    let iface = PlayerIface { tx, state };

    iface.play_pause();
    iface.next();
    iface.previous();
    let got: Vec<String> = rx.try_iter().map(|c| format!("{c:?}")).collect();
    assert_eq!(got, vec!["PlayPause", "Next", "Prev"]);
}
