use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender};
use std::time::{Duration, Instant};

use chrono::Utc;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::app::{App, View};
use crate::audio::{AudioPlayer, EngineStatus, OutputEvent, PlaybackEngine};
use crate::config;
use crate::library::{ArtistLookups, LibraryEvent, LookupEvent, Refresher};
use crate::mpris::{ControlCmd, MprisHandle};
use crate::runtime::mpris_sync::update_mpris;
use crate::store;
use crate::ui::{self, PlaybackView};

const SAVE_INTERVAL: Duration = Duration::from_secs(1);

pub type Engine = PlaybackEngine<AudioPlayer>;

/// Background services and the channels their results come back on.
pub struct Services {
    pub api: Arc<ApiClient>,
    pub refresher: Refresher,
    pub lookups: ArtistLookups,
    pub mpris: MprisHandle,
    pub output_rx: Receiver<OutputEvent>,
    pub library_tx: Sender<LibraryEvent>,
    pub library_rx: Receiver<LibraryEvent>,
    pub lookup_tx: Sender<LookupEvent>,
    pub lookup_rx: Receiver<LookupEvent>,
    pub control_tx: Sender<ControlCmd>,
    pub control_rx: Receiver<ControlCmd>,
}

impl Services {
    /// Kick off a library refresh, superseding any running one.
    pub fn refresh(&mut self, app: &mut App) {
        let generation = self
            .refresher
            .start(self.api.clone(), self.library_tx.clone());
        app.set_message(format!("refreshing library (#{generation})"));
    }
}

/// State tracked by the runtime event loop across iterations.
pub struct EventLoopState {
    /// Internal two-key prefix state used for `gg` handling.
    pub pending_gg: bool,
    /// Last (track id, engine status, playing) pushed to MPRIS.
    last_mpris: Option<(Option<String>, EngineStatus, bool)>,
    /// Store revision last written to disk.
    saved_revision: u64,
    last_save: Instant,
    state_path: Option<PathBuf>,
    last_failure: Option<String>,
    /// Artist view open on the previous tick.
    last_artist: Option<String>,
}

impl EventLoopState {
    /// Construct a new `EventLoopState` seeded from `app`.
    pub fn new(app: &App, state_path: Option<PathBuf>) -> Self {
        Self {
            pending_gg: false,
            last_mpris: None,
            saved_revision: app.store.revision(),
            last_save: Instant::now(),
            state_path,
            last_failure: None,
            last_artist: None,
        }
    }

    /// Write the store when it changed, at most once per `SAVE_INTERVAL`
    /// unless `force` is set.
    pub fn persist(&mut self, app: &App, force: bool) {
        let revision = app.store.revision();
        if revision == self.saved_revision {
            return;
        }
        if !force && self.last_save.elapsed() < SAVE_INTERVAL {
            return;
        }
        let Some(path) = &self.state_path else {
            return;
        };
        self.last_save = Instant::now();
        match store::save(path, &app.store.snapshot()) {
            Ok(()) => {
                debug!(revision, "library saved");
                self.saved_revision = revision;
            }
            Err(e) => warn!(error = %e, "could not save library"),
        }
    }
}

/// Main terminal event loop: handles input, UI drawing, sync with the audio
/// thread and MPRIS. Returns `Ok(())` when shutdown is requested.
pub fn run(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    settings: &config::Settings,
    app: &mut App,
    engine: &mut Engine,
    services: &mut Services,
    state: &mut EventLoopState,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        while let Ok(ev) = services.output_rx.try_recv() {
            engine.handle_event(ev, &mut app.store);
        }
        if let Some(failure) = engine.failure() {
            if state.last_failure.as_deref() != Some(failure.track_id.as_str()) {
                state.last_failure = Some(failure.track_id.clone());
                app.set_message(format!("track unavailable: {} ([r] retries)", failure.reason));
            }
        } else {
            state.last_failure = None;
        }

        drain_library_events(app, services);
        sync_artist_lookup(app, services, state);

        // The store is the source of truth; bring the output in line with it.
        engine.sync(&app.store);

        let mpris_key = (
            app.store.current_track().map(|t| t.id.clone()),
            engine.status(),
            app.store.is_playing(),
        );
        if state.last_mpris.as_ref() != Some(&mpris_key) {
            update_mpris(
                &services.mpris,
                app,
                engine.status(),
                &settings.server.base_url,
            );
            state.last_mpris = Some(mpris_key);
        }

        state.persist(app, false);

        let rows = app.visible_rows();
        let playback = PlaybackView {
            status: engine.status(),
            position: engine.position(),
            duration: engine.duration(),
            volume: engine.volume(),
            refreshing: services.refresher.is_refreshing(),
        };
        terminal.draw(|f| ui::draw(f, app, &rows, &playback, &settings.ui, &settings.controls))?;

        while let Ok(cmd) = services.control_rx.try_recv() {
            if handle_control_cmd(cmd, app, engine) {
                return shutdown(settings, app, engine, state);
            }
        }

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if handle_key_event(key, settings, app, engine, services, state) {
                    return shutdown(settings, app, engine, state);
                }
            }
        }
    }
}

fn shutdown(
    settings: &config::Settings,
    app: &App,
    engine: &Engine,
    state: &mut EventLoopState,
) -> Result<(), Box<dyn std::error::Error>> {
    info!("shutting down");
    state.persist(app, true);
    engine
        .output()
        .quit_softly(Duration::from_millis(settings.audio.quit_fade_out_ms));
    Ok(())
}

fn drain_library_events(app: &mut App, services: &mut Services) {
    while let Ok(LibraryEvent::Refreshed { generation, result }) = services.library_rx.try_recv()
    {
        if !services.refresher.accept(generation) {
            continue;
        }
        match result {
            Ok(outcome) => {
                let count = outcome.tracks.len();
                app.store.replace_library(outcome.tracks, Some(Utc::now()));
                app.library_changed();
                if outcome.metadata_failures > 0 {
                    app.set_message(format!(
                        "library refreshed: {count} tracks ({} without tags)",
                        outcome.metadata_failures
                    ));
                } else {
                    app.set_message(format!("library refreshed: {count} tracks"));
                }
                info!(generation, count, "library refresh committed");
            }
            Err(e) => {
                warn!(generation, error = %e, "library refresh failed");
                app.set_message(format!("refresh failed: {e}"));
            }
        }
    }
}

fn sync_artist_lookup(app: &mut App, services: &mut Services, state: &mut EventLoopState) {
    while let Ok(ev) = services.lookup_rx.try_recv() {
        if let Some(name) = services.lookups.accept(ev, app.store.cache_mut()) {
            debug!(artist = %name, "artist info cached");
        }
    }

    let wanted = app.wanted_artist().map(str::to_string);
    if wanted != state.last_artist {
        // Opening an artist view again is the only retry for an unknown artist.
        if let Some(name) = &wanted {
            services.lookups.forget(name);
        }
        state.last_artist = wanted.clone();
    }

    match wanted {
        Some(name) => {
            services.lookups.ensure(
                &name,
                app.store.cache(),
                services.api.clone(),
                &services.lookup_tx,
            );
        }
        None => {
            if services.lookups.pending().is_some() {
                services.lookups.cancel();
            }
        }
    }
}

/// Returns true when the app should quit.
fn handle_control_cmd(cmd: ControlCmd, app: &mut App, engine: &mut Engine) -> bool {
    let store = &mut app.store;
    match cmd {
        ControlCmd::Quit => return true,
        ControlCmd::Play => engine.play(store),
        ControlCmd::Pause => engine.pause(store),
        ControlCmd::PlayPause => engine.toggle(store),
        ControlCmd::Stop => {
            engine.pause(store);
            engine.seek(0.0);
        }
        ControlCmd::Next => {
            engine.next(store);
        }
        ControlCmd::Prev => {
            engine.previous(store);
        }
    }
    false
}

/// Returns true when the app should quit.
fn handle_key_event(
    key: KeyEvent,
    settings: &config::Settings,
    app: &mut App,
    engine: &mut Engine,
    services: &mut Services,
    state: &mut EventLoopState,
) -> bool {
    if app.filter_mode {
        state.pending_gg = false;
        match key.code {
            KeyCode::Esc => app.clear_filter(),
            KeyCode::Backspace => app.pop_filter_char(),
            KeyCode::Char('j') | KeyCode::Char('n')
                if key.modifiers.contains(KeyModifiers::CONTROL) =>
            {
                app.next()
            }
            KeyCode::Char('k') | KeyCode::Char('p')
                if key.modifiers.contains(KeyModifiers::CONTROL) =>
            {
                app.prev()
            }
            KeyCode::Down => app.next(),
            KeyCode::Up => app.prev(),
            KeyCode::Char(c) => {
                if !c.is_control() {
                    app.push_filter_char(c);
                }
            }
            KeyCode::Enter => {
                if app.visible_rows().is_empty() {
                    return false;
                }
                app.exit_filter_mode();
                app.activate();
            }
            _ => {}
        }
        return false;
    }

    let is_g = key.code == KeyCode::Char('g');
    let was_gg = state.pending_gg;
    if !is_g {
        state.pending_gg = false;
    }

    let scrub = settings.controls.scrub_seconds as f64;
    let step = settings.controls.volume_step;

    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Char('1') => app.switch_to(View::Home),
        KeyCode::Char('2') => app.switch_to(View::Albums),
        KeyCode::Char('3') => app.switch_to(View::Artists),
        KeyCode::Char('4') => app.switch_to(View::Queue),
        KeyCode::Char('/') => app.enter_filter_mode(),
        KeyCode::Char('g') => {
            if was_gg {
                state.pending_gg = false;
                app.select_first();
            } else {
                state.pending_gg = true;
            }
        }
        KeyCode::Char('G') => app.select_last(),
        KeyCode::Char('j') | KeyCode::Down => app.next(),
        KeyCode::Char('k') | KeyCode::Up => app.prev(),
        KeyCode::Enter => app.activate(),
        KeyCode::Backspace | KeyCode::Esc => {
            if !app.back() && !app.filter_query.is_empty() {
                app.clear_filter();
            }
        }
        KeyCode::Char('p') | KeyCode::Char(' ') => {
            let _ = services.control_tx.send(ControlCmd::PlayPause);
        }
        KeyCode::Char('l') => {
            let _ = services.control_tx.send(ControlCmd::Next);
        }
        KeyCode::Char('h') => {
            let _ = services.control_tx.send(ControlCmd::Prev);
        }
        KeyCode::Char('L') => engine.seek_by(scrub),
        KeyCode::Char('H') => engine.seek_by(-scrub),
        KeyCode::Char('+') | KeyCode::Char('=') => engine.set_volume(engine.volume() + step),
        KeyCode::Char('-') => engine.set_volume(engine.volume() - step),
        KeyCode::Char('a') => {
            if app.add_selected_to_queue() == 0 {
                app.set_message("nothing to queue");
            }
        }
        KeyCode::Char('d') => app.remove_selected_from_queue(),
        KeyCode::Char('c') => {
            if app.view == View::Queue {
                app.clear_queue();
                app.set_message("queue cleared");
            }
        }
        KeyCode::Char('P') => app.play_selected_album(),
        KeyCode::Char('r') => {
            if !engine.retry(&mut app.store) {
                app.set_message("nothing to retry");
            }
        }
        KeyCode::Char('R') => services.refresh(app),
        KeyCode::Char('K') => app.toggle_metadata_window(),
        _ => {}
    }

    false
}
