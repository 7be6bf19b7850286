use std::env;
use std::sync::{Arc, mpsc};

use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::info;

use crate::api::ApiClient;
use crate::app::App;
use crate::audio::{AudioPlayer, PlaybackEngine};
use crate::library::{ArtistLookups, Refresher};
use crate::mpris::ControlCmd;

mod event_loop;
mod mpris_sync;
mod settings;
mod startup;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let settings = settings::load_settings();

    if env::args().skip(1).any(|a| a == "--print-config") {
        print!("{}", toml::to_string_pretty(&settings)?);
        return Ok(());
    }

    startup::init_logging(&settings);
    info!(server = %settings.server.base_url, "drivetune starting");

    let store = startup::restore_store(&settings);
    let mut app = App::new(store, &settings.ui);

    let api = Arc::new(ApiClient::new(&settings.server));
    let (audio_player, output_rx) = AudioPlayer::new(api.clone(), &settings.audio);
    let mut engine = PlaybackEngine::new(audio_player, api.base_url(), settings.audio.volume);

    let (control_tx, control_rx) = mpsc::channel::<ControlCmd>();
    let mpris = crate::mpris::spawn_mpris(control_tx.clone());

    let (library_tx, library_rx) = mpsc::channel();
    let (lookup_tx, lookup_rx) = mpsc::channel();
    let mut services = event_loop::Services {
        api,
        refresher: Refresher::new(settings.server.metadata_concurrency),
        lookups: ArtistLookups::new(),
        mpris,
        output_rx,
        library_tx,
        library_rx,
        lookup_tx,
        lookup_rx,
        control_tx,
        control_rx,
    };

    if app.store.catalog().is_empty() && settings.storage.refresh_on_start {
        services.refresh(&mut app);
    }

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let run_result: Result<(), Box<dyn std::error::Error>> = (|| {
        let mut state = event_loop::EventLoopState::new(&app, settings.state_path());

        event_loop::run(
            &mut terminal,
            &settings,
            &mut app,
            &mut engine,
            &mut services,
            &mut state,
        )
    })();

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    run_result
}
