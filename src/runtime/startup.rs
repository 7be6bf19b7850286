use tracing::{info, warn};

use crate::config;
use crate::logging;
use crate::store::{self, PlayerStore};

/// Install file logging. A failure leaves the app running without logs.
pub fn init_logging(settings: &config::Settings) {
    match logging::init(&settings.logging, settings.log_path().as_deref()) {
        Ok(path) => info!(path = %path.display(), "logging initialised"),
        Err(e) => eprintln!("drivetune: logging disabled: {e}"),
    }
}

/// Restore the persisted library, queue and caches. Unreadable state starts
/// an empty store rather than failing startup.
pub fn restore_store(settings: &config::Settings) -> PlayerStore {
    let Some(path) = settings.state_path() else {
        warn!("no data directory, library will not be persisted");
        return PlayerStore::new();
    };

    match store::load(&path) {
        Ok(Some(state)) => {
            let restored = PlayerStore::from_snapshot(state);
            info!(
                path = %path.display(),
                tracks = restored.catalog().len(),
                queued = restored.queue().len(),
                "restored library"
            );
            restored
        }
        Ok(None) => {
            info!(path = %path.display(), "no saved library yet");
            PlayerStore::new()
        }
        Err(e) => {
            warn!(error = %e, "could not restore library, starting empty");
            eprintln!("drivetune: {e}; starting with an empty library");
            PlayerStore::new()
        }
    }
}
