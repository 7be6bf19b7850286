mod cache;
mod persist;
mod state;

pub use cache::LookupCache;
pub use persist::{PersistError, PersistedState, STORE_NAME, STORE_VERSION, load, save};
pub use state::{PlaybackContext, PlayerStore};
