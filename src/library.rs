mod browse;
mod display;
mod lookup;
mod model;
mod refresh;

pub use browse::*;
pub use display::display_from_fields;
pub use lookup::{ArtistLookups, LookupEvent, album_info};
pub use model::*;
pub use refresh::{LibraryEvent, RefreshError, RefreshOutcome, Refresher, build_catalog};

#[cfg(test)]
mod tests;
