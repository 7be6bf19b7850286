//! Application module: exposes the app model used by the TUI and runtime.
//!
//! The `App` model lives in `app::model` and holds the player store, the
//! current view with its navigation history, selection and filter state.

mod model;

pub use model::*;
