//! HTTP client for the library server.
//!
//! The server lists audio files from the drive folder, parses tags, enriches
//! artists and streams audio. This module wraps those endpoints and exposes
//! the `LibrarySource` / `ArtistSource` seams used by refresh and lookups.

mod client;
mod error;

pub use client::*;
pub use error::ApiError;

#[cfg(test)]
mod tests;
