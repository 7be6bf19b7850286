//! On-disk layout of the persisted store.
//!
//! The file is a small JSON envelope naming the store and its layout
//! version; the snapshot lives under `state`. Playing/paused is a session
//! property and is never written.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::library::{AlbumInfo, ArtistInfo, Track};

pub const STORE_NAME: &str = "music-library";
pub const STORE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("cannot access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed store file {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{path} holds store {found:?}, expected {STORE_NAME:?}")]
    UnknownStore { path: PathBuf, found: String },
    #[error("{path} has store version {found}, this build reads up to {STORE_VERSION}")]
    UnsupportedVersion { path: PathBuf, found: u32 },
}

/// Everything that survives a restart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistedState {
    pub current_track: Option<Track>,
    pub queue: Vec<Track>,
    pub library: Vec<Track>,
    pub last_fetched: Option<DateTime<Utc>>,
    pub cached_artists: BTreeMap<String, ArtistInfo>,
    pub cached_albums: BTreeMap<String, AlbumInfo>,
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    name: String,
    version: u32,
    state: PersistedState,
}

/// Read the store. A missing file is not an error.
pub fn load(path: &Path) -> Result<Option<PersistedState>, PersistError> {
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(PersistError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let envelope: Envelope =
        serde_json::from_slice(&raw).map_err(|source| PersistError::Malformed {
            path: path.to_path_buf(),
            source,
        })?;

    if envelope.name != STORE_NAME {
        return Err(PersistError::UnknownStore {
            path: path.to_path_buf(),
            found: envelope.name,
        });
    }
    if envelope.version > STORE_VERSION {
        return Err(PersistError::UnsupportedVersion {
            path: path.to_path_buf(),
            found: envelope.version,
        });
    }

    debug!(path = %path.display(), tracks = envelope.state.library.len(), "store loaded");
    Ok(Some(envelope.state))
}

/// Write the store through a sibling temp file so a crash never leaves a
/// half-written file behind.
pub fn save(path: &Path, state: &PersistedState) -> Result<(), PersistError> {
    let io_err = |source| PersistError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let envelope = Envelope {
        name: STORE_NAME.to_string(),
        version: STORE_VERSION,
        state: state.clone(),
    };
    let body = serde_json::to_vec_pretty(&envelope).map_err(|source| PersistError::Malformed {
        path: path.to_path_buf(),
        source,
    })?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, body).map_err(io_err)?;
    fs::rename(&tmp, path).map_err(io_err)?;

    debug!(path = %path.display(), "store saved");
    Ok(())
}
