//! File-backed `tracing` setup.
//!
//! The terminal belongs to the UI, so log output goes to a file.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use crate::config::LoggingSettings;

/// Environment variable holding a filter directive that overrides `logging.level`.
pub const LOG_ENV: &str = "DRIVETUNE_LOG";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("no log file location (set logging.file or HOME)")]
    NoLocation,
    #[error("cannot open log file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid log filter {directive:?}: {message}")]
    Filter { directive: String, message: String },
    #[error("a global subscriber is already installed")]
    AlreadyInstalled,
}

/// Filter from `DRIVETUNE_LOG` when set, else the configured level.
pub fn build_filter(settings: &LoggingSettings) -> Result<EnvFilter, LoggingError> {
    let directive = std::env::var(LOG_ENV)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| settings.level.clone());

    EnvFilter::try_new(&directive).map_err(|e| LoggingError::Filter {
        directive,
        message: e.to_string(),
    })
}

/// Install the global subscriber, appending to `path`.
pub fn init(settings: &LoggingSettings, path: Option<&Path>) -> Result<PathBuf, LoggingError> {
    let path = path.ok_or(LoggingError::NoLocation)?.to_path_buf();
    let env_filter = build_filter(settings)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| LoggingError::Open {
            path: path.clone(),
            source,
        })?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|source| LoggingError::Open {
            path: path.clone(),
            source,
        })?;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_writer(Mutex::new(file));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|_| LoggingError::AlreadyInstalled)?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_level_is_a_valid_filter() {
        let settings = LoggingSettings {
            level: "drivetune=debug,warn".into(),
            file: None,
        };
        // DRIVETUNE_LOG is not set by the test harness.
        if std::env::var_os(LOG_ENV).is_none() {
            assert!(build_filter(&settings).is_ok());
        }
    }

    #[test]
    fn bad_directive_is_reported() {
        let settings = LoggingSettings {
            level: "drivetune=loudest".into(),
            file: None,
        };
        if std::env::var_os(LOG_ENV).is_none() {
            assert!(matches!(
                build_filter(&settings),
                Err(LoggingError::Filter { .. })
            ));
        }
    }

    #[test]
    fn missing_location_is_an_error() {
        let settings = LoggingSettings::default();
        assert!(matches!(
            init(&settings, None),
            Err(LoggingError::NoLocation)
        ));
    }
}
