use std::{env, path::PathBuf};

use super::schema::Settings;

const APP_DIR: &str = "drivetune";

/// Configuration loading helpers.
///
/// `Settings::load` tries environment variables first (prefix `DRIVETUNE__`), then an
/// optional config file and falls back to struct defaults.
impl Settings {
    /// Load settings from environment and optional config file.
    pub fn load() -> Result<Self, ::config::ConfigError> {
        let config_path = resolve_config_path();

        let mut builder = ::config::Config::builder();

        if let Some(path) = &config_path {
            builder = builder.add_source(::config::File::from(path.as_path()).required(false));
        }

        builder = builder.add_source(
            ::config::Environment::with_prefix("DRIVETUNE")
                .separator("__")
                .try_parsing(true),
        );

        let cfg = builder.build()?;
        let settings: Settings = cfg.try_deserialize()?;
        Ok(settings)
    }

    /// Perform basic validation checks on loaded settings.
    pub fn validate(&self) -> Result<(), String> {
        let base = self.server.base_url.trim();
        if base.is_empty() {
            return Err("server.base_url must not be empty".to_string());
        }
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(format!(
                "server.base_url must start with http:// or https:// (got {base:?})"
            ));
        }
        if self.server.timeout_secs == 0 {
            return Err("server.timeout_secs must be >= 1".to_string());
        }
        if self.server.metadata_concurrency == 0 {
            return Err("server.metadata_concurrency must be >= 1".to_string());
        }
        if !(0.0..=1.0).contains(&self.audio.volume) {
            return Err(format!(
                "audio.volume must be within [0, 1] (got {})",
                self.audio.volume
            ));
        }
        Ok(())
    }

    /// Where the library store lives.
    pub fn state_path(&self) -> Option<PathBuf> {
        self.storage
            .state_path
            .clone()
            .or_else(|| default_data_dir().map(|d| d.join("library.json")))
    }

    /// Where log output goes.
    pub fn log_path(&self) -> Option<PathBuf> {
        self.logging
            .file
            .clone()
            .or_else(|| default_data_dir().map(|d| d.join("drivetune.log")))
    }
}

/// Resolve the config path from `DRIVETUNE_CONFIG_PATH` or XDG defaults.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Some(p) = env::var_os("DRIVETUNE_CONFIG_PATH") {
        let p = PathBuf::from(p);
        return Some(p);
    }
    default_config_path()
}

/// Compute the default config path under `$XDG_CONFIG_HOME/drivetune/config.toml`
/// or `~/.config/drivetune/config.toml` when `XDG_CONFIG_HOME` is not set.
pub fn default_config_path() -> Option<PathBuf> {
    xdg_dir("XDG_CONFIG_HOME", ".config").map(|d| d.join(APP_DIR).join("config.toml"))
}

/// `$XDG_DATA_HOME/drivetune` or `~/.local/share/drivetune`.
pub fn default_data_dir() -> Option<PathBuf> {
    xdg_dir("XDG_DATA_HOME", ".local/share").map(|d| d.join(APP_DIR))
}

fn xdg_dir(var: &str, home_fallback: &str) -> Option<PathBuf> {
    if let Some(xdg) = env::var_os(var).filter(|v| !v.is_empty()) {
        Some(PathBuf::from(xdg))
    } else {
        env::var_os("HOME").map(|home| PathBuf::from(home).join(home_fallback))
    }
}
