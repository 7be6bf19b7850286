use super::load::{default_config_path, default_data_dir, resolve_config_path};
use super::schema::*;
use std::sync::{Mutex, OnceLock};

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK.get_or_init(|| Mutex::new(())).lock().unwrap()
}

struct EnvGuard {
    key: &'static str,
    old: Option<std::ffi::OsString>,
}

impl EnvGuard {
    fn set(key: &'static str, val: &str) -> Self {
        let old = std::env::var_os(key);
        unsafe {
            std::env::set_var(key, val);
        }
        Self { key, old }
    }

    fn remove(key: &'static str) -> Self {
        let old = std::env::var_os(key);
        unsafe {
            std::env::remove_var(key);
        }
        Self { key, old }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        match self.old.take() {
            Some(v) => unsafe {
                std::env::set_var(self.key, v);
            },
            None => unsafe {
                std::env::remove_var(self.key);
            },
        }
    }
}

#[test]
fn resolve_config_path_prefers_drivetune_config_path() {
    let _lock = env_lock();
    let _g1 = EnvGuard::set("DRIVETUNE_CONFIG_PATH", "/tmp/drivetune-test-config.toml");
    assert_eq!(
        resolve_config_path().unwrap(),
        std::path::PathBuf::from("/tmp/drivetune-test-config.toml")
    );
}

#[test]
fn default_config_path_prefers_xdg_config_home() {
    let _lock = env_lock();
    let _g1 = EnvGuard::set("XDG_CONFIG_HOME", "/tmp/xdg-config-home");
    let _g2 = EnvGuard::set("HOME", "/tmp/home-should-not-win");

    let p = default_config_path().unwrap();
    assert_eq!(
        p,
        std::path::PathBuf::from("/tmp/xdg-config-home")
            .join("drivetune")
            .join("config.toml")
    );
}

#[test]
fn default_config_path_falls_back_to_home_dot_config() {
    let _lock = env_lock();
    let _g1 = EnvGuard::remove("XDG_CONFIG_HOME");
    let _g2 = EnvGuard::set("HOME", "/tmp/home-dir");

    let p = default_config_path().unwrap();
    assert_eq!(
        p,
        std::path::PathBuf::from("/tmp/home-dir")
            .join(".config")
            .join("drivetune")
            .join("config.toml")
    );
}

#[test]
fn data_paths_follow_xdg_data_home_unless_overridden() {
    let _lock = env_lock();
    let _g1 = EnvGuard::set("XDG_DATA_HOME", "/tmp/xdg-data");

    assert_eq!(
        default_data_dir().unwrap(),
        std::path::PathBuf::from("/tmp/xdg-data/drivetune")
    );

    let mut s = Settings::default();
    assert_eq!(
        s.state_path().unwrap(),
        std::path::PathBuf::from("/tmp/xdg-data/drivetune/library.json")
    );
    assert_eq!(
        s.log_path().unwrap(),
        std::path::PathBuf::from("/tmp/xdg-data/drivetune/drivetune.log")
    );

    s.storage.state_path = Some("/srv/music/state.json".into());
    assert_eq!(
        s.state_path().unwrap(),
        std::path::PathBuf::from("/srv/music/state.json")
    );
}

#[test]
fn settings_load_from_config_file() {
    let _lock = env_lock();

    let dir = tempfile::tempdir().unwrap();
    let cfg_path = dir.path().join("config.toml");
    std::fs::write(
        &cfg_path,
        r#"
[server]
base_url = "https://music.example.org"
timeout_secs = 12
metadata_concurrency = 8

[audio]
volume = 0.5
quit_fade_out_ms = 123

[controls]
scrub_seconds = 9
volume_step = 0.1

[ui]
header_text = "hello"
now_playing_track_fields = ["artist", "title", "year"]
now_playing_track_separator = " • "
now_playing_time_fields = ["elapsed", "remaining"]
now_playing_time_separator = " | "
recent_limit = 10

[storage]
state_path = "/tmp/drivetune-state.json"
refresh_on_start = false

[logging]
level = "debug"
"#,
    )
    .unwrap();

    let _g1 = EnvGuard::set("DRIVETUNE_CONFIG_PATH", cfg_path.to_str().unwrap());
    let _g2 = EnvGuard::remove("DRIVETUNE__AUDIO__VOLUME");

    let s = Settings::load().unwrap();
    assert_eq!(s.server.base_url, "https://music.example.org");
    assert_eq!(s.server.timeout_secs, 12);
    assert_eq!(s.server.metadata_concurrency, 8);
    assert_eq!(s.audio.volume, 0.5);
    assert_eq!(s.audio.quit_fade_out_ms, 123);
    assert_eq!(s.controls.scrub_seconds, 9);
    assert_eq!(s.ui.header_text, "hello");
    assert_eq!(
        s.ui.now_playing_track_fields,
        vec![
            TrackDisplayField::Artist,
            TrackDisplayField::Title,
            TrackDisplayField::Year
        ]
    );
    assert_eq!(s.ui.now_playing_track_separator, " • ");
    assert_eq!(
        s.ui.now_playing_time_fields,
        vec![TimeField::Elapsed, TimeField::Remaining]
    );
    assert_eq!(s.ui.now_playing_time_separator, " | ");
    assert_eq!(s.ui.recent_limit, 10);
    assert_eq!(s.ui.featured_limit, 6);
    assert_eq!(
        s.storage.state_path,
        Some(std::path::PathBuf::from("/tmp/drivetune-state.json"))
    );
    assert!(!s.storage.refresh_on_start);
    assert_eq!(s.logging.level, "debug");
    assert!(s.validate().is_ok());
}

#[test]
fn settings_env_overrides_config_file() {
    let _lock = env_lock();

    let dir = tempfile::tempdir().unwrap();
    let cfg_path = dir.path().join("config.toml");
    std::fs::write(
        &cfg_path,
        r#"
[controls]
scrub_seconds = 30
"#,
    )
    .unwrap();

    let _g1 = EnvGuard::set("DRIVETUNE_CONFIG_PATH", cfg_path.to_str().unwrap());
    let _g2 = EnvGuard::set("DRIVETUNE__CONTROLS__SCRUB_SECONDS", "3");

    let s = Settings::load().unwrap();
    assert_eq!(s.controls.scrub_seconds, 3);
}

#[test]
fn validate_rejects_unusable_settings() {
    assert!(Settings::default().validate().is_ok());

    let mut s = Settings::default();
    s.server.base_url = "  ".into();
    assert!(s.validate().is_err());

    let mut s = Settings::default();
    s.server.base_url = "ftp://example.org".into();
    assert!(s.validate().unwrap_err().contains("http"));

    let mut s = Settings::default();
    s.server.metadata_concurrency = 0;
    assert!(s.validate().is_err());

    let mut s = Settings::default();
    s.server.timeout_secs = 0;
    assert!(s.validate().is_err());

    let mut s = Settings::default();
    s.audio.volume = 1.5;
    assert!(s.validate().is_err());
}

#[test]
fn effective_settings_render_as_toml() {
    let rendered = toml::to_string_pretty(&Settings::default()).unwrap();
    assert!(rendered.contains("[server]"));
    assert!(rendered.contains("base_url = \"http://localhost:3000\""));
    assert!(rendered.contains("[logging]"));

    let parsed: Settings = toml::from_str(&rendered).unwrap();
    assert_eq!(parsed.ui.recent_limit, 6);
}
