//! # Configuration Module
//!
//! Runtime settings, platform directories and credential resolution.
//!
//! ## Files
//!
//! - Settings: `<config dir>/moodplay/config.json` (optional)
//!   - Linux: `~/.config/moodplay/config.json`
//!   - macOS: `~/Library/Application Support/moodplay/config.json`
//!   - Windows: `%APPDATA%\moodplay\config.json`
//! - Token cache: `<data dir>/moodplay/spotify_token.json`
//!
//! Every settings field is optional; missing ones take their defaults and
//! command-line flags override whatever the file says.
//!
//! ## Credentials
//!
//! Credentials only come from flags or the environment
//! (`SPOTIFY_CLIENT_ID`, `SPOTIFY_CLIENT_SECRET`, `SPOTIFY_REDIRECT_URI`).
//! Nothing is embedded in the binary. When they are missing the player runs
//! in demo mode.

use crate::controller::DiscoveryPolicy;
use crate::emotion::Vocabulary;
use crate::error::{ConfigError, ConfigResult};
use crate::service::Credentials;
use anyhow::{Context, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Redirect URI registered for the player by default.
pub const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8888/callback";

const APP_DIR: &str = "moodplay";

/// Returns the platform data directory for moodplay, creating it if needed.
pub fn get_data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir().ok_or_else(|| {
        anyhow::anyhow!(
            "Could not determine system data directory. Please ensure your platform supports standard data directories."
        )
    })?;

    let app_dir = data_dir.join(APP_DIR);
    fs::create_dir_all(&app_dir).with_context(|| {
        format!(
            "Failed to create moodplay data directory at {}. Please check file permissions.",
            app_dir.display()
        )
    })?;

    Ok(app_dir)
}

/// Where the music service token is cached between runs.
pub fn get_token_cache_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join("spotify_token.json"))
}

/// Default location of the settings file (not created).
pub fn get_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.json"))
}

/// Tunables of the player loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Seconds between re-rolls of the random emotion source.
    pub emotion_interval_secs: u64,
    /// Minimum seconds between two dispatches; `None` disables the gate.
    pub cooldown_secs: Option<u64>,
    /// Device queries made at startup before giving up.
    pub discovery_attempts: u32,
    /// Seconds to wait between device queries.
    pub discovery_delay_secs: u64,
    /// Global timeout for a single HTTP request to the music service.
    pub request_timeout_secs: u64,
    /// Milliseconds between loop iterations.
    pub poll_interval_ms: u64,
    /// Label set of the random source.
    pub vocabulary: Vocabulary,
    /// Catalog file replacing the built-in playlists.
    pub catalog_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            emotion_interval_secs: 15,
            cooldown_secs: None,
            discovery_attempts: 3,
            discovery_delay_secs: 2,
            request_timeout_secs: 10,
            poll_interval_ms: 1000,
            vocabulary: Vocabulary::Basic,
            catalog_path: None,
        }
    }
}

impl Settings {
    /// Read settings from `path`.
    pub fn from_json_file(path: &Path) -> ConfigResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let settings: Settings = serde_json::from_str(&text).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load `path` if given, else the default settings file if it exists,
    /// else the defaults.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        if let Some(path) = path {
            return Self::from_json_file(path);
        }
        match get_config_path() {
            Some(default_path) if default_path.exists() => {
                debug!("Loading settings from {}", default_path.display());
                Self::from_json_file(&default_path)
            }
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.emotion_interval_secs == 0 {
            return Err(ConfigError::InvalidSetting(
                "emotion_interval_secs must be at least 1".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidSetting(
                "request_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidSetting(
                "poll_interval_ms must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn emotion_interval(&self) -> Duration {
        Duration::from_secs(self.emotion_interval_secs)
    }

    pub fn cooldown(&self) -> Option<Duration> {
        self.cooldown_secs.map(Duration::from_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn discovery_policy(&self) -> DiscoveryPolicy {
        DiscoveryPolicy {
            attempts: self.discovery_attempts,
            delay: Duration::from_secs(self.discovery_delay_secs),
        }
    }
}

/// Build credentials from the raw flag/environment values.
///
/// Returns `None` (with a warning) when the id or secret is missing, blank,
/// or still a `your_…` template placeholder.
pub fn resolve_credentials(
    client_id: Option<&str>,
    client_secret: Option<&str>,
    redirect_uri: Option<&str>,
) -> Option<Credentials> {
    fn usable(value: Option<&str>) -> Option<String> {
        let value = value?.trim();
        if value.is_empty() || value.starts_with("your_") {
            None
        } else {
            Some(value.to_string())
        }
    }

    match (usable(client_id), usable(client_secret)) {
        (Some(client_id), Some(client_secret)) => Some(Credentials {
            client_id,
            client_secret,
            redirect_uri: usable(redirect_uri).unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string()),
        }),
        _ => {
            warn!("Music service credentials are not configured, using demo mode");
            warn!("Set SPOTIFY_CLIENT_ID and SPOTIFY_CLIENT_SECRET to enable real playback");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.emotion_interval(), Duration::from_secs(15));
        assert_eq!(settings.cooldown(), None);
        assert_eq!(settings.discovery_policy(), DiscoveryPolicy::default());
        assert_eq!(settings.request_timeout(), Duration::from_secs(10));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"emotion_interval_secs": 10, "cooldown_secs": 10, "vocabulary": "extended"}}"#).unwrap();

        let settings = Settings::from_json_file(file.path()).unwrap();
        assert_eq!(settings.emotion_interval(), Duration::from_secs(10));
        assert_eq!(settings.cooldown(), Some(Duration::from_secs(10)));
        assert_eq!(settings.vocabulary, Vocabulary::Extended);
        assert_eq!(settings.discovery_attempts, 3);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"emotion_interval_secs": 0}}"#).unwrap();

        let err = Settings::from_json_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSetting(_)));
    }

    #[test]
    fn test_bad_json_is_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            Settings::from_json_file(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_explicit_missing_path_is_error() {
        assert!(Settings::load(Some(Path::new("/no/such/moodplay.json"))).is_err());
    }

    #[test]
    fn test_resolve_credentials() {
        let creds = resolve_credentials(Some("abc"), Some("def"), None).unwrap();
        assert_eq!(creds.client_id, "abc");
        assert_eq!(creds.redirect_uri, DEFAULT_REDIRECT_URI);

        let creds = resolve_credentials(Some("abc"), Some("def"), Some("http://localhost:9000/cb")).unwrap();
        assert_eq!(creds.redirect_uri, "http://localhost:9000/cb");
    }

    #[test]
    fn test_placeholder_credentials_are_missing() {
        assert!(resolve_credentials(Some("your_client_id"), Some("def"), None).is_none());
        assert!(resolve_credentials(Some("abc"), Some("  "), None).is_none());
        assert!(resolve_credentials(None, Some("def"), None).is_none());
    }

    #[test]
    fn test_config_path_layout() {
        // Only computes the path; nothing is created.
        if let Some(path) = get_config_path() {
            assert!(path.ends_with(Path::new("moodplay").join("config.json")));
        }
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"poll_interval_ms": 0}}"#).unwrap();

        let err = Settings::from_json_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSetting(ref msg) if msg.contains("poll_interval_ms")));
        assert!(Settings { poll_interval_ms: 1, ..Settings::default() }.validate().is_ok());
    }
}
