//! Error types for moodplay
//!
//! Error strategy:
//! - Configuration errors (catalog, settings files): fatal, raised while
//!   building components and propagated to `main`
//! - Music service errors: recoverable, absorbed by the playback controller
//!   which falls back to demo mode
//!
//! Messages include actionable suggestions where possible.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal configuration problems, reported before the player loop starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Playlist catalog has no usable 'neutral' entry\n  Tip: every catalog needs a non-empty neutral list, it is the fallback for unmapped emotions")]
    MissingNeutralFallback,

    #[error("Playlist entry for '{label}' has an empty id")]
    EmptyPlaylistId { label: String },

    #[error("Cannot read '{path}': {reason}\n  Tip: Check the path exists and is readable")]
    Read { path: PathBuf, reason: String },

    #[error("Invalid JSON in '{path}': {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("Invalid setting: {0}")]
    InvalidSetting(String),
}

/// Failures surfaced by a music service.
///
/// None of these are fatal to the playback controller: each one moves the
/// session into demo mode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("no active playback device\n  Tip: Open the music app on your phone or computer and play/pause a song to activate it")]
    NoActiveDevice,

    #[error("this feature requires a premium account")]
    PremiumRequired,

    #[error("service error: {0}")]
    Service(String),

    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl ServiceError {
    /// Short machine-friendly name, used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::Auth(_) => "auth",
            ServiceError::NoActiveDevice => "no-active-device",
            ServiceError::PremiumRequired => "premium-required",
            ServiceError::Service(_) => "service",
            ServiceError::Unexpected(_) => "unexpected",
        }
    }

    /// True when the cached login can no longer be trusted.
    pub fn invalidates_session(&self) -> bool {
        matches!(self, ServiceError::Auth(_))
    }
}

/// Result alias for configuration loading.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_auth_invalidates_session() {
        assert!(ServiceError::Auth("expired".into()).invalidates_session());
        assert!(!ServiceError::NoActiveDevice.invalidates_session());
        assert!(!ServiceError::PremiumRequired.invalidates_session());
        assert!(!ServiceError::Service("502".into()).invalidates_session());
    }

    #[test]
    fn test_messages_carry_context() {
        let err = ConfigError::Read {
            path: PathBuf::from("/tmp/catalog.json"),
            reason: "No such file".into(),
        };
        let text = err.to_string();
        assert!(text.contains("/tmp/catalog.json"));
        assert!(text.contains("No such file"));

        assert!(ServiceError::NoActiveDevice.to_string().contains("play/pause"));
        assert_eq!(ServiceError::Service("boom".into()).kind(), "service");
    }
}
