//! Music service capability.
//!
//! The playback controller talks to the streaming service only through
//! [`MusicService`]. The production implementation is
//! [`crate::spotify::SpotifyClient`]; tests script their own.

use crate::catalog::PlaylistId;
use crate::error::ServiceError;
use std::fmt;

/// Permissions requested during authentication.
pub const PLAYBACK_SCOPE: &str = "user-read-playback-state,user-modify-playback-state";

/// Developer credentials for the music service.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

// Keep the secret out of logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}

/// A playback endpoint reported by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceHandle {
    pub id: String,
    pub name: String,
}

impl DeviceHandle {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// The calls the playback state machine issues against a streaming service.
///
/// Sessions are passed mutably so implementations can refresh tokens in place.
pub trait MusicService {
    type Session;

    /// Log in. May block on user interaction.
    fn authenticate(&mut self, credentials: &Credentials, scope: &str) -> Result<Self::Session, ServiceError>;

    /// Devices currently available for playback, most relevant first.
    fn list_devices(&mut self, session: &mut Self::Session) -> Result<Vec<DeviceHandle>, ServiceError>;

    fn start_playback(
        &mut self,
        session: &mut Self::Session,
        device: &DeviceHandle,
        playlist: &PlaylistId,
    ) -> Result<(), ServiceError>;

    fn playlist_name(&mut self, session: &mut Self::Session, playlist: &PlaylistId) -> Result<String, ServiceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_debug_hides_secret() {
        let creds = Credentials {
            client_id: "abc".into(),
            client_secret: "super-secret".into(),
            redirect_uri: "http://127.0.0.1:8888/callback".into(),
        };
        let printed = format!("{creds:?}");
        assert!(printed.contains("abc"));
        assert!(!printed.contains("super-secret"));
    }
}
