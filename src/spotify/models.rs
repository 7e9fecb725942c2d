//! Wire types of the Spotify Web API and the local token cache.

use serde::{Deserialize, Serialize};

/// Seconds of slack before expiry at which a token is treated as expired.
const EXPIRY_MARGIN_SECS: u64 = 60;

/// An access token as stored in the token cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Unix timestamp (seconds) after which the access token is invalid.
    pub expires_at: u64,
    #[serde(default)]
    pub scope: String,
}

impl Token {
    pub fn is_expired(&self, now_secs: u64) -> bool {
        now_secs + EXPIRY_MARGIN_SECS >= self.expires_at
    }

    /// Whether this token was granted every scope in the comma-separated `scope`.
    pub fn covers_scope(&self, scope: &str) -> bool {
        let granted: Vec<&str> = self.scope.split([' ', ',']).filter(|s| !s.is_empty()).collect();
        scope
            .split([' ', ','])
            .filter(|s| !s.is_empty())
            .all(|wanted| granted.contains(&wanted))
    }
}

/// Body of a successful `POST /api/token`.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    pub expires_in: u64,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenResponse {
    /// Convert to a cacheable token. Refresh responses often omit the
    /// refresh token, in which case `previous_refresh` is kept.
    pub fn into_token(self, now_secs: u64, previous_refresh: Option<String>, requested_scope: &str) -> Token {
        Token {
            access_token: self.access_token,
            refresh_token: self.refresh_token.or(previous_refresh),
            expires_at: now_secs + self.expires_in,
            scope: self.scope.unwrap_or_else(|| requested_scope.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserProfile {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DevicesResponse {
    #[serde(default)]
    pub devices: Vec<Device>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Device {
    pub id: Option<String>,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub is_restricted: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlaylistInfo {
    pub name: String,
}

/// Regular API error: `{"error": {"status": 404, "message": "...", "reason": "NO_ACTIVE_DEVICE"}}`.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub error: ApiError,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiError {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Accounts service error: `{"error": "invalid_grant", "error_description": "..."}`.
#[derive(Debug, Deserialize)]
pub(crate) struct AuthErrorBody {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(expires_at: u64, scope: &str) -> Token {
        Token {
            access_token: "a".into(),
            refresh_token: Some("r".into()),
            expires_at,
            scope: scope.into(),
        }
    }

    #[test]
    fn test_expiry_uses_margin() {
        let t = token(1_000, "");
        assert!(!t.is_expired(900));
        assert!(t.is_expired(950));
        assert!(t.is_expired(2_000));
    }

    #[test]
    fn test_scope_coverage_accepts_both_separators() {
        let t = token(0, "user-read-playback-state user-modify-playback-state");
        assert!(t.covers_scope("user-read-playback-state,user-modify-playback-state"));
        assert!(!t.covers_scope("user-read-playback-state,playlist-modify-private"));
    }

    #[test]
    fn test_refresh_response_keeps_old_refresh_token() {
        let response: TokenResponse = serde_json::from_str(r#"{"access_token": "new", "token_type": "Bearer", "expires_in": 3600}"#).unwrap();
        let t = response.into_token(100, Some("old-refresh".into()), "scope-a");
        assert_eq!(t.access_token, "new");
        assert_eq!(t.refresh_token.as_deref(), Some("old-refresh"));
        assert_eq!(t.expires_at, 3_700);
        assert_eq!(t.scope, "scope-a");
    }

    #[test]
    fn test_device_list_tolerates_missing_fields() {
        let body = r#"{"devices": [{"id": null, "name": "Web Player", "type": "Computer"}, {"id": "d1", "name": "Phone", "is_active": true}]}"#;
        let parsed: DevicesResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.devices.len(), 2);
        assert!(parsed.devices[0].id.is_none());
        assert_eq!(parsed.devices[0].kind, "Computer");
        assert!(parsed.devices[1].is_active);
    }
}
