//! # Spotify Web API Client
//!
//! Blocking [`MusicService`] implementation on top of `ureq`.
//!
//! ## Endpoints
//!
//! - `POST {accounts}/api/token`: code exchange and refresh
//! - `GET {api}/me`: account name after login
//! - `GET {api}/me/player/devices`: device discovery
//! - `PUT {api}/me/player/play?device_id=…`: start a playlist
//! - `GET {api}/playlists/{id}?fields=name`: playlist name
//!
//! Every request shares one global timeout; an expired timeout surfaces as
//! [`ServiceError::Service`].
//!
//! ## Error mapping
//!
//! | Response                              | Error                      |
//! |---------------------------------------|----------------------------|
//! | reason `NO_ACTIVE_DEVICE`             | `NoActiveDevice`           |
//! | reason `PREMIUM_REQUIRED`             | `PremiumRequired`          |
//! | 401, or an accounts-service error     | `Auth`                     |
//! | any other non-2xx, transport failure  | `Service`                  |

pub mod auth;
pub mod models;

use crate::catalog::PlaylistId;
use crate::error::ServiceError;
use crate::service::{Credentials, DeviceHandle, MusicService};
use auth::{now_secs, TokenCache};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::{debug, info, warn};
use models::{ApiErrorBody, AuthErrorBody, DevicesResponse, PlaylistInfo, Token, TokenResponse, UserProfile};
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use std::time::Duration;
use ureq::Agent;
use url::Url;

pub const API_BASE: &str = "https://api.spotify.com/v1";
pub const ACCOUNTS_BASE: &str = "https://accounts.spotify.com";

/// A logged-in Spotify account.
#[derive(Debug, Clone)]
pub struct SpotifySession {
    token: Token,
    credentials: Credentials,
    scope: String,
    user: String,
}

impl SpotifySession {
    /// Display name (or id) of the connected account.
    pub fn user(&self) -> &str {
        &self.user
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.token.access_token)
    }
}

/// Spotify client used by the live playback path.
pub struct SpotifyClient {
    agent: Agent,
    api_base: String,
    accounts_base: String,
    token_cache: Option<TokenCache>,
    interactive: bool,
}

impl SpotifyClient {
    /// Client against the public endpoints, with `timeout` on every request.
    pub fn new(timeout: Duration, token_cache: Option<PathBuf>) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            agent,
            api_base: API_BASE.to_string(),
            accounts_base: ACCOUNTS_BASE.to_string(),
            token_cache: token_cache.map(TokenCache::new),
            interactive: true,
        }
    }

    /// Point the client somewhere else (a proxy or a test server).
    pub fn with_base_urls(mut self, api_base: impl Into<String>, accounts_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self.accounts_base = accounts_base.into().trim_end_matches('/').to_string();
        self
    }

    /// When disabled, a missing or unusable cached token fails
    /// authentication instead of prompting.
    pub fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    /// Forget the cached token.
    pub fn logout(&self) {
        if let Some(cache) = &self.token_cache {
            cache.clear();
            info!("Removed cached login at {}", cache.path().display());
        }
    }

    fn obtain_token(&self, credentials: &Credentials, scope: &str) -> Result<Token, ServiceError> {
        if let Some(cached) = self.token_cache.as_ref().and_then(TokenCache::load) {
            if !cached.covers_scope(scope) {
                debug!("Cached token lacks the requested scope, logging in again");
            } else if !cached.is_expired(now_secs()) {
                debug!("Using cached token");
                return Ok(cached);
            } else if let Some(refresh) = cached.refresh_token.clone() {
                match self.refresh(credentials, &refresh, scope) {
                    Ok(token) => return Ok(token),
                    Err(e) => warn!("Token refresh failed ({e}), logging in again"),
                }
            }
        }

        if !self.interactive {
            return Err(ServiceError::Auth("no valid cached token and interactive login is disabled".to_string()));
        }

        let url = auth::authorize_url(&self.accounts_base, credentials, scope)?;
        let code = auth::prompt_for_code(&url)?;
        self.exchange_code(credentials, &code, scope)
    }

    fn exchange_code(&self, credentials: &Credentials, code: &str, scope: &str) -> Result<Token, ServiceError> {
        let body = self.token_request(
            credentials,
            &[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", credentials.redirect_uri.as_str()),
            ],
        )?;
        let token = parse_json::<TokenResponse>(&body)?.into_token(now_secs(), None, scope);
        self.remember(&token);
        Ok(token)
    }

    fn refresh(&self, credentials: &Credentials, refresh_token: &str, scope: &str) -> Result<Token, ServiceError> {
        debug!("Refreshing access token");
        let body = self.token_request(
            credentials,
            &[("grant_type", "refresh_token"), ("refresh_token", refresh_token)],
        )?;
        let token = parse_json::<TokenResponse>(&body)?.into_token(now_secs(), Some(refresh_token.to_string()), scope);
        self.remember(&token);
        Ok(token)
    }

    fn token_request(&self, credentials: &Credentials, form: &[(&str, &str)]) -> Result<String, ServiceError> {
        let basic = STANDARD.encode(format!("{}:{}", credentials.client_id, credentials.client_secret));
        let url = format!("{}/api/token", self.accounts_base);
        let response = self
            .agent
            .post(url.as_str())
            .header("Authorization", format!("Basic {basic}").as_str())
            .send_form(form.iter().copied())
            .map_err(transport_error)?;

        // Any accounts-service failure means the login is unusable.
        read_body(response).map_err(|e| match e {
            ServiceError::Service(message) => ServiceError::Auth(message),
            other => other,
        })
    }

    fn remember(&self, token: &Token) {
        if let Some(cache) = &self.token_cache {
            cache.store(token);
        }
    }

    fn ensure_fresh(&self, session: &mut SpotifySession) -> Result<(), ServiceError> {
        if !session.token.is_expired(now_secs()) {
            return Ok(());
        }
        let refresh = session
            .token
            .refresh_token
            .clone()
            .ok_or_else(|| ServiceError::Auth("access token expired and no refresh token is available".to_string()))?;
        session.token = self.refresh(&session.credentials, &refresh, &session.scope)?;
        Ok(())
    }

    fn get_json<T: DeserializeOwned>(&self, session: &mut SpotifySession, url: &str) -> Result<T, ServiceError> {
        self.ensure_fresh(session)?;
        let response = self
            .agent
            .get(url)
            .header("Authorization", session.bearer().as_str())
            .call()
            .map_err(transport_error)?;
        parse_json(&read_body(response)?)
    }

    fn fetch_profile(&self, session: &mut SpotifySession) -> Result<UserProfile, ServiceError> {
        let url = format!("{}/me", self.api_base);
        self.get_json(session, &url)
    }
}

impl MusicService for SpotifyClient {
    type Session = SpotifySession;

    fn authenticate(&mut self, credentials: &Credentials, scope: &str) -> Result<SpotifySession, ServiceError> {
        info!("Authenticating with Spotify: {}...", credentials.client_id.chars().take(5).collect::<String>());
        let token = self.obtain_token(credentials, scope)?;

        let mut session = SpotifySession {
            token,
            credentials: credentials.clone(),
            scope: scope.to_string(),
            user: String::new(),
        };

        let profile = self.fetch_profile(&mut session)?;
        session.user = profile.display_name.filter(|name| !name.is_empty()).unwrap_or(profile.id);
        info!("Connected to Spotify as: {}", session.user);

        Ok(session)
    }

    fn list_devices(&mut self, session: &mut SpotifySession) -> Result<Vec<DeviceHandle>, ServiceError> {
        let url = format!("{}/me/player/devices", self.api_base);
        let response: DevicesResponse = self.get_json(session, &url)?;

        let mut devices: Vec<_> = response
            .devices
            .into_iter()
            .filter(|device| !device.is_restricted)
            .filter(|device| device.id.is_some())
            .collect();
        // Active device first, otherwise keep the service's order.
        devices.sort_by_key(|device| !device.is_active);

        Ok(devices
            .into_iter()
            .filter_map(|device| {
                debug!("Found device: {} ({})", device.name, device.kind);
                device.id.map(|id| DeviceHandle::new(id, device.name))
            })
            .collect())
    }

    fn start_playback(
        &mut self,
        session: &mut SpotifySession,
        device: &DeviceHandle,
        playlist: &PlaylistId,
    ) -> Result<(), ServiceError> {
        self.ensure_fresh(session)?;

        let url = Url::parse_with_params(
            &format!("{}/me/player/play", self.api_base),
            &[("device_id", device.id.as_str())],
        )
        .map_err(|e| ServiceError::Unexpected(format!("invalid API URL: {e}")))?;
        let body = serde_json::json!({ "context_uri": context_uri(playlist) }).to_string();

        let response = self
            .agent
            .put(url.as_str())
            .header("Authorization", session.bearer().as_str())
            .header("Content-Type", "application/json")
            .send(body)
            .map_err(transport_error)?;
        read_body(response)?;
        Ok(())
    }

    fn playlist_name(&mut self, session: &mut SpotifySession, playlist: &PlaylistId) -> Result<String, ServiceError> {
        let url = format!("{}/playlists/{}?fields=name", self.api_base, playlist_id(playlist));
        let info: PlaylistInfo = self.get_json(session, &url)?;
        Ok(info.name)
    }
}

/// Bare playlist id from a `spotify:playlist:` URI, an open.spotify.com
/// link, or an id.
pub fn playlist_id(playlist: &PlaylistId) -> &str {
    let raw = playlist.as_str();
    if let Some(id) = raw.strip_prefix("spotify:playlist:") {
        return id;
    }
    if let Some((_, rest)) = raw.split_once("/playlist/") {
        return rest.split(['?', '/', '#']).next().unwrap_or(rest);
    }
    raw
}

/// `context_uri` for the play call.
pub fn context_uri(playlist: &PlaylistId) -> String {
    if playlist.as_str().starts_with("spotify:") {
        playlist.to_string()
    } else {
        format!("spotify:playlist:{}", playlist_id(playlist))
    }
}

/// Map an error response to a [`ServiceError`].
pub fn classify_error(status: u16, body: &str) -> ServiceError {
    if let Ok(parsed) = serde_json::from_str::<ApiErrorBody>(body) {
        return match parsed.error.reason.as_deref() {
            Some("NO_ACTIVE_DEVICE") => ServiceError::NoActiveDevice,
            Some("PREMIUM_REQUIRED") => ServiceError::PremiumRequired,
            _ if status == 401 => ServiceError::Auth(parsed.error.message),
            _ => ServiceError::Service(format!("HTTP {status}: {}", parsed.error.message)),
        };
    }

    if let Ok(parsed) = serde_json::from_str::<AuthErrorBody>(body) {
        let detail = parsed.error_description.unwrap_or_default();
        return ServiceError::Auth(format!("{} {}", parsed.error, detail).trim_end().to_string());
    }

    if body.contains("NO_ACTIVE_DEVICE") {
        ServiceError::NoActiveDevice
    } else if body.contains("PREMIUM_REQUIRED") {
        ServiceError::PremiumRequired
    } else if status == 401 {
        ServiceError::Auth(format!("HTTP {status}"))
    } else {
        ServiceError::Service(format!("HTTP {status}"))
    }
}

fn read_body(mut response: ureq::http::Response<ureq::Body>) -> Result<String, ServiceError> {
    let status = response.status().as_u16();
    let body = response.body_mut().read_to_string().map_err(transport_error)?;
    if (200..300).contains(&status) {
        Ok(body)
    } else {
        Err(classify_error(status, &body))
    }
}

fn parse_json<T: DeserializeOwned>(body: &str) -> Result<T, ServiceError> {
    serde_json::from_str(body).map_err(|e| ServiceError::Unexpected(format!("malformed response: {e}")))
}

fn transport_error(err: ureq::Error) -> ServiceError {
    match err {
        ureq::Error::Timeout(_) => ServiceError::Service("request timed out".to_string()),
        other => ServiceError::Service(format!("request failed: {other}")),
    }
}
