//! # Playback Controller
//!
//! Owns the [`PlaybackSession`] and turns emotion labels into playback.
//!
//! ## Modes
//!
//! - **Live**: playlists are started on the user's active device through a
//!   [`MusicService`].
//! - **Demo**: the same selection happens, but the controller only logs
//!   `[DEMO] Would play: …`.
//!
//! The initial mode is decided by [`PlaybackController::initialize`]: it
//! authenticates, then looks for a device on a bounded retry schedule. Any
//! failure leaves the controller in demo mode.
//!
//! While live, every dispatch re-queries the device list before starting
//! playback. If that query comes back empty or any service call fails, the
//! controller drops to demo mode and dispatches the same label once more in
//! demo mode. Nothing brings it back to live mode except another explicit
//! call to `initialize`.
//!
//! ## Debounce
//!
//! A label equal to the one already playing (with a playlist selected) is
//! skipped, whatever the mode. Time-based suppression is a caller concern,
//! see [`crate::runner::Cooldown`].

use crate::catalog::{PlaylistCatalog, PlaylistEntry, PlaylistId};
use crate::emotion::EmotionLabel;
use crate::error::ServiceError;
use crate::service::{Credentials, DeviceHandle, MusicService, PLAYBACK_SCOPE};
use log::{debug, info, warn};
use rand::rngs::ThreadRng;
use rand::Rng;
use std::fmt;
use std::thread;
use std::time::{Duration, Instant};

/// Operating mode of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Live,
    Demo,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Live => f.write_str("live"),
            Mode::Demo => f.write_str("demo"),
        }
    }
}

/// What a call to [`PlaybackController::dispatch`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Same label as the one already playing.
    Skipped,
    /// A playlist was selected (and started, in live mode).
    Dispatched {
        mode: Mode,
        playlist: PlaylistId,
        name: String,
    },
}

impl DispatchOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, DispatchOutcome::Skipped)
    }
}

/// Mutable playback state, owned by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackSession {
    current_emotion: Option<EmotionLabel>,
    current_selection: Option<PlaylistId>,
    mode: Mode,
    device: Option<DeviceHandle>,
    last_dispatch: Option<Instant>,
}

impl PlaybackSession {
    fn new() -> Self {
        Self {
            current_emotion: None,
            current_selection: None,
            mode: Mode::Demo,
            device: None,
            last_dispatch: None,
        }
    }

    pub fn current_emotion(&self) -> Option<EmotionLabel> {
        self.current_emotion
    }

    pub fn current_selection(&self) -> Option<&PlaylistId> {
        self.current_selection.as_ref()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Device used by the last successful discovery or live dispatch.
    pub fn device(&self) -> Option<&DeviceHandle> {
        self.device.as_ref()
    }

    pub fn last_dispatch(&self) -> Option<Instant> {
        self.last_dispatch
    }
}

/// Retry schedule for device discovery at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryPolicy {
    /// Total number of device queries (at least one is always made).
    pub attempts: u32,
    /// Pause before each query after the first.
    pub delay: Duration,
}

impl Default for DiscoveryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(2),
        }
    }
}

/// A music service together with the credentials to log into it.
pub struct ServiceLink<S: MusicService> {
    service: S,
    credentials: Credentials,
    session: Option<S::Session>,
}

impl<S: MusicService> ServiceLink<S> {
    pub fn new(service: S, credentials: Credentials) -> Self {
        Self {
            service,
            credentials,
            session: None,
        }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }
}

/// Emotion-driven playback state machine.
pub struct PlaybackController<S: MusicService, R: Rng = ThreadRng> {
    catalog: PlaylistCatalog,
    session: PlaybackSession,
    link: Option<ServiceLink<S>>,
    policy: DiscoveryPolicy,
    rng: R,
}

impl<S: MusicService> PlaybackController<S, ThreadRng> {
    /// Build a controller and run startup (auth + discovery).
    ///
    /// Without a link the controller starts, and stays, in demo mode.
    pub fn new(catalog: PlaylistCatalog, link: Option<ServiceLink<S>>, policy: DiscoveryPolicy) -> Self {
        Self::with_rng(catalog, link, policy, rand::thread_rng())
    }
}

impl<S: MusicService, R: Rng> PlaybackController<S, R> {
    pub fn with_rng(catalog: PlaylistCatalog, link: Option<ServiceLink<S>>, policy: DiscoveryPolicy, rng: R) -> Self {
        let mut controller = Self {
            catalog,
            session: PlaybackSession::new(),
            link,
            policy,
            rng,
        };
        controller.initialize();
        controller
    }

    pub fn mode(&self) -> Mode {
        self.session.mode
    }

    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    pub fn catalog(&self) -> &PlaylistCatalog {
        &self.catalog
    }

    pub fn link(&self) -> Option<&ServiceLink<S>> {
        self.link.as_ref()
    }

    /// Authenticate (if needed) and discover a device, then pick the mode.
    ///
    /// This is the only way back from demo to live mode.
    pub fn initialize(&mut self) -> Mode {
        if self.link.is_none() {
            info!("No music service configured");
            self.set_mode(Mode::Demo, "no music service");
        } else {
            match self.connect() {
                Ok(device) => {
                    info!("Using playback device: {}", device.name);
                    self.session.device = Some(device);
                    self.set_mode(Mode::Live, "device available");
                }
                Err(e) => self.fall_back(&e),
            }
        }

        info!("Playback controller running in {} mode", self.session.mode);
        self.session.mode
    }

    /// Play (or simulate) music for `label`.
    ///
    /// Service failures never escape: they switch the controller to demo
    /// mode and the label is dispatched once more in that mode.
    pub fn dispatch(&mut self, label: EmotionLabel, now: Instant) -> DispatchOutcome {
        if self.session.current_emotion == Some(label) && self.session.current_selection.is_some() {
            debug!("Emotion still {label}, keeping the current playlist");
            return DispatchOutcome::Skipped;
        }

        if self.session.mode == Mode::Live {
            match self.dispatch_live(label, now) {
                Ok(outcome) => return outcome,
                Err(e) => self.fall_back(&e),
            }
        }

        self.dispatch_demo(label, now)
    }

    fn connect(&mut self) -> Result<DeviceHandle, ServiceError> {
        if let Some(link) = self.link.as_mut() {
            if link.session.is_none() {
                info!("Connecting to music service...");
                let session = link.service.authenticate(&link.credentials, PLAYBACK_SCOPE)?;
                link.session = Some(session);
            }
        }
        self.discover_device()
    }

    fn discover_device(&mut self) -> Result<DeviceHandle, ServiceError> {
        let attempts = self.policy.attempts.max(1);
        let delay = self.policy.delay;
        let (service, session) = self.live_parts()?;

        for attempt in 1..=attempts {
            if attempt > 1 {
                info!("Checking for devices (attempt {attempt}/{attempts})...");
                thread::sleep(delay);
            }
            if let Some(device) = service.list_devices(session)?.into_iter().next() {
                return Ok(device);
            }
            warn!("No active playback devices found");
        }

        Err(ServiceError::NoActiveDevice)
    }

    fn dispatch_live(&mut self, label: EmotionLabel, now: Instant) -> Result<DispatchOutcome, ServiceError> {
        let entry = self.select(label);
        let (service, session) = self.live_parts()?;

        // Device ids are not trusted across calls.
        let device = service
            .list_devices(session)?
            .into_iter()
            .next()
            .ok_or(ServiceError::NoActiveDevice)?;

        service.start_playback(session, &device, &entry.id)?;

        let name = match service.playlist_name(session, &entry.id) {
            Ok(name) => name,
            Err(e) => {
                debug!("Could not fetch the name of {}: {e}", entry.id);
                entry.name.clone()
            }
        };

        info!("Now playing: {name} (Emotion: {label}) on {}", device.name);
        self.session.device = Some(device);
        self.record(label, entry.id.clone(), now);

        Ok(DispatchOutcome::Dispatched {
            mode: Mode::Live,
            playlist: entry.id,
            name,
        })
    }

    fn dispatch_demo(&mut self, label: EmotionLabel, now: Instant) -> DispatchOutcome {
        let entry = self.select(label);
        info!("[DEMO] Would play: {} (Emotion: {label})", entry.name);
        self.record(label, entry.id.clone(), now);

        DispatchOutcome::Dispatched {
            mode: Mode::Demo,
            playlist: entry.id,
            name: entry.name,
        }
    }

    fn select(&mut self, label: EmotionLabel) -> PlaylistEntry {
        if !self.catalog.has_entry(label) {
            debug!("No playlists for {label}, using the neutral list");
        }
        self.catalog.choose(label, &mut self.rng).clone()
    }

    fn record(&mut self, label: EmotionLabel, playlist: PlaylistId, now: Instant) {
        self.session.current_emotion = Some(label);
        self.session.current_selection = Some(playlist);
        self.session.last_dispatch = Some(now);
    }

    fn live_parts(&mut self) -> Result<(&mut S, &mut S::Session), ServiceError> {
        let link = self
            .link
            .as_mut()
            .ok_or_else(|| ServiceError::Unexpected("no music service configured".to_string()))?;
        let session = link
            .session
            .as_mut()
            .ok_or_else(|| ServiceError::Auth("not logged in".to_string()))?;
        Ok((&mut link.service, session))
    }

    fn fall_back(&mut self, err: &ServiceError) {
        match err {
            ServiceError::PremiumRequired => warn!("Playback control requires a premium account"),
            other => warn!("Music service problem: {other}"),
        }

        if err.invalidates_session() {
            if let Some(link) = self.link.as_mut() {
                link.session = None;
            }
        }
        self.session.device = None;
        self.set_mode(Mode::Demo, err.kind());
    }

    fn set_mode(&mut self, mode: Mode, reason: &str) {
        if self.session.mode != mode {
            info!("Switching to {mode} mode ({reason})");
            self.session.mode = mode;
        }
    }
}
