//! # Player Loop
//!
//! Glue between an [`EmotionSource`] and a [`PlaybackController`]: one poll
//! of the source per tick, an optional [`Cooldown`] gate, then a dispatch.
//!
//! The loop is single-threaded. It ends when the quit check fires (Ctrl+C
//! via [`install_interrupt_handler`]) or after an optional number of ticks.

use crate::controller::{DispatchOutcome, PlaybackController};
use crate::emotion::EmotionLabel;
use crate::service::MusicService;
use crate::source::EmotionSource;
use log::{debug, info, warn};
use rand::rngs::ThreadRng;
use rand::Rng;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Cooldown used when the gate is enabled without an explicit period.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(10);

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Time-based gate in front of the controller.
///
/// A label gets through when it differs from the last admitted label and
/// strictly more than the period has passed since that admission. The
/// first label always gets through.
#[derive(Debug, Clone)]
pub struct Cooldown {
    period: Duration,
    last: Option<(EmotionLabel, Instant)>,
}

impl Cooldown {
    pub fn new(period: Duration) -> Self {
        Self { period, last: None }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn admit(&mut self, label: EmotionLabel, now: Instant) -> bool {
        if let Some((last_label, at)) = self.last {
            if last_label == label {
                return false;
            }
            if now.saturating_duration_since(at) <= self.period {
                debug!("Cooldown active, holding {label}");
                return false;
            }
        }
        self.last = Some((label, now));
        true
    }
}

impl Default for Cooldown {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN)
    }
}

/// Result of a single loop iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tick {
    /// Held back by the cooldown gate.
    Suppressed(EmotionLabel),
    Dispatch(DispatchOutcome),
}

/// Counters reported when the loop exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub dispatched: u64,
    pub skipped: u64,
    pub suppressed: u64,
}

impl RunSummary {
    fn count(&mut self, tick: &Tick) {
        self.ticks += 1;
        match tick {
            Tick::Suppressed(_) => self.suppressed += 1,
            Tick::Dispatch(DispatchOutcome::Skipped) => self.skipped += 1,
            Tick::Dispatch(DispatchOutcome::Dispatched { .. }) => self.dispatched += 1,
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ticks, {} playlists dispatched, {} repeats skipped, {} held by cooldown",
            self.ticks, self.dispatched, self.skipped, self.suppressed
        )
    }
}

/// Polling loop driving a controller from an emotion source.
pub struct Player<E: EmotionSource, S: MusicService, R: Rng = ThreadRng> {
    source: E,
    controller: PlaybackController<S, R>,
    cooldown: Option<Cooldown>,
    poll_interval: Duration,
    summary: RunSummary,
}

impl<E: EmotionSource, S: MusicService, R: Rng> Player<E, S, R> {
    pub fn new(source: E, controller: PlaybackController<S, R>, poll_interval: Duration) -> Self {
        Self {
            source,
            controller,
            cooldown: None,
            poll_interval,
            summary: RunSummary::default(),
        }
    }

    pub fn with_cooldown(mut self, cooldown: Option<Cooldown>) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn controller(&self) -> &PlaybackController<S, R> {
        &self.controller
    }

    pub fn summary(&self) -> RunSummary {
        self.summary
    }

    /// One iteration at `now`.
    pub fn tick(&mut self, now: Instant) -> Tick {
        let label = self.source.current_label(now);

        let admitted = match self.cooldown.as_mut() {
            Some(cooldown) => cooldown.admit(label, now),
            None => true,
        };

        let tick = if admitted {
            Tick::Dispatch(self.controller.dispatch(label, now))
        } else {
            Tick::Suppressed(label)
        };
        self.summary.count(&tick);
        tick
    }

    /// Tick until `quit` returns true or `max_ticks` iterations ran.
    pub fn run<Q: FnMut() -> bool>(&mut self, mut quit: Q, max_ticks: Option<u64>) -> RunSummary {
        info!(
            "Player started in {} mode, polling every {:?}",
            self.controller.mode(),
            self.poll_interval
        );

        while !quit() {
            self.tick(Instant::now());

            if max_ticks.is_some_and(|max| self.summary.ticks >= max) {
                debug!("Tick limit reached");
                break;
            }
            thread::sleep(self.poll_interval);
        }

        info!("Player stopped: {}", self.summary);
        self.summary
    }
}

/// Route SIGINT to [`interrupted`] instead of killing the process.
pub fn install_interrupt_handler() {
    #[cfg(unix)]
    {
        extern "C" fn on_interrupt(_signal: libc::c_int) {
            INTERRUPTED.store(true, Ordering::SeqCst);
        }

        let handler = on_interrupt as extern "C" fn(libc::c_int);
        // SAFETY: the handler only stores to an atomic, which is async-signal-safe.
        let previous = unsafe { libc::signal(libc::SIGINT, handler as libc::sighandler_t) };
        if previous == libc::SIG_ERR {
            warn!("Could not install the Ctrl+C handler");
        }
    }
}

/// Whether Ctrl+C was pressed since the handler was installed.
pub fn interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{PlaylistCatalog, PlaylistEntry, PlaylistId};
    use crate::controller::DiscoveryPolicy;
    use crate::error::ServiceError;
    use crate::service::{Credentials, DeviceHandle};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::{BTreeMap, VecDeque};

    struct Offline;

    impl MusicService for Offline {
        type Session = ();

        fn authenticate(&mut self, _: &Credentials, _: &str) -> Result<(), ServiceError> {
            Err(ServiceError::Auth("offline".into()))
        }

        fn list_devices(&mut self, _: &mut ()) -> Result<Vec<DeviceHandle>, ServiceError> {
            unreachable!()
        }

        fn start_playback(&mut self, _: &mut (), _: &DeviceHandle, _: &PlaylistId) -> Result<(), ServiceError> {
            unreachable!()
        }

        fn playlist_name(&mut self, _: &mut (), _: &PlaylistId) -> Result<String, ServiceError> {
            unreachable!()
        }
    }

    struct Script(VecDeque<EmotionLabel>);

    impl EmotionSource for Script {
        fn current_label(&mut self, _now: Instant) -> EmotionLabel {
            self.0.pop_front().unwrap_or(EmotionLabel::Neutral)
        }
    }

    fn player(labels: &[EmotionLabel]) -> Player<Script, Offline, StdRng> {
        let mut map = BTreeMap::new();
        map.insert(EmotionLabel::Happy, vec![PlaylistEntry::new("H", "Happy Hits")]);
        map.insert(EmotionLabel::Sad, vec![PlaylistEntry::new("S", "Sad Songs")]);
        map.insert(EmotionLabel::Neutral, vec![PlaylistEntry::new("N", "Chill")]);
        let catalog = PlaylistCatalog::new(map).unwrap();
        let controller = PlaybackController::with_rng(catalog, None, DiscoveryPolicy::default(), StdRng::seed_from_u64(5));
        Player::new(Script(labels.iter().copied().collect()), controller, Duration::ZERO)
    }

    #[test]
    fn test_cooldown_first_label_always_admitted() {
        let mut cooldown = Cooldown::new(Duration::from_secs(10));
        assert!(cooldown.admit(EmotionLabel::Sad, Instant::now()));
    }

    #[test]
    fn test_cooldown_requires_change_and_elapsed_time() {
        let t0 = Instant::now();
        let mut cooldown = Cooldown::default();
        assert_eq!(cooldown.period(), DEFAULT_COOLDOWN);

        assert!(cooldown.admit(EmotionLabel::Happy, t0));
        assert!(!cooldown.admit(EmotionLabel::Sad, t0 + Duration::from_secs(5)));
        assert!(!cooldown.admit(EmotionLabel::Happy, t0 + Duration::from_secs(30)));
        assert!(cooldown.admit(EmotionLabel::Sad, t0 + Duration::from_secs(11)));
    }

    #[test]
    fn test_cooldown_holds_at_exact_period() {
        let t0 = Instant::now();
        let mut cooldown = Cooldown::new(Duration::from_secs(10));

        assert!(cooldown.admit(EmotionLabel::Happy, t0));
        assert!(!cooldown.admit(EmotionLabel::Sad, t0 + Duration::from_secs(10)));
        assert!(cooldown.admit(EmotionLabel::Sad, t0 + Duration::from_millis(10_001)));
    }

    #[test]
    fn test_ticks_are_counted() {
        let mut player = player(&[EmotionLabel::Happy, EmotionLabel::Happy, EmotionLabel::Sad]);
        let summary = player.run(|| false, Some(3));

        assert_eq!(summary.ticks, 3);
        assert_eq!(summary.dispatched, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.suppressed, 0);
        assert_eq!(player.controller().session().current_emotion(), Some(EmotionLabel::Sad));
    }

    #[test]
    fn test_cooldown_suppresses_before_dispatch() {
        let t0 = Instant::now();
        let mut player = player(&[EmotionLabel::Happy, EmotionLabel::Sad]).with_cooldown(Some(Cooldown::default()));

        assert!(matches!(player.tick(t0), Tick::Dispatch(DispatchOutcome::Dispatched { .. })));
        assert_eq!(player.tick(t0 + Duration::from_secs(1)), Tick::Suppressed(EmotionLabel::Sad));
        assert_eq!(player.summary().suppressed, 1);
        assert_eq!(player.controller().session().current_emotion(), Some(EmotionLabel::Happy));
    }

    #[test]
    fn test_quit_stops_before_first_tick() {
        let mut player = player(&[EmotionLabel::Happy]);
        assert_eq!(player.run(|| true, None).ticks, 0);
    }

    #[test]
    fn test_summary_display() {
        let summary = RunSummary {
            ticks: 4,
            dispatched: 2,
            skipped: 1,
            suppressed: 1,
        };
        assert_eq!(
            summary.to_string(),
            "4 ticks, 2 playlists dispatched, 1 repeats skipped, 1 held by cooldown"
        );
        assert!(!interrupted());
    }
}
