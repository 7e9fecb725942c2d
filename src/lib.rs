//! Emotion-driven music playback.
//!
//! An emotion source reports the listener's mood; the playback controller
//! turns each new mood into a playlist on the user's streaming account, or
//! into a `[DEMO] Would play: …` log line when no account or device is
//! available.
//!
//! Core modules:
//! - [`source`] - Emotion sources (random placeholder, classifier glue)
//! - [`controller`] - Playback state machine with live/demo modes
//! - [`catalog`] - Emotion → playlist mapping with neutral fallback
//! - [`runner`] - Polling loop and cooldown gate
//! - [`spotify`] - Spotify Web API client
//!
//! ### Supporting Modules
//!
//! - [`emotion`] - Emotion labels and vocabularies
//! - [`service`] - Music service capability trait
//! - [`error`] - Configuration and service errors
//! - [`config`] - Settings file, directories and credentials
//! - [`cli`] - Command-line interface definitions with clap integration
//! - [`completion`] - Shell completion generation
//!
//! ## Quick Start Example
//!
//! ```no_run
//! use moodplay::catalog::PlaylistCatalog;
//! use moodplay::controller::{DiscoveryPolicy, PlaybackController};
//! use moodplay::runner::Player;
//! use moodplay::source::{RandomCycleSource, DEFAULT_INTERVAL};
//! use moodplay::emotion::EmotionLabel;
//! use moodplay::spotify::SpotifyClient;
//! use std::time::{Duration, Instant};
//!
//! // No service link: the controller runs in demo mode.
//! let controller: PlaybackController<SpotifyClient> =
//!     PlaybackController::new(PlaylistCatalog::builtin(), None, DiscoveryPolicy::default());
//! let source = RandomCycleSource::new(&EmotionLabel::BASIC, DEFAULT_INTERVAL, Instant::now());
//!
//! let mut player = Player::new(source, controller, Duration::from_secs(1));
//! let summary = player.run(|| false, Some(60));
//! println!("{summary}");
//! ```
//!
//! ## Modes
//!
//! Startup authenticates and looks for a playback device (three attempts by
//! default). Any failure there, or later while starting a playlist, switches
//! the controller to demo mode for the rest of the run. A failed live
//! dispatch is retried exactly once, in demo mode, so the session always
//! reflects the latest emotion.

pub mod catalog;
pub mod cli;
pub mod completion;
pub mod config;
pub mod controller;
pub mod emotion;
pub mod error;
pub mod runner;
pub mod service;
pub mod source;
pub mod spotify;

#[cfg(test)]
mod testing;
