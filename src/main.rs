//! # moodplay
//!
//! Terminal player that follows a (simulated) emotion and starts a matching
//! playlist on the user's Spotify account, or logs what it would play when
//! no account is available.
//!
//! ## Usage
//!
//! ```bash
//! # Demo mode, no account needed
//! moodplay run --demo
//!
//! # Live mode
//! export SPOTIFY_CLIENT_ID=...
//! export SPOTIFY_CLIENT_SECRET=...
//! moodplay run --cooldown 10
//!
//! # One emotion, once
//! moodplay play sad
//! ```

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use log::{debug, info, warn};
use moodplay::catalog::PlaylistCatalog;
use moodplay::cli::{self, CredentialArgs};
use moodplay::completion;
use moodplay::config::{self, Settings};
use moodplay::controller::{DispatchOutcome, PlaybackController, ServiceLink};
use moodplay::emotion::{EmotionLabel, Vocabulary};
use moodplay::runner::{self, Cooldown, Player};
use moodplay::service::{MusicService, PLAYBACK_SCOPE};
use moodplay::source::RandomCycleSource;
use moodplay::spotify::SpotifyClient;
use std::path::Path;
use std::time::{Duration, Instant};

/// Main entry point for moodplay.
///
/// A `.env` file in the working directory (or a parent) is loaded first;
/// variables already set in the environment win.
///
/// Logging is controlled via `RUST_LOG` and defaults to `info` so status
/// lines are visible:
/// - `RUST_LOG=debug moodplay run` - Enable debug logging
/// - `RUST_LOG=moodplay::controller=debug moodplay run` - Module-specific logging
fn main() -> Result<()> {
    // Before the logger and the parser, so `.env` can set RUST_LOG and SPOTIFY_*.
    let dotenv = dotenvy::dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    match dotenv {
        Ok(path) => debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => debug!("No .env file found, using the process environment"),
        Err(e) => warn!("Ignoring unreadable .env file: {e}"),
    }

    let args = cli::Args::parse();
    let settings = Settings::load(args.config.as_deref()).context("Failed to load settings")?;

    match args.command {
        cli::Command::Run {
            credentials,
            demo,
            interval,
            cooldown,
            max_ticks,
            catalog,
            extended,
        } => {
            let catalog = load_catalog(catalog.as_deref(), &settings)?;
            let link = service_link(&credentials, demo, &settings);
            let controller = PlaybackController::new(catalog, link, settings.discovery_policy());

            let interval = interval.map(Duration::from_secs).unwrap_or_else(|| settings.emotion_interval());
            let vocabulary = if extended { Vocabulary::Extended } else { settings.vocabulary };
            let source = RandomCycleSource::new(vocabulary.labels(), interval, Instant::now());

            let cooldown = cooldown.map(Duration::from_secs).or_else(|| settings.cooldown());
            if let Some(period) = cooldown {
                info!("Cooldown enabled: {}s between playlist changes", period.as_secs());
            }

            let mut player = Player::new(source, controller, settings.poll_interval())
                .with_cooldown(cooldown.map(Cooldown::new));

            runner::install_interrupt_handler();
            println!("Emotion player running in {} mode. Press Ctrl+C to stop.", player.controller().mode());
            let summary = player.run(runner::interrupted, max_ticks);
            println!("Stopped: {summary}");
        }
        cli::Command::Play {
            emotion,
            credentials,
            demo,
            catalog,
        } => {
            let catalog = load_catalog(catalog.as_deref(), &settings)?;
            let link = service_link(&credentials, demo, &settings);
            let mut controller = PlaybackController::new(catalog, link, settings.discovery_policy());

            let label = EmotionLabel::parse_lenient(&emotion);
            if emotion.parse::<EmotionLabel>().is_err() {
                warn!("Unknown emotion '{emotion}', using {label}");
            }

            match controller.dispatch(label, Instant::now()) {
                DispatchOutcome::Dispatched { mode, name, playlist } => {
                    println!("{label} -> {name} ({playlist}) [{mode}]");
                }
                DispatchOutcome::Skipped => println!("{label} is already playing"),
            }
        }
        cli::Command::Devices { credentials } => {
            let creds = config::resolve_credentials(
                credentials.client_id.as_deref(),
                credentials.client_secret.as_deref(),
                credentials.redirect_uri.as_deref(),
            )
            .context("Listing devices needs SPOTIFY_CLIENT_ID and SPOTIFY_CLIENT_SECRET")?;

            let mut client = spotify_client(&settings);
            let mut session = client
                .authenticate(&creds, PLAYBACK_SCOPE)
                .context("Failed to log in to Spotify")?;
            let devices = client
                .list_devices(&mut session)
                .context("Failed to fetch playback devices")?;

            if devices.is_empty() {
                println!("No playback devices found for {}", session.user());
                println!("Open Spotify on your phone or computer and play/pause a song to activate it.");
            } else {
                println!("Playback devices for {}:", session.user());
                for device in devices {
                    println!("  {} ({})", device.name, device.id);
                }
            }
        }
        cli::Command::Catalog { catalog } => {
            let catalog = load_catalog(catalog.as_deref(), &settings)?;
            for label in EmotionLabel::ALL {
                let marker = if catalog.has_entry(label) { "" } else { " (neutral fallback)" };
                println!("{label}{marker}:");
                for entry in catalog.entries_for(label) {
                    println!("  {} - {}", entry.name, entry.id);
                }
            }
        }
        cli::Command::Logout => {
            spotify_client(&settings).logout();
        }
        cli::Command::Completion { shell } => {
            let mut cmd = cli::Args::command();
            completion::generate_completions(completion::shell_to_completion_shell(&shell), &mut cmd);
        }
    }

    Ok(())
}

/// Catalog from the flag, the settings file, or the built-in table.
fn load_catalog(flag: Option<&Path>, settings: &Settings) -> Result<PlaylistCatalog> {
    match flag.or(settings.catalog_path.as_deref()) {
        Some(path) => {
            info!("Loading playlist catalog from {}", path.display());
            PlaylistCatalog::from_json_file(path).context("Failed to load playlist catalog")
        }
        None => Ok(PlaylistCatalog::builtin()),
    }
}

fn spotify_client(settings: &Settings) -> SpotifyClient {
    let token_cache = match config::get_token_cache_path() {
        Ok(path) => Some(path),
        Err(e) => {
            warn!("Login will not be cached: {e}");
            None
        }
    };
    SpotifyClient::new(settings.request_timeout(), token_cache)
}

/// `None` means demo mode: forced, or no usable credentials.
fn service_link(credentials: &CredentialArgs, demo: bool, settings: &Settings) -> Option<ServiceLink<SpotifyClient>> {
    if demo {
        info!("Demo mode requested");
        return None;
    }
    let creds = config::resolve_credentials(
        credentials.client_id.as_deref(),
        credentials.client_secret.as_deref(),
        credentials.redirect_uri.as_deref(),
    )?;
    Some(ServiceLink::new(spotify_client(settings), creds))
}
