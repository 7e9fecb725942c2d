//! # Command-Line Interface Module
//!
//! Clap derive definitions for moodplay.
//!
//! ## Commands
//!
//! - `run`: poll the emotion source and play matching playlists
//! - `play`: dispatch a single emotion once
//! - `devices`: log in and list playback devices
//! - `catalog`: print the emotion → playlist table
//! - `completion`: generate shell completion scripts
//!
//! ## Examples
//!
//! ```bash
//! moodplay run --demo --interval 5
//! SPOTIFY_CLIENT_ID=... SPOTIFY_CLIENT_SECRET=... moodplay run --cooldown 10
//! moodplay play happy
//! ```

use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shell types supported for completion generation
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    /// PowerShell
    PowerShell,
    /// Elvish shell
    Elvish,
}

/// Main application arguments structure.
#[derive(Parser, Debug)]
#[command(name = "moodplay")]
#[command(about = "moodplay: emotion-driven music playback")]
#[command(version)]
pub struct Args {
    /// Settings file (defaults to <config dir>/moodplay/config.json when present)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Music service credentials, taken from flags or the environment.
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct CredentialArgs {
    /// Spotify application client id
    #[arg(long, env = "SPOTIFY_CLIENT_ID", hide_env_values = true)]
    pub client_id: Option<String>,

    /// Spotify application client secret
    #[arg(long, env = "SPOTIFY_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// OAuth redirect URI registered for the application
    #[arg(long, env = "SPOTIFY_REDIRECT_URI")]
    pub redirect_uri: Option<String>,
}

/// Enumeration of all available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the player loop
    ///
    /// Polls the emotion source and starts a playlist whenever the emotion
    /// changes. Without credentials, or when no device can be found, the
    /// player runs in demo mode and only logs what it would play.
    /// Stop with Ctrl+C.
    Run {
        #[command(flatten)]
        credentials: CredentialArgs,

        /// Force demo mode, never contact the music service
        #[arg(long)]
        demo: bool,

        /// Seconds between emotion changes of the random source
        #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
        interval: Option<u64>,

        /// Minimum seconds between two playlist changes
        ///
        /// Passing the flag without a value uses 10 seconds.
        #[arg(long, value_name = "SECS", num_args = 0..=1, default_missing_value = "10")]
        cooldown: Option<u64>,

        /// Stop after this many loop iterations
        #[arg(long, value_name = "N")]
        max_ticks: Option<u64>,

        /// Playlist catalog file (JSON) replacing the built-in one
        #[arg(long, value_name = "FILE")]
        catalog: Option<PathBuf>,

        /// Draw from all seven emotions instead of the basic five
        #[arg(long)]
        extended: bool,
    },

    /// Play the playlist for one emotion and exit
    ///
    /// Unknown emotion names fall back to neutral.
    Play {
        /// Emotion name (happy, sad, angry, neutral, surprise, fear, disgust)
        emotion: String,

        #[command(flatten)]
        credentials: CredentialArgs,

        /// Only log what would be played
        #[arg(long)]
        demo: bool,

        /// Playlist catalog file (JSON) replacing the built-in one
        #[arg(long, value_name = "FILE")]
        catalog: Option<PathBuf>,
    },

    /// List the playback devices of the connected account
    Devices {
        #[command(flatten)]
        credentials: CredentialArgs,
    },

    /// Print the playlist catalog
    Catalog {
        /// Playlist catalog file (JSON) replacing the built-in one
        #[arg(long, value_name = "FILE")]
        catalog: Option<PathBuf>,
    },

    /// Remove the cached music service login
    Logout,

    /// Generate shell completions
    ///
    /// Usage: moodplay completion bash > ~/.local/share/bash-completion/completions/moodplay
    Completion {
        /// Shell to generate completions for
        shell: Shell,
    },
}
