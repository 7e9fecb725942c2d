//! # Emotion Labels
//!
//! The closed vocabulary of mood tags that drives playlist choice.
//!
//! Two label sets are in use:
//! - **Basic**: happy, sad, angry, neutral, surprise (the default set the
//!   random source cycles through)
//! - **Extended**: the basic set plus fear and disgust
//!
//! Parsing comes in two flavours. [`EmotionLabel::parse_lenient`] never fails
//! and maps anything it does not recognise to `neutral`, which is what the
//! playback path wants. The [`FromStr`] impl is strict and is what catalog
//! and settings files go through.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A mood tag produced by an emotion source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmotionLabel {
    Happy,
    Sad,
    Angry,
    #[default]
    Neutral,
    Surprise,
    Fear,
    Disgust,
}

impl EmotionLabel {
    /// The five labels every variant of the player knows about.
    pub const BASIC: [EmotionLabel; 5] = [
        EmotionLabel::Happy,
        EmotionLabel::Sad,
        EmotionLabel::Angry,
        EmotionLabel::Neutral,
        EmotionLabel::Surprise,
    ];

    /// Every label, including fear and disgust.
    pub const ALL: [EmotionLabel; 7] = [
        EmotionLabel::Happy,
        EmotionLabel::Sad,
        EmotionLabel::Angry,
        EmotionLabel::Neutral,
        EmotionLabel::Surprise,
        EmotionLabel::Fear,
        EmotionLabel::Disgust,
    ];

    /// Lowercase name, as used in catalog files and log lines.
    pub fn as_str(self) -> &'static str {
        match self {
            EmotionLabel::Happy => "happy",
            EmotionLabel::Sad => "sad",
            EmotionLabel::Angry => "angry",
            EmotionLabel::Neutral => "neutral",
            EmotionLabel::Surprise => "surprise",
            EmotionLabel::Fear => "fear",
            EmotionLabel::Disgust => "disgust",
        }
    }

    /// Parse a label, falling back to `neutral` for anything unknown.
    pub fn parse_lenient(input: &str) -> EmotionLabel {
        input.parse().unwrap_or(EmotionLabel::Neutral)
    }
}

impl fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned by the strict parser for names outside the vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown emotion label '{0}' (expected one of: happy, sad, angry, neutral, surprise, fear, disgust)")]
pub struct UnknownLabel(pub String);

impl FromStr for EmotionLabel {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        EmotionLabel::ALL
            .into_iter()
            .find(|label| label.as_str() == normalized)
            .ok_or_else(|| UnknownLabel(s.to_string()))
    }
}

/// Which label set the random source cycles through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vocabulary {
    #[default]
    Basic,
    Extended,
}

impl Vocabulary {
    pub fn labels(self) -> &'static [EmotionLabel] {
        match self {
            Vocabulary::Basic => &EmotionLabel::BASIC,
            Vocabulary::Extended => &EmotionLabel::ALL,
        }
    }
}
