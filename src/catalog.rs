//! # Playlist Catalog
//!
//! Static mapping from [`EmotionLabel`] to candidate playlists. A label whose
//! list is missing (or empty) borrows the `neutral` list, so the catalog
//! refuses to exist without a non-empty `neutral` entry.
//!
//! Catalog files are JSON objects keyed by label name:
//!
//! ```json
//! {
//!   "happy":   [{ "id": "spotify:playlist:37i9dQZF1DXdPec7aLTmlC", "name": "Happy Hits!" }],
//!   "neutral": [{ "id": "spotify:playlist:37i9dQZF1DX4sWSpwq3LiO", "name": "Peaceful Piano" }]
//! }
//! ```
//!
//! `name` is optional and defaults to the id.

use crate::emotion::EmotionLabel;
use crate::error::{ConfigError, ConfigResult};
use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

/// Opaque playlist identifier understood by the music service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlaylistId(String);

impl PlaylistId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlaylistId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One candidate playlist with the name shown in demo mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistEntry {
    pub id: PlaylistId,
    #[serde(default)]
    pub name: String,
}

impl PlaylistEntry {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: PlaylistId::new(id),
            name: name.into(),
        }
    }
}

/// Validated emotion → playlists mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistCatalog {
    entries: BTreeMap<EmotionLabel, Vec<PlaylistEntry>>,
}

impl PlaylistCatalog {
    /// Build a catalog, enforcing the neutral-fallback invariant.
    ///
    /// Empty lists are dropped (those labels fall back to neutral) and
    /// entries without a name are named after their id.
    pub fn new(entries: BTreeMap<EmotionLabel, Vec<PlaylistEntry>>) -> ConfigResult<Self> {
        let mut cleaned = BTreeMap::new();
        for (label, list) in entries {
            if list.is_empty() {
                debug!("Catalog entry for '{label}' is empty, it will use the neutral fallback");
                continue;
            }
            let mut named = Vec::with_capacity(list.len());
            for mut entry in list {
                if entry.id.as_str().trim().is_empty() {
                    return Err(ConfigError::EmptyPlaylistId {
                        label: label.to_string(),
                    });
                }
                if entry.name.trim().is_empty() {
                    entry.name = entry.id.to_string();
                }
                named.push(entry);
            }
            cleaned.insert(label, named);
        }

        if !cleaned.contains_key(&EmotionLabel::Neutral) {
            return Err(ConfigError::MissingNeutralFallback);
        }

        Ok(Self { entries: cleaned })
    }

    /// Load a catalog from a JSON file.
    pub fn from_json_file(path: &Path) -> ConfigResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let raw: BTreeMap<EmotionLabel, Vec<PlaylistEntry>> =
            serde_json::from_str(&text).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        Self::new(raw)
    }

    /// The catalog shipped with the player.
    pub fn builtin() -> Self {
        let table: [(EmotionLabel, [(&str, &str); 3]); 7] = [
            (EmotionLabel::Happy, [
                ("spotify:playlist:37i9dQZF1DXdPec7aLTmlC", "Happy Hits!"),
                ("spotify:playlist:37i9dQZF1DX9XIFQuFvzM4", "Feelin' Good"),
                ("spotify:playlist:37i9dQZF1DX2sUQwD7tbmL", "Feel-Good Indie Rock"),
            ]),
            (EmotionLabel::Sad, [
                ("spotify:playlist:37i9dQZF1DX7qK8ma5wgG1", "Sad Hours"),
                ("spotify:playlist:37i9dQZF1DX889U0CL85jj", "Down in the Dumps"),
                ("spotify:playlist:37i9dQZF1DX3YSRoSdA634", "Life Sucks"),
            ]),
            (EmotionLabel::Angry, [
                ("spotify:playlist:37i9dQZF1DX1tyCD9QhIWF", "Anger Management"),
                ("spotify:playlist:37i9dQZF1DX4eRPd9frC1m", "Rock Hard"),
                ("spotify:playlist:37i9dQZF1DWXIcbzpLauPS", "Adrenaline Workout"),
            ]),
            (EmotionLabel::Neutral, [
                ("spotify:playlist:37i9dQZF1DX4sWSpwq3LiO", "Peaceful Piano"),
                ("spotify:playlist:37i9dQZF1DWZeKCadgRdKQ", "Deep Focus"),
                ("spotify:playlist:37i9dQZF1DWZqd5JICZI0u", "Instrumental Study"),
            ]),
            (EmotionLabel::Surprise, [
                ("spotify:playlist:37i9dQZF1DX5Vy6DFOcx00", "Dance Classics"),
                ("spotify:playlist:37i9dQZF1DX0BcQWzuB7ZO", "Dance Party"),
                ("spotify:playlist:37i9dQZF1DX8tZsk68tuDw", "Dance Rising"),
            ]),
            (EmotionLabel::Fear, [
                ("spotify:playlist:37i9dQZF1DX6SZazidEqln", "Confidence Boost"),
                ("spotify:playlist:37i9dQZF1DX4fpCWaHOned", "Positive Vibes"),
                ("spotify:playlist:37i9dQZF1DX9XIFQuFvzM4", "Feelin' Good"),
            ]),
            (EmotionLabel::Disgust, [
                ("spotify:playlist:37i9dQZF1DWZMCPjHG57Sq", "Soothing Relaxation"),
                ("spotify:playlist:37i9dQZF1DXcF6B6QPhFDv", "Mindful Moments"),
                ("spotify:playlist:37i9dQZF1DWYoYGBbGKurt", "Ambient Relaxation"),
            ]),
        ];

        let entries: BTreeMap<EmotionLabel, Vec<PlaylistEntry>> = table
            .into_iter()
            .map(|(label, list)| {
                let list: Vec<PlaylistEntry> = list
                    .into_iter()
                    .map(|(id, name)| PlaylistEntry::new(id, name))
                    .collect();
                (label, list)
            })
            .collect();

        Self { entries }
    }

    /// True when `label` has its own (non-fallback) list.
    pub fn has_entry(&self, label: EmotionLabel) -> bool {
        self.entries.contains_key(&label)
    }

    /// Candidates for `label`, or the neutral list when it has none.
    pub fn entries_for(&self, label: EmotionLabel) -> &[PlaylistEntry] {
        self.entries
            .get(&label)
            .or_else(|| self.entries.get(&EmotionLabel::Neutral))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Pick one candidate for `label` uniformly at random.
    pub fn choose<R: Rng>(&self, label: EmotionLabel, rng: &mut R) -> &PlaylistEntry {
        let candidates = self.entries_for(label);
        // Non-empty: construction guarantees a non-empty neutral list.
        &candidates[rng.gen_range(0..candidates.len())]
    }

    /// Iterate labels with their own lists, in label order.
    pub fn iter(&self) -> impl Iterator<Item = (EmotionLabel, &[PlaylistEntry])> {
        self.entries.iter().map(|(label, list)| (*label, list.as_slice()))
    }
}

impl Default for PlaylistCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn small_catalog() -> PlaylistCatalog {
        let mut map = BTreeMap::new();
        map.insert(EmotionLabel::Happy, vec![PlaylistEntry::new("P1", "Pop")]);
        map.insert(EmotionLabel::Neutral, vec![PlaylistEntry::new("N1", "Calm")]);
        PlaylistCatalog::new(map).expect("valid catalog")
    }

    #[test]
    fn test_missing_neutral_is_fatal() {
        let mut map = BTreeMap::new();
        map.insert(EmotionLabel::Happy, vec![PlaylistEntry::new("P1", "Pop")]);
        assert!(matches!(
            PlaylistCatalog::new(map),
            Err(ConfigError::MissingNeutralFallback)
        ));
    }

    #[test]
    fn test_empty_neutral_is_fatal() {
        let mut map = BTreeMap::new();
        map.insert(EmotionLabel::Neutral, Vec::new());
        map.insert(EmotionLabel::Sad, vec![PlaylistEntry::new("S1", "Blue")]);
        assert!(matches!(
            PlaylistCatalog::new(map),
            Err(ConfigError::MissingNeutralFallback)
        ));
    }

    #[test]
    fn test_blank_id_is_rejected() {
        let mut map = BTreeMap::new();
        map.insert(EmotionLabel::Neutral, vec![PlaylistEntry::new("  ", "Nothing")]);
        assert!(matches!(
            PlaylistCatalog::new(map),
            Err(ConfigError::EmptyPlaylistId { .. })
        ));
    }

    #[test]
    fn test_unmapped_label_falls_back_to_neutral() {
        let catalog = small_catalog();
        let mut rng = StdRng::seed_from_u64(7);

        assert!(!catalog.has_entry(EmotionLabel::Sad));
        assert_eq!(catalog.choose(EmotionLabel::Sad, &mut rng).id.as_str(), "N1");
        assert_eq!(catalog.choose(EmotionLabel::Happy, &mut rng).id.as_str(), "P1");
    }

    #[test]
    fn test_empty_list_counts_as_missing() {
        let mut map = BTreeMap::new();
        map.insert(EmotionLabel::Angry, Vec::new());
        map.insert(EmotionLabel::Neutral, vec![PlaylistEntry::new("N1", "Calm")]);
        let catalog = PlaylistCatalog::new(map).unwrap();

        assert!(!catalog.has_entry(EmotionLabel::Angry));
        assert_eq!(catalog.entries_for(EmotionLabel::Angry)[0].id.as_str(), "N1");
    }

    #[test]
    fn test_choose_stays_within_candidates() {
        let catalog = PlaylistCatalog::builtin();
        let mut rng = StdRng::seed_from_u64(42);
        let candidates = catalog.entries_for(EmotionLabel::Happy);

        for _ in 0..50 {
            let picked = catalog.choose(EmotionLabel::Happy, &mut rng);
            assert!(candidates.contains(picked));
        }
    }

    #[test]
    fn test_builtin_covers_every_label() {
        let catalog = PlaylistCatalog::builtin();
        for label in EmotionLabel::ALL {
            assert!(catalog.has_entry(label), "missing builtin entry for {label}");
            assert_eq!(catalog.entries_for(label).len(), 3);
        }
    }

    #[test]
    fn test_load_from_json_fills_missing_names() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"neutral": [{{"id": "spotify:playlist:abc"}}], "happy": [{{"id": "spotify:playlist:def", "name": "Sunny"}}]}}"#
        )
        .unwrap();

        let catalog = PlaylistCatalog::from_json_file(file.path()).unwrap();
        assert_eq!(catalog.entries_for(EmotionLabel::Neutral)[0].name, "spotify:playlist:abc");
        assert_eq!(catalog.entries_for(EmotionLabel::Happy)[0].name, "Sunny");
    }

    #[test]
    fn test_load_rejects_unknown_labels() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"neutral": [{{"id": "n"}}], "bored": [{{"id": "b"}}]}}"#).unwrap();

        let err = PlaylistCatalog::from_json_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_load_missing_file() {
        let err = PlaylistCatalog::from_json_file(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
