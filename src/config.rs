use std::path::{Path, PathBuf};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::{ReplayError, Result};

/// Sampling configuration for a replay run.
///
/// Validated once when the replay engine is built; immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// Root directory holding one subfolder per episode.
    pub folder: PathBuf,
    /// Number of distinct episodes to draw (default: 1).
    pub nepisodes: usize,
    /// Snip length, in the same time units as each episode's `dt_save`
    /// (default: 1.0).
    pub sniplen: f64,
    /// Number of most recent derived features per observation (default: 1).
    pub history_len: usize,
    /// Seed for the episode shuffle. `None` draws from OS entropy.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl ReplayConfig {
    /// Unseeded config; chain [`ReplayConfig::with_seed`] for a reproducible draw.
    pub fn new(folder: impl Into<PathBuf>, nepisodes: usize, sniplen: f64, history_len: usize) -> Self {
        Self {
            folder: folder.into(),
            nepisodes,
            sniplen,
            history_len,
            seed: None,
        }
    }

    /// Builder-style seed setter.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Random source for the episode shuffle: seeded when `seed` is set.
    pub fn rng(&self) -> ChaCha8Rng {
        match self.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        }
    }

    /// Load a configuration from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| ReplayError::io(path, e))?;
        serde_json::from_str(&text).map_err(|source| ReplayError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Range checks that do not need the filesystem.
    ///
    /// The episode-count check against the folder root happens in
    /// [`EpisodeSource::new`](crate::episode::EpisodeSource::new).
    pub fn validate(&self) -> Result<()> {
        if self.nepisodes == 0 {
            return Err(ReplayError::invalid_config("nepisodes must be at least 1"));
        }
        if !self.sniplen.is_finite() || self.sniplen <= 0.0 {
            return Err(ReplayError::invalid_config(format!(
                "sniplen must be a positive number, got {}",
                self.sniplen
            )));
        }
        if self.history_len == 0 {
            return Err(ReplayError::invalid_config("history_len must be at least 1"));
        }
        Ok(())
    }
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            folder: PathBuf::from("data/pretraining"),
            nepisodes: 1,
            sniplen: 1.0,
            history_len: 1,
            seed: None,
        }
    }
}
