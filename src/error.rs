//! Error types for snip replay.
//!
//! Exhaustion of an episode or of the whole sampled set is *not* an error: it
//! is reported through the `episode_done` / `all_done` flags. Everything in
//! [`ReplayError`] aborts the run.

use std::path::PathBuf;

use thiserror::Error;

/// Unified error type for the replay engine.
#[derive(Error, Debug)]
pub enum ReplayError {
    /// More episodes were requested than the folder root contains.
    #[error(
        "pretraining data shorter than requested: {requested} episodes requested, \
         {available} folders available in {}",
        .root.display()
    )]
    InsufficientData {
        requested: usize,
        available: usize,
        root: PathBuf,
    },

    /// `sniplen` is not an exact multiple of the episode's `dt_save`.
    #[error(
        "snip length {sniplen} is not a multiple of the data sampling interval {dt_save} in {}",
        .folder.display()
    )]
    SamplingMismatch {
        folder: PathBuf,
        sniplen: f64,
        dt_save: f64,
    },

    /// The episode set is empty, so there is no first episode to start from.
    #[error("no episodes available to replay")]
    NoEpisodes,

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A JSON file (episode metadata or replay config) is malformed or
    /// missing a required key.
    #[error("failed to parse {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The `data` array could not be read as a 2-D float array.
    #[error("failed to read trajectory array {}: {source}", .path.display())]
    Array {
        path: PathBuf,
        #[source]
        source: ndarray_npy::ReadNpyError,
    },

    /// Filesystem access failed.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A snip or observation was requested after `all_done` was reported.
    #[error("replay data exhausted; no further snips can be produced")]
    Exhausted,

    /// The injected observation function failed.
    #[error(transparent)]
    Observation(#[from] anyhow::Error),
}

impl ReplayError {
    /// Creates an invalid-configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        ReplayError::InvalidConfig(message.into())
    }

    /// Creates an I/O error tagged with the path that failed.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ReplayError::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the dataset cannot satisfy the configuration: too few
    /// episodes, a sampling-interval mismatch, or out-of-range settings.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            ReplayError::InsufficientData { .. }
                | ReplayError::SamplingMismatch { .. }
                | ReplayError::InvalidConfig(_)
                | ReplayError::NoEpisodes
        )
    }
}

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, ReplayError>;
