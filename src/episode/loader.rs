//! Loading a single episode folder and splitting it into snips.
//!
//! Folder layout:
//!
//! ```text
//! <episode>/
//!   initial-conditions.txt   JSON, must contain "julia simulation dt save"
//!   data                     .npy, float64, shape (channels, time_samples)
//! ```

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use ndarray::{s, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{ReplayError, Result};
use crate::transform::{self, PhaseTransform};

/// Name of the per-episode metadata file.
pub const METADATA_FILE: &str = "initial-conditions.txt";
/// Name of the per-episode trajectory array file.
pub const DATA_FILE: &str = "data";

/// Relative tolerance when checking that `sniplen` is a multiple of `dt_save`.
const MULTIPLE_TOLERANCE: f64 = 1e-9;

/// A fixed-width column slice of a trajectory, shape `(channels, points_per_snip)`.
pub type Snip = Array2<f64>;

/// The subset of `initial-conditions.txt` the replay engine needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeMetadata {
    /// Interval between consecutive stored samples.
    #[serde(rename = "julia simulation dt save")]
    pub dt_save: f64,
}

impl EpisodeMetadata {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| ReplayError::io(path, e))?;
        let meta: Self = serde_json::from_str(&text).map_err(|source| ReplayError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        if !meta.dt_save.is_finite() || meta.dt_save <= 0.0 {
            return Err(ReplayError::invalid_config(format!(
                "{}: dt save must be a positive number, got {}",
                path.display(),
                meta.dt_save
            )));
        }
        Ok(meta)
    }
}

/// One loaded episode: its snips are fully materialized before iteration.
#[derive(Debug, Clone)]
pub struct Episode {
    folder: PathBuf,
    points_per_snip: usize,
    dropped_points: usize,
    snips: VecDeque<Snip>,
}

impl Episode {
    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn points_per_snip(&self) -> usize {
        self.points_per_snip
    }

    /// Trailing columns that did not fill a whole snip.
    pub fn dropped_points(&self) -> usize {
        self.dropped_points
    }

    /// Snips not yet consumed.
    pub fn len(&self) -> usize {
        self.snips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snips.is_empty()
    }

    /// Take the next snip in time order.
    pub fn pop_snip(&mut self) -> Option<Snip> {
        self.snips.pop_front()
    }
}

/// Number of stored samples per snip.
///
/// Fails with [`ReplayError::SamplingMismatch`] unless `sniplen` is a positive
/// integer multiple of `dt_save`.
pub fn points_per_snip(sniplen: f64, dt_save: f64, folder: &Path) -> Result<usize> {
    let ratio = sniplen / dt_save;
    let rounded = ratio.round();
    let off_grid = (ratio - rounded).abs() > MULTIPLE_TOLERANCE * ratio.abs().max(1.0);
    if !ratio.is_finite() || off_grid || rounded < 1.0 {
        return Err(ReplayError::SamplingMismatch {
            folder: folder.to_path_buf(),
            sniplen,
            dt_save,
        });
    }
    Ok(rounded as usize)
}

/// Split `trajectory` into `floor(width / points_per_snip)` consecutive snips.
/// Remainder columns are dropped.
pub fn split_snips(trajectory: &Array2<f64>, points_per_snip: usize) -> VecDeque<Snip> {
    let n_snips = trajectory.ncols() / points_per_snip;
    (0..n_snips)
        .map(|i| {
            let start = i * points_per_snip;
            trajectory.slice(s![.., start..start + points_per_snip]).to_owned()
        })
        .collect()
}

/// Opens episode folders and turns them into [`Episode`]s for one snip length.
pub struct EpisodeLoader {
    sniplen: f64,
    transform: PhaseTransform,
}

impl EpisodeLoader {
    /// Loader using [`transform::wrap_phase`] as the normalization step.
    pub fn new(sniplen: f64) -> Self {
        Self::with_transform(sniplen, Box::new(transform::wrap_phase))
    }

    pub fn with_transform(sniplen: f64, transform: PhaseTransform) -> Self {
        Self { sniplen, transform }
    }

    /// Read, normalize, validate and split one episode folder.
    pub fn load(&self, folder: &Path) -> Result<Episode> {
        let meta = EpisodeMetadata::from_file(&folder.join(METADATA_FILE))?;
        let points_per_snip = points_per_snip(self.sniplen, meta.dt_save, folder)?;

        let raw = read_trajectory(&folder.join(DATA_FILE))?;
        let trajectory = (self.transform)(raw);

        let snips = split_snips(&trajectory, points_per_snip);
        let dropped_points = trajectory.ncols() % points_per_snip;

        tracing::debug!(
            folder = %folder.display(),
            dt_save = meta.dt_save,
            channels = trajectory.nrows(),
            width = trajectory.ncols(),
            points_per_snip,
            snips = snips.len(),
            dropped_points,
            "loaded episode"
        );

        Ok(Episode {
            folder: folder.to_path_buf(),
            points_per_snip,
            dropped_points,
            snips,
        })
    }
}

impl std::fmt::Debug for EpisodeLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EpisodeLoader")
            .field("sniplen", &self.sniplen)
            .finish_non_exhaustive()
    }
}

/// Read a `(channels, time_samples)` float64 array from an `.npy` file.
pub fn read_trajectory(path: &Path) -> Result<Array2<f64>> {
    ndarray_npy::read_npy(path).map_err(|source| ReplayError::Array {
        path: path.to_path_buf(),
        source,
    })
}
