//! Random, non-repeating selection of episode folders.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::{ReplayError, Result};

/// Draws `nepisodes` distinct episode folders from a root directory, in a
/// random order fixed at construction.
#[derive(Debug, Clone)]
pub struct EpisodeSource {
    available: usize,
    pending: VecDeque<PathBuf>,
}

impl EpisodeSource {
    /// Scan `root` for immediate subfolders and draw `nepisodes` of them.
    ///
    /// Fails with [`ReplayError::InsufficientData`] when fewer than
    /// `nepisodes` folders exist. No episode data is read here.
    pub fn new<R: Rng + ?Sized>(root: &Path, nepisodes: usize, rng: &mut R) -> Result<Self> {
        let mut folders = list_episode_folders(root)?;
        let available = folders.len();
        tracing::info!(
            root = %root.display(),
            folders = available,
            requested = nepisodes,
            "scanned training folder"
        );

        if nepisodes > available {
            return Err(ReplayError::InsufficientData {
                requested: nepisodes,
                available,
                root: root.to_path_buf(),
            });
        }

        folders.shuffle(rng);
        folders.truncate(nepisodes);

        Ok(Self {
            available,
            pending: folders.into(),
        })
    }

    /// Replay an explicit list of episode folders in the given order.
    pub fn in_order(folders: Vec<PathBuf>) -> Self {
        Self {
            available: folders.len(),
            pending: folders.into(),
        }
    }

    /// Next folder in draw order, or `None` once every drawn folder was handed out.
    pub fn draw(&mut self) -> Option<PathBuf> {
        self.pending.pop_front()
    }

    /// Folders still waiting to be drawn.
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    /// Number of episode folders found under the root.
    pub fn available(&self) -> usize {
        self.available
    }
}

/// Immediate subdirectories of `root`, sorted so that a seeded shuffle does
/// not depend on directory iteration order.
pub fn list_episode_folders(root: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(root).map_err(|e| ReplayError::io(root, e))?;

    let mut folders = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ReplayError::io(root, e))?;
        let path = entry.path();
        if path.is_dir() {
            folders.push(path);
        }
    }
    folders.sort();
    Ok(folders)
}
