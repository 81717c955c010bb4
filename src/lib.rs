//! snipreplay: replay precomputed simulation trajectories for RL pretraining.
//!
//! Episodes are drawn at random from a folder of recorded trajectories, cut
//! into fixed-length snips, and turned into observations that stack the most
//! recent derived features of each episode.

pub mod config;
pub mod episode;
pub mod error;
pub mod observe;
pub mod replay;
pub mod transform;

pub use config::ReplayConfig;
pub use error::{ReplayError, Result};
pub use replay::{ObservationAssembler, SnipCursor};
