//! Episode selection and loading.
//!
//! - [`source::EpisodeSource`] -- draws a random, non-repeating subset of the
//!   episode folders under a root directory.
//! - [`loader::EpisodeLoader`] -- reads one folder, checks its sampling
//!   interval against the snip length, and splits it into [`Snip`]s.

pub mod loader;
pub mod source;

pub use loader::{Episode, EpisodeLoader, EpisodeMetadata, Snip};
pub use source::EpisodeSource;
