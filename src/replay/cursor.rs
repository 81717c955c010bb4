//! Snip-by-snip walk over the sampled episodes.
//!
//! ```text
//!                 pop ok
//!              ┌─────────┐
//!              ▼         │
//!   new ──► WithinEpisode ──pop empty──► EpisodeExhausted ──next folder──► WithinEpisode
//!                                               │
//!                                          source empty
//!                                               ▼
//!                                          AllExhausted (terminal)
//! ```

use std::path::Path;

use crate::config::ReplayConfig;
use crate::episode::{Episode, EpisodeLoader, EpisodeSource, Snip};
use crate::error::{ReplayError, Result};
use crate::transform::{self, PhaseTransform};

/// Where the cursor stands between calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    WithinEpisode,
    /// Transient while the next episode is loaded. Only observable from
    /// outside if that load failed.
    EpisodeExhausted,
    AllExhausted,
}

/// What a single [`SnipCursor::advance`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Moved to the next snip of the same episode.
    Stepped,
    /// The episode ran out; moved to the first snip of the next one.
    NextEpisode,
    /// The episode ran out and no episodes remain.
    Exhausted,
}

/// One result of [`SnipCursor::get_data_snip`].
#[derive(Debug, Clone)]
pub struct DataSnip {
    pub snip: Snip,
    /// This was the last snip of its episode.
    pub episode_done: bool,
    /// This was the last snip of the whole run.
    pub all_done: bool,
}

/// Walks the snips of every drawn episode in order.
#[derive(Debug)]
pub struct SnipCursor {
    source: EpisodeSource,
    loader: EpisodeLoader,
    episode: Option<Episode>,
    current: Option<Snip>,
    state: CursorState,
    episodes_started: usize,
}

impl SnipCursor {
    /// Load the first episode and position on its first snip.
    ///
    /// Fails with [`ReplayError::NoEpisodes`] if the source yields no episode
    /// with at least one snip.
    pub fn new(source: EpisodeSource, loader: EpisodeLoader) -> Result<Self> {
        let mut cursor = Self {
            source,
            loader,
            episode: None,
            current: None,
            state: CursorState::EpisodeExhausted,
            episodes_started: 0,
        };
        match cursor.next_episode()? {
            Some(episode) => cursor.enter(episode),
            None => return Err(ReplayError::NoEpisodes),
        }
        Ok(cursor)
    }

    /// Draw episodes as configured, wrapping phases into `[-π, π)`.
    pub fn from_config(config: &ReplayConfig) -> Result<Self> {
        Self::from_config_with_transform(config, Box::new(transform::wrap_phase))
    }

    pub fn from_config_with_transform(config: &ReplayConfig, transform: PhaseTransform) -> Result<Self> {
        config.validate()?;
        let mut rng = config.rng();
        let source = EpisodeSource::new(&config.folder, config.nepisodes, &mut rng)?;
        Self::new(source, EpisodeLoader::with_transform(config.sniplen, transform))
    }

    /// Return the current snip and move to the one after it.
    ///
    /// `episode_done` is set on the last snip of each episode, `all_done` on
    /// the last snip of the run. Calling again after `all_done` returns
    /// [`ReplayError::Exhausted`].
    pub fn get_data_snip(&mut self) -> Result<DataSnip> {
        if self.state == CursorState::AllExhausted {
            return Err(ReplayError::Exhausted);
        }
        let snip = self.current.take().ok_or(ReplayError::Exhausted)?;
        let advance = self.advance()?;
        Ok(DataSnip {
            snip,
            episode_done: advance != Advance::Stepped,
            all_done: advance == Advance::Exhausted,
        })
    }

    /// Move to the next snip, loading the next episode if needed.
    pub fn advance(&mut self) -> Result<Advance> {
        if self.state == CursorState::AllExhausted {
            return Err(ReplayError::Exhausted);
        }
        self.current = None;

        if let Some(snip) = self.episode.as_mut().and_then(Episode::pop_snip) {
            self.current = Some(snip);
            return Ok(Advance::Stepped);
        }

        self.state = CursorState::EpisodeExhausted;
        self.episode = None;

        match self.next_episode()? {
            Some(episode) => {
                self.enter(episode);
                Ok(Advance::NextEpisode)
            }
            None => {
                self.state = CursorState::AllExhausted;
                tracing::info!(episodes = self.episodes_started, "training data done");
                Ok(Advance::Exhausted)
            }
        }
    }

    pub fn state(&self) -> CursorState {
        self.state
    }

    /// Folder the next snip comes from; `None` once exhausted.
    pub fn current_folder(&self) -> Option<&Path> {
        self.episode.as_ref().map(Episode::folder)
    }

    /// Episodes entered so far, including the current one.
    pub fn episodes_started(&self) -> usize {
        self.episodes_started
    }

    /// Episodes still waiting in the source.
    pub fn episodes_remaining(&self) -> usize {
        self.source.remaining()
    }

    /// Draw folders until one loads with at least one snip.
    ///
    /// Load errors propagate; narrow episodes are skipped.
    fn next_episode(&mut self) -> Result<Option<Episode>> {
        while let Some(folder) = self.source.draw() {
            let episode = self.loader.load(&folder)?;
            if episode.is_empty() {
                tracing::warn!(
                    folder = %folder.display(),
                    points_per_snip = episode.points_per_snip(),
                    "episode shorter than one snip, skipping"
                );
                continue;
            }
            return Ok(Some(episode));
        }
        Ok(None)
    }

    fn enter(&mut self, mut episode: Episode) {
        self.current = episode.pop_snip();
        self.episode = Some(episode);
        self.state = CursorState::WithinEpisode;
        self.episodes_started += 1;
    }
}
