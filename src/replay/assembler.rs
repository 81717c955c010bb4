//! Turning the snip stream into history-stacked observations.
//!
//! Each call to [`ObservationAssembler::get_observation_and_reward`] returns
//! one observation. Right after an episode boundary the assembler first
//! consumes `history_len - 1` snips silently so that the observation it
//! returns is backed by a full window:
//!
//! ```text
//! Init ──warm-up (0+ steps)──► Steady ──episode_done──► Init
//!   │                            │
//!   └──────────all_done──────────┴──► Terminal
//! ```

use ndarray::Array2;

use crate::config::ReplayConfig;
use crate::episode::Snip;
use crate::error::{ReplayError, Result};
use crate::replay::cursor::SnipCursor;
use crate::replay::history::HistoryBuffer;
use crate::transform::PhaseTransform;

/// Context passed to the observation function. Replay always runs a single
/// policy, so this is fixed.
pub const OBSERVATION_CONTEXT: usize = 0;

/// What the observation function produces for one snip.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationOutput {
    pub reward: f64,
    /// The scalar appended to the history window.
    pub feature: f64,
    /// Anything else the function computes. Ignored by the assembler.
    pub extras: Vec<f64>,
}

impl ObservationOutput {
    pub fn new(reward: f64, feature: f64) -> Self {
        Self {
            reward,
            feature,
            extras: Vec::new(),
        }
    }
}

/// Converts a snip into a reward and a derived feature.
///
/// Implemented for any `FnMut(&Snip, usize) -> anyhow::Result<ObservationOutput>`.
pub trait MakeObservation {
    fn make_observation(&mut self, snip: &Snip, context: usize) -> anyhow::Result<ObservationOutput>;
}

impl<F> MakeObservation for F
where
    F: FnMut(&Snip, usize) -> anyhow::Result<ObservationOutput>,
{
    fn make_observation(&mut self, snip: &Snip, context: usize) -> anyhow::Result<ObservationOutput> {
        self(snip, context)
    }
}

/// Per-episode phase of the assembler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblerPhase {
    /// History is empty or still warming up for the current episode.
    Init,
    Steady,
    Terminal,
}

/// Result of one internal step.
#[derive(Debug, Clone, Copy, PartialEq)]
struct StepOutcome {
    reward: f64,
    episode_done: bool,
    all_done: bool,
}

/// One observation handed to the training loop.
#[derive(Debug, Clone)]
pub struct Observation {
    pub reward: f64,
    /// History window as a single-sample batch, shape `(1, window)`.
    pub stacked: Array2<f64>,
    pub episode_done: bool,
    pub all_done: bool,
}

/// Builds sliding-window observations from replayed snips.
#[derive(Debug)]
pub struct ObservationAssembler<O> {
    cursor: SnipCursor,
    history: HistoryBuffer,
    history_len: usize,
    observe: O,
    phase: AssemblerPhase,
    // Set by a step that ended an episode; history is cleared before the
    // next step reads or extends it.
    reset_pending: bool,
}

impl<O: MakeObservation> ObservationAssembler<O> {
    pub fn new(cursor: SnipCursor, history_len: usize, observe: O) -> Result<Self> {
        if history_len == 0 {
            return Err(ReplayError::invalid_config("history_len must be at least 1"));
        }
        Ok(Self {
            cursor,
            history: HistoryBuffer::new(history_len),
            history_len,
            observe,
            phase: AssemblerPhase::Init,
            reset_pending: false,
        })
    }

    /// Sample episodes as configured and wrap every trajectory in `[-π, π)`.
    pub fn from_config(config: &ReplayConfig, observe: O) -> Result<Self> {
        Self::from_config_with_transform(config, Box::new(crate::transform::wrap_phase), observe)
    }

    pub fn from_config_with_transform(
        config: &ReplayConfig,
        transform: PhaseTransform,
        observe: O,
    ) -> Result<Self> {
        let cursor = SnipCursor::from_config_with_transform(config, transform)?;
        Self::new(cursor, config.history_len, observe)
    }

    /// Produce the next observation.
    ///
    /// After an episode boundary this first steps `history_len - 1` times,
    /// discarding rewards and flags, then returns the outcome of one more
    /// step. If the data runs out during warm-up the partial window is
    /// returned with `all_done` set.
    pub fn get_observation_and_reward(&mut self) -> Result<Observation> {
        if self.phase == AssemblerPhase::Terminal {
            return Err(ReplayError::Exhausted);
        }
        self.apply_pending_reset();

        let warm_up = self.history_len - 1;
        while self.history.len() < warm_up {
            let step = self.step()?;
            if step.all_done {
                return Ok(self.emit(step));
            }
        }

        let step = self.step()?;
        Ok(self.emit(step))
    }

    /// Pull one snip, record its feature, and report its reward and flags.
    ///
    /// A step that ends an episode leaves its window intact so it can still be
    /// emitted; the window is dropped before anything from the next episode
    /// is appended.
    fn step(&mut self) -> Result<StepOutcome> {
        self.apply_pending_reset();
        let data = self.cursor.get_data_snip()?;
        let out = self
            .observe
            .make_observation(&data.snip, OBSERVATION_CONTEXT)?;
        self.history.append(out.feature);
        self.reset_pending = data.episode_done;
        if data.all_done {
            self.phase = AssemblerPhase::Terminal;
        } else if data.episode_done {
            self.phase = AssemblerPhase::Init;
        }
        Ok(StepOutcome {
            reward: out.reward,
            episode_done: data.episode_done,
            all_done: data.all_done,
        })
    }

    pub fn phase(&self) -> AssemblerPhase {
        self.phase
    }

    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    pub fn history_len(&self) -> usize {
        self.history_len
    }

    pub fn cursor(&self) -> &SnipCursor {
        &self.cursor
    }

    fn apply_pending_reset(&mut self) {
        if self.reset_pending {
            self.history.clear();
            self.reset_pending = false;
        }
    }

    // Snapshot before clearing: the observation ending an episode still
    // carries that episode's window.
    fn emit(&mut self, step: StepOutcome) -> Observation {
        let stacked = self.history.as_batch();
        self.phase = if step.all_done {
            AssemblerPhase::Terminal
        } else if step.episode_done {
            self.apply_pending_reset();
            AssemblerPhase::Init
        } else {
            AssemblerPhase::Steady
        };
        Observation {
            reward: step.reward,
            stacked,
            episode_done: step.episode_done,
            all_done: step.all_done,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use super::*;
    use crate::episode::loader::fixtures::write_episode;
    use crate::episode::{EpisodeLoader, EpisodeSource};
    use crate::transform;

    /// Feature is the first sample of the snip, reward its last.
    fn first_sample(snip: &Snip, context: usize) -> anyhow::Result<ObservationOutput> {
        assert_eq!(context, OBSERVATION_CONTEXT);
        let last = snip.ncols() - 1;
        Ok(ObservationOutput::new(snip[[0, last]], snip[[0, 0]]))
    }

    type ObsFn = fn(&Snip, usize) -> anyhow::Result<ObservationOutput>;

    fn assembler(root: &Path, order: &[&str], history_len: usize) -> ObservationAssembler<ObsFn> {
        let folders: Vec<PathBuf> = order.iter().map(|n| root.join(n)).collect();
        let source = EpisodeSource::in_order(folders);
        let loader = EpisodeLoader::with_transform(1.0, Box::new(transform::identity));
        let cursor = SnipCursor::new(source, loader).unwrap();
        ObservationAssembler::new(cursor, history_len, first_sample as ObsFn).unwrap()
    }

    fn window(obs: &Observation) -> Vec<f64> {
        obs.stacked.row(0).to_vec()
    }

    #[test]
    fn warm_up_fills_history_before_first_observation() {
        let root = tempfile::tempdir().unwrap();
        write_episode(root.path(), "A", 1.0, 1, 6, 0.0);
        let mut a = assembler(root.path(), &["A"], 3);
        assert_eq!(a.phase(), AssemblerPhase::Init);

        let obs = a.get_observation_and_reward().unwrap();
        assert_eq!(window(&obs), vec![0.0, 1.0, 2.0]);
        assert_eq!(obs.stacked.dim(), (1, 3));
        assert_eq!(obs.reward, 2.0);
        assert!(!obs.episode_done && !obs.all_done);
        assert_eq!(a.phase(), AssemblerPhase::Steady);

        // Steady state: one snip per call, window slides by one.
        let obs = a.get_observation_and_reward().unwrap();
        assert_eq!(window(&obs), vec![1.0, 2.0, 3.0]);
        assert_eq!(a.history().len(), 3);
    }

    #[test]
    fn history_restarts_at_episode_boundary() {
        let root = tempfile::tempdir().unwrap();
        write_episode(root.path(), "A", 1.0, 1, 4, 0.0);
        write_episode(root.path(), "B", 1.0, 1, 4, 100.0);
        let mut a = assembler(root.path(), &["A", "B"], 3);

        let o1 = a.get_observation_and_reward().unwrap();
        assert_eq!(window(&o1), vec![0.0, 1.0, 2.0]);

        let o2 = a.get_observation_and_reward().unwrap();
        assert_eq!(window(&o2), vec![1.0, 2.0, 3.0]);
        assert!(o2.episode_done && !o2.all_done);
        assert_eq!(a.phase(), AssemblerPhase::Init);
        assert!(a.history().is_empty());

        let o3 = a.get_observation_and_reward().unwrap();
        assert_eq!(window(&o3), vec![100.0, 101.0, 102.0]);
        assert!(!o3.episode_done);

        let o4 = a.get_observation_and_reward().unwrap();
        assert_eq!(window(&o4), vec![101.0, 102.0, 103.0]);
        assert!(o4.episode_done && o4.all_done);
        assert_eq!(a.phase(), AssemblerPhase::Terminal);

        assert!(matches!(
            a.get_observation_and_reward(),
            Err(ReplayError::Exhausted)
        ));
    }

    #[test]
    fn warm_up_skips_episode_shorter_than_window() {
        let root = tempfile::tempdir().unwrap();
        write_episode(root.path(), "short", 1.0, 1, 1, 0.0);
        write_episode(root.path(), "long", 1.0, 1, 5, 100.0);
        let mut a = assembler(root.path(), &["short", "long"], 3);

        let obs = a.get_observation_and_reward().unwrap();
        assert_eq!(window(&obs), vec![100.0, 101.0, 102.0]);
        assert!(!obs.episode_done);
    }

    #[test]
    fn stepping_across_a_boundary_does_not_mix_episodes() {
        let root = tempfile::tempdir().unwrap();
        write_episode(root.path(), "A", 1.0, 1, 2, 0.0);
        write_episode(root.path(), "B", 1.0, 1, 4, 100.0);
        let mut a = assembler(root.path(), &["A", "B"], 3);

        assert!(!a.step().unwrap().episode_done);
        let last_of_a = a.step().unwrap();
        assert!(last_of_a.episode_done && !last_of_a.all_done);
        assert_eq!(a.phase(), AssemblerPhase::Init);

        let obs = a.get_observation_and_reward().unwrap();
        assert_eq!(window(&obs), vec![100.0, 101.0, 102.0]);
        assert!(!obs.episode_done);
        assert_eq!(a.phase(), AssemblerPhase::Steady);
    }

    #[test]
    fn data_running_out_during_warm_up_returns_partial_window() {
        let root = tempfile::tempdir().unwrap();
        write_episode(root.path(), "A", 1.0, 1, 2, 0.0);
        let mut a = assembler(root.path(), &["A"], 4);

        let obs = a.get_observation_and_reward().unwrap();
        assert_eq!(window(&obs), vec![0.0, 1.0]);
        assert!(obs.episode_done && obs.all_done);
        assert_eq!(a.phase(), AssemblerPhase::Terminal);
    }

    #[test]
    fn history_len_one_has_no_warm_up() {
        let root = tempfile::tempdir().unwrap();
        write_episode(root.path(), "A", 1.0, 1, 3, 0.0);
        let mut a = assembler(root.path(), &["A"], 1);
        assert_eq!(a.history_len(), 1);

        let rewards: Vec<f64> = (0..3)
            .map(|_| a.get_observation_and_reward().unwrap())
            .map(|o| {
                assert_eq!(o.stacked.dim(), (1, 1));
                o.reward
            })
            .collect();
        assert_eq!(rewards, vec![0.0, 1.0, 2.0]);
        assert_eq!(a.phase(), AssemblerPhase::Terminal);
    }

    #[test]
    fn observation_function_sees_whole_snip() {
        let root = tempfile::tempdir().unwrap();
        write_episode(root.path(), "A", 0.5, 3, 8, 0.0);

        let mut widths = Vec::new();
        {
            let source = EpisodeSource::in_order(vec![root.path().join("A")]);
            let loader = EpisodeLoader::with_transform(1.0, Box::new(transform::identity));
            let cursor = SnipCursor::new(source, loader).unwrap();
            let observe = |snip: &Snip, _ctx: usize| -> anyhow::Result<ObservationOutput> {
                widths.push(snip.dim());
                Ok(ObservationOutput {
                    reward: snip.sum(),
                    feature: snip.mean().unwrap_or(0.0),
                    extras: vec![1.0, 2.0],
                })
            };
            let mut a = ObservationAssembler::new(cursor, 2, observe).unwrap();
            let obs = a.get_observation_and_reward().unwrap();
            // Second snip covers columns 2..4 across three channels.
            assert_eq!(obs.reward, 3.0 * (2.0 + 3.0));
            assert_eq!(window(&obs), vec![0.5, 2.5]);
        }
        assert_eq!(widths, vec![(3, 2), (3, 2)]);
    }

    #[test]
    fn observation_error_propagates() {
        let root = tempfile::tempdir().unwrap();
        write_episode(root.path(), "A", 1.0, 1, 3, 0.0);
        let source = EpisodeSource::in_order(vec![root.path().join("A")]);
        let loader = EpisodeLoader::with_transform(1.0, Box::new(transform::identity));
        let cursor = SnipCursor::new(source, loader).unwrap();
        let failing = |_: &Snip, _: usize| -> anyhow::Result<ObservationOutput> {
            anyhow::bail!("policy feature extraction failed")
        };
        let mut a = ObservationAssembler::new(cursor, 1, failing).unwrap();
        let err = a.get_observation_and_reward().unwrap_err();
        assert!(matches!(err, ReplayError::Observation(_)));
    }

    #[test]
    fn from_config_rejects_too_many_episodes() {
        let root = tempfile::tempdir().unwrap();
        write_episode(root.path(), "A", 1.0, 1, 3, 0.0);
        let config = ReplayConfig::new(root.path(), 2, 1.0, 2).with_seed(1);
        let err = ObservationAssembler::from_config(&config, first_sample as ObsFn).unwrap_err();
        assert!(matches!(err, ReplayError::InsufficientData { .. }));
    }

    #[test]
    fn from_config_replays_every_snip() {
        let root = tempfile::tempdir().unwrap();
        write_episode(root.path(), "A", 0.1, 2, 23, 0.0);
        write_episode(root.path(), "B", 0.1, 2, 12, 0.0);
        let config = ReplayConfig::new(root.path(), 2, 0.5, 1).with_seed(2024);
        let mut a = ObservationAssembler::from_config_with_transform(
            &config,
            Box::new(transform::identity),
            first_sample as ObsFn,
        )
        .unwrap();

        let mut observations = 0;
        let mut episodes = 0;
        loop {
            let obs = a.get_observation_and_reward().unwrap();
            observations += 1;
            if obs.episode_done {
                episodes += 1;
            }
            if obs.all_done {
                break;
            }
        }
        // floor(23 / 5) + floor(12 / 5)
        assert_eq!(observations, 4 + 2);
        assert_eq!(episodes, 2);
    }
}
