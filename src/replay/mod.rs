//! The stateful replay engine.
//!
//! - [`cursor::SnipCursor`] -- walks every snip of every drawn episode and
//!   reports episode / run boundaries.
//! - [`history::HistoryBuffer`] -- bounded FIFO of recent derived features.
//! - [`assembler::ObservationAssembler`] -- combines the two with an injected
//!   observation function to emit history-stacked observations.

pub mod assembler;
pub mod cursor;
pub mod history;

pub use assembler::{
    AssemblerPhase, MakeObservation, Observation, ObservationAssembler, ObservationOutput,
    OBSERVATION_CONTEXT,
};
pub use cursor::{Advance, CursorState, DataSnip, SnipCursor};
pub use history::HistoryBuffer;
