//! Common types for the craps simulator.
//!
//! Everything here is plain data: a [`Roll`] of the dice, the round [`State`] with its
//! transition table, the cumulative [`Tally`] and the immutable [`Snapshot`] handed to
//! observers. Randomness and scheduling live in `crapsim-execution` and
//! `crapsim-simulator`.

use thiserror::Error as ThisError;

pub mod craps;
pub mod roll;
pub mod snapshot;

pub use craps::{State, NUM_DICE, NUM_SIDES};
pub use roll::Roll;
pub use snapshot::{Snapshot, Tally};

/// Rule and invariant violations raised by the plain data types.
#[derive(Clone, Debug, ThisError, PartialEq, Eq)]
pub enum Error {
    #[error("invalid dice configuration: {num_dice} dice with {num_sides} sides (need >= 1 die and >= 2 sides)")]
    InvalidDice { num_dice: u8, num_sides: u8 },
    #[error("die face {face} out of range for a {num_sides}-sided die")]
    InvalidFace { face: u8, num_sides: u8 },
    #[error("no transition out of terminal state {0}")]
    TerminalState(State),
    #[error("round has not finished (state {0})")]
    UnfinishedRound(State),
}

impl Error {
    /// Malformed configuration or input, rejected before any state changes.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidDice { .. } | Self::InvalidFace { .. })
    }

    /// Engine contract violated; indicates a bug rather than bad input.
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, Self::TerminalState(_) | Self::UnfinishedRound(_))
    }
}
