//! Craps execution layer.
//!
//! This crate turns a source of randomness into finished rounds:
//! - [`dice`] samples one [`Roll`](crapsim_types::Roll) from a [`DiceSource`].
//! - [`round`] drives the come-out/point state machine until the shooter wins or loses.
//!
//! Nothing here spawns tasks or keeps cumulative results; that is the simulator's job.
//!
//! ## Playing a round (example)
//! ```rust
//! use crapsim_execution::Round;
//! use crapsim_types::Tally;
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let mut round = Round::new(StdRng::seed_from_u64(7));
//! let win = round.play().unwrap();
//! assert_eq!(win, round.is_win());
//! let snapshot = round.snapshot(Tally::default()).unwrap();
//! assert_eq!(snapshot.rounds(), 1);
//! ```

use thiserror::Error as ThisError;

pub mod dice;
pub mod round;

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;

pub use dice::{roll, DiceSource, SourceError};
pub use round::Round;

/// Failure while rolling or playing a round.
#[derive(Clone, Debug, ThisError, PartialEq, Eq)]
pub enum Error {
    /// A dice or round rule was violated.
    #[error(transparent)]
    Rules(#[from] crapsim_types::Error),
    /// The randomness source misbehaved.
    #[error(transparent)]
    Source(#[from] SourceError),
}
