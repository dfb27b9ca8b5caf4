//! Craps round phases and the pass-line transition table.
//!
//! Come-out roll: 7/11 = win, 2/3/12 = lose, anything else establishes the point.
//! Point phase: rolling the point = win, 7 = lose, anything else keeps rolling.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::Error;

/// Dice thrown per roll.
pub const NUM_DICE: u8 = 2;

/// Faces per die.
pub const NUM_SIDES: u8 = 6;

/// Round state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum State {
    #[default]
    ComeOut,
    Point,
    Win,
    Loss,
}

impl State {
    /// State every round starts in.
    pub const fn initial() -> Self {
        Self::ComeOut
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Win | Self::Loss)
    }

    /// Advance on a roll summing to `value`.
    ///
    /// `point` is only consulted in [`State::Point`]. Calling this on a terminal state
    /// is a contract violation and returns [`Error::TerminalState`].
    pub fn next(self, value: u16, point: u16) -> Result<Self, Error> {
        match self {
            Self::ComeOut => Ok(match value {
                2 | 3 | 12 => Self::Loss,
                7 | 11 => Self::Win,
                _ => Self::Point,
            }),
            Self::Point => Ok(if value == point {
                Self::Win
            } else if value == 7 {
                Self::Loss
            } else {
                Self::Point
            }),
            Self::Win | Self::Loss => Err(Error::TerminalState(self)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ComeOut => "come_out",
            Self::Point => "point",
            Self::Win => "win",
            Self::Loss => "loss",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
