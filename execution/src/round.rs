//! One shooter's round, from the come-out roll to a win or a loss.
//!
//! A [`Round`] owns its dice source and is replayed: every [`Round::play`] starts from
//! the come-out state with an empty history. The point is latched from the come-out
//! roll only, since a round has exactly one come-out.

use crapsim_types::{Roll, Snapshot, State, Tally, NUM_DICE, NUM_SIDES};

use crate::{dice, DiceSource, Error};

#[derive(Debug)]
pub struct Round<S> {
    source: S,
    rolls: Vec<Roll>,
    state: State,
    point: Option<u16>,
    win: bool,
}

impl<S: DiceSource> Round<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            rolls: Vec::new(),
            state: State::initial(),
            point: None,
            win: false,
        }
    }

    /// Play a full round and return whether the shooter won.
    ///
    /// On error the partial history is left in place until the next call.
    pub fn play(&mut self) -> Result<bool, Error> {
        self.state = State::initial();
        self.rolls.clear();
        self.point = None;
        self.win = false;

        while !self.state.is_terminal() {
            let roll = dice::roll(&mut self.source, NUM_DICE, NUM_SIDES)?;
            let next = self.state.next(roll.value(), self.point.unwrap_or_default())?;
            if self.rolls.is_empty() && next == State::Point {
                self.point = Some(roll.value());
            }
            self.rolls.push(roll);
            self.state = next;
        }

        self.win = self.state == State::Win;
        Ok(self.win)
    }

    /// Fold the last completed play into `previous`.
    pub fn snapshot(&self, previous: Tally) -> Result<Snapshot, Error> {
        Ok(Snapshot::after_round(previous, &self.rolls, self.state)?)
    }

    /// Rolls of the current play, come-out roll first.
    pub fn rolls(&self) -> &[Roll] {
        &self.rolls
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Point established by the come-out roll, if any.
    pub fn point(&self) -> Option<u16> {
        self.point
    }

    /// Only meaningful once [`Round::state`] is terminal.
    pub fn is_win(&self) -> bool {
        self.win
    }
}
