//! Observable results of the simulation.
//!
//! A [`Snapshot`] pairs the cumulative [`Tally`] with the detail of the most recently
//! completed round. Snapshots are owned values: the roll history is copied out of the
//! round that produced it, so the round can be replayed without touching anything an
//! observer already holds.

use serde::Serialize;

use crate::{Error, Roll, State};

/// Cumulative win/loss counts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Tally {
    pub wins: u64,
    pub losses: u64,
}

impl Tally {
    pub fn new(wins: u64, losses: u64) -> Self {
        Self { wins, losses }
    }

    /// Tally after one more round with the given outcome.
    pub fn record(self, win: bool) -> Self {
        if win {
            Self {
                wins: self.wins.saturating_add(1),
                ..self
            }
        } else {
            Self {
                losses: self.losses.saturating_add(1),
                ..self
            }
        }
    }

    pub fn rounds(&self) -> u64 {
        self.wins.saturating_add(self.losses)
    }
}

/// Cumulative tally plus the latest round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    wins: u64,
    losses: u64,
    rolls: Vec<Roll>,
    state: State,
    win: bool,
}

impl Snapshot {
    /// Snapshot before any round has been played.
    pub fn initial() -> Self {
        Self {
            wins: 0,
            losses: 0,
            rolls: Vec::new(),
            state: State::initial(),
            win: false,
        }
    }

    /// Fold a finished round into `previous`.
    ///
    /// `rolls` is copied. Returns [`Error::UnfinishedRound`] if `state` is not terminal.
    pub fn after_round(previous: Tally, rolls: &[Roll], state: State) -> Result<Self, Error> {
        if !state.is_terminal() {
            return Err(Error::UnfinishedRound(state));
        }
        let win = state == State::Win;
        let tally = previous.record(win);
        Ok(Self {
            wins: tally.wins,
            losses: tally.losses,
            rolls: rolls.to_vec(),
            state,
            win,
        })
    }

    pub fn wins(&self) -> u64 {
        self.wins
    }

    pub fn losses(&self) -> u64 {
        self.losses
    }

    pub fn rounds(&self) -> u64 {
        self.tally().rounds()
    }

    pub fn tally(&self) -> Tally {
        Tally::new(self.wins, self.losses)
    }

    /// Rolls of the latest round, come-out roll first.
    pub fn rolls(&self) -> &[Roll] {
        &self.rolls
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_win(&self) -> bool {
        self.win
    }

    /// Percentage of rounds won, `0.0` before the first round.
    pub fn win_percentage(&self) -> f64 {
        match self.rounds() {
            0 => 0.0,
            rounds => 100.0 * self.wins as f64 / rounds as f64,
        }
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::initial()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roll(a: u8, b: u8) -> Roll {
        Roll::from_faces(vec![a, b], 6).unwrap()
    }

    #[test]
    fn test_initial_snapshot() {
        let snapshot = Snapshot::initial();
        assert_eq!(snapshot.wins(), 0);
        assert_eq!(snapshot.losses(), 0);
        assert_eq!(snapshot.rounds(), 0);
        assert!(snapshot.rolls().is_empty());
        assert_eq!(snapshot.state(), State::initial());
        assert!(!snapshot.is_win());
        assert_eq!(snapshot.win_percentage(), 0.0);
        assert_eq!(snapshot, Snapshot::default());
    }

    #[test]
    fn test_after_round_win() {
        let rolls = vec![roll(5, 2)];
        let snapshot = Snapshot::after_round(Tally::new(3, 4), &rolls, State::Win).unwrap();
        assert_eq!(snapshot.tally(), Tally::new(4, 4));
        assert_eq!(snapshot.rounds(), 8);
        assert!(snapshot.is_win());
        assert_eq!(snapshot.rolls(), rolls.as_slice());
    }

    #[test]
    fn test_after_round_loss() {
        let rolls = vec![roll(2, 2), roll(3, 4)];
        let snapshot = Snapshot::after_round(Tally::default(), &rolls, State::Loss).unwrap();
        assert_eq!(snapshot.tally(), Tally::new(0, 1));
        assert_eq!(snapshot.state(), State::Loss);
        assert!(!snapshot.is_win());
        assert_eq!(snapshot.rolls().len(), 2);
    }

    #[test]
    fn test_after_round_copies_history() {
        let mut rolls = vec![roll(1, 1)];
        let snapshot = Snapshot::after_round(Tally::default(), &rolls, State::Loss).unwrap();
        rolls.clear();
        rolls.push(roll(6, 5));
        assert_eq!(snapshot.rolls(), &[roll(1, 1)]);
    }

    #[test]
    fn test_after_round_rejects_unfinished() {
        for state in [State::ComeOut, State::Point] {
            let err = Snapshot::after_round(Tally::default(), &[], state).unwrap_err();
            assert_eq!(err, Error::UnfinishedRound(state));
        }
    }

    #[test]
    fn test_win_percentage() {
        let snapshot = Snapshot::after_round(Tally::new(0, 3), &[roll(3, 4)], State::Win).unwrap();
        assert_eq!(snapshot.win_percentage(), 25.0);
    }

    #[test]
    fn test_tally_record() {
        let tally = Tally::default().record(true).record(false).record(false);
        assert_eq!(tally, Tally::new(1, 2));
        assert_eq!(tally.rounds(), 3);
    }

    #[test]
    fn test_serialize() {
        let snapshot = Snapshot::after_round(Tally::default(), &[roll(6, 5)], State::Win).unwrap();
        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["wins"], 1);
        assert_eq!(value["state"], "win");
        assert_eq!(value["rolls"][0]["value"], 11);
        assert_eq!(value["rolls"][0]["dice"][1], 5);
    }
}
