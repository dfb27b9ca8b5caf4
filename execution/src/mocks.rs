//! Deterministic dice sources for tests.

use std::collections::VecDeque;

use crate::{DiceSource, SourceError};

/// Replays a fixed sequence of die faces, then fails.
///
/// Faces are 1-based, as they appear on the die. A face that does not fit the
/// requested die size is handed back out of range so the caller's guard trips.
#[derive(Clone, Debug, Default)]
pub struct ScriptedDice {
    faces: VecDeque<u8>,
    failure: Option<String>,
}

impl ScriptedDice {
    pub fn from_faces(faces: impl IntoIterator<Item = u8>) -> Self {
        Self {
            faces: faces.into_iter().collect(),
            failure: None,
        }
    }

    /// Script a sequence of two-dice totals (each in `2..=12`).
    pub fn from_sums(sums: impl IntoIterator<Item = u8>) -> Self {
        let faces = sums.into_iter().flat_map(|sum| {
            assert!((2..=12).contains(&sum), "two dice cannot total {sum}");
            let first = if sum > 7 { sum - 6 } else { 1 };
            [first, sum - first]
        });
        Self::from_faces(faces)
    }

    /// Report [`SourceError::Failed`] with `message` once the script runs out,
    /// instead of [`SourceError::Exhausted`].
    pub fn then_fail(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Faces not yet consumed.
    pub fn remaining(&self) -> usize {
        self.faces.len()
    }
}

impl DiceSource for ScriptedDice {
    fn sample(&mut self, _bound: u8) -> Result<u8, SourceError> {
        match self.faces.pop_front() {
            Some(face) => Ok(face.wrapping_sub(1)),
            None => Err(match &self.failure {
                Some(message) => SourceError::Failed(message.clone()),
                None => SourceError::Exhausted,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_sums_splits_into_valid_faces() {
        for sum in 2..=12u8 {
            let mut dice = ScriptedDice::from_sums([sum]);
            let a = dice.sample(6).unwrap() + 1;
            let b = dice.sample(6).unwrap() + 1;
            assert!((1..=6).contains(&a) && (1..=6).contains(&b));
            assert_eq!(a + b, sum);
            assert_eq!(dice.remaining(), 0);
        }
    }

    #[test]
    fn test_exhaustion() {
        let mut dice = ScriptedDice::default();
        assert_eq!(dice.sample(6), Err(SourceError::Exhausted));

        let mut dice = ScriptedDice::default().then_fail("unplugged");
        assert_eq!(
            dice.sample(6),
            Err(SourceError::Failed("unplugged".to_string()))
        );
    }
}
