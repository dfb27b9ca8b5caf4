//! Dice sampling.
//!
//! Any [`rand::RngCore`] is a [`DiceSource`]. The trait exists so a source can report
//! failure instead of panicking, which is how the simulator is exercised against a
//! misbehaving generator.

use crapsim_types::Roll;
use rand::{Rng, RngCore};
use thiserror::Error as ThisError;

use crate::Error;

/// Faults raised by a randomness source.
#[derive(Clone, Debug, ThisError, PartialEq, Eq)]
pub enum SourceError {
    #[error("randomness source exhausted")]
    Exhausted,
    #[error("randomness source returned {value} for exclusive bound {bound}")]
    OutOfRange { value: u8, bound: u8 },
    #[error("randomness source failed: {0}")]
    Failed(String),
    #[error("cannot sample below exclusive bound {bound} (need >= 2)")]
    UnsupportedBound { bound: u8 },
}

/// Uniformly distributed integers below a bound.
pub trait DiceSource {
    /// Sample from `0..bound`. [`roll`] only asks for `bound >= 2`.
    fn sample(&mut self, bound: u8) -> Result<u8, SourceError>;
}

impl<R: RngCore> DiceSource for R {
    fn sample(&mut self, bound: u8) -> Result<u8, SourceError> {
        if bound < 2 {
            return Err(SourceError::UnsupportedBound { bound });
        }
        Ok(self.gen_range(0..bound))
    }
}

/// Roll `num_dice` dice with `num_sides` faces each.
pub fn roll<S: DiceSource + ?Sized>(
    source: &mut S,
    num_dice: u8,
    num_sides: u8,
) -> Result<Roll, Error> {
    if num_dice == 0 || num_sides < 2 {
        return Err(crapsim_types::Error::InvalidDice {
            num_dice,
            num_sides,
        }
        .into());
    }
    let mut faces = Vec::with_capacity(usize::from(num_dice));
    for _ in 0..num_dice {
        let value = source.sample(num_sides)?;
        if value >= num_sides {
            return Err(SourceError::OutOfRange {
                value,
                bound: num_sides,
            }
            .into());
        }
        faces.push(value + 1);
    }
    Ok(Roll::from_faces(faces, num_sides)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::ScriptedDice;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_faces_within_range() {
        let mut rng = ChaCha20Rng::seed_from_u64(42);
        for _ in 0..1_000 {
            let roll = roll(&mut rng, 3, 6).unwrap();
            assert_eq!(roll.dice().len(), 3);
            assert!(roll.dice().iter().all(|face| (1..=6).contains(face)));
            let sum: u16 = roll.dice().iter().map(|&face| u16::from(face)).sum();
            assert_eq!(roll.value(), sum);
        }
    }

    #[test]
    fn test_every_face_appears() {
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let mut seen = [false; 6];
        for _ in 0..600 {
            let roll = roll(&mut rng, 1, 6).unwrap();
            seen[usize::from(roll.dice()[0] - 1)] = true;
        }
        assert!(seen.iter().all(|seen| *seen));
    }

    #[test]
    fn test_rejects_no_dice() {
        let mut rng = ChaCha20Rng::seed_from_u64(0);
        let err = roll(&mut rng, 0, 6).unwrap_err();
        assert!(matches!(
            err,
            Error::Rules(crapsim_types::Error::InvalidDice {
                num_dice: 0,
                num_sides: 6
            })
        ));
    }

    #[test]
    fn test_rejects_one_sided_die() {
        let mut rng = ChaCha20Rng::seed_from_u64(0);
        assert!(matches!(
            roll(&mut rng, 2, 1),
            Err(Error::Rules(crapsim_types::Error::InvalidDice { .. }))
        ));
    }

    #[test]
    fn test_rng_rejects_degenerate_bound() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        for bound in [0, 1] {
            assert_eq!(
                DiceSource::sample(&mut rng, bound),
                Err(SourceError::UnsupportedBound { bound })
            );
        }
        assert!(DiceSource::sample(&mut rng, 2).unwrap() < 2);
    }

    #[test]
    fn test_uses_scripted_faces_in_order() {
        let mut source = ScriptedDice::from_faces([2, 5]);
        let roll = roll(&mut source, 2, 6).unwrap();
        assert_eq!(roll.dice(), &[2, 5]);
        assert_eq!(roll.value(), 7);
    }

    #[test]
    fn test_out_of_range_sample_is_a_source_fault() {
        let mut source = ScriptedDice::from_faces([9, 1]);
        assert_eq!(
            roll(&mut source, 2, 6),
            Err(Error::Source(SourceError::OutOfRange { value: 8, bound: 6 }))
        );
    }

    #[test]
    fn test_source_failure_propagates() {
        let mut source = ScriptedDice::from_faces([3]);
        assert_eq!(
            roll(&mut source, 2, 6),
            Err(Error::Source(SourceError::Exhausted))
        );
    }
}
