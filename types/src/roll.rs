use serde::Serialize;

use crate::Error;

/// Faces showing after one throw of the dice.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Roll {
    dice: Vec<u8>,
    value: u16,
}

impl Roll {
    /// Build a roll from faces already sampled for `num_sides`-sided dice.
    ///
    /// Rejects an empty throw, dice with fewer than two sides, and faces outside
    /// `1..=num_sides`.
    pub fn from_faces(dice: Vec<u8>, num_sides: u8) -> Result<Self, Error> {
        let num_dice = u8::try_from(dice.len()).unwrap_or(u8::MAX);
        if dice.is_empty() || num_sides < 2 {
            return Err(Error::InvalidDice {
                num_dice,
                num_sides,
            });
        }
        if let Some(&face) = dice.iter().find(|&&face| face == 0 || face > num_sides) {
            return Err(Error::InvalidFace { face, num_sides });
        }
        let value = dice.iter().map(|&face| u16::from(face)).sum();
        Ok(Self { dice, value })
    }

    /// Per-die faces in throw order.
    pub fn dice(&self) -> &[u8] {
        &self.dice
    }

    /// Sum of all faces.
    pub fn value(&self) -> u16 {
        self.value
    }
}
