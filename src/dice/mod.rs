//! Dice notation and rolling

use std::fmt;
use std::str::FromStr;

use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

pub const MAX_DICE: u32 = 100;
pub const MAX_SIDES: u32 = 1000;
pub const MAX_MODIFIER: i32 = 10_000;

/// Parsed `NdM+K` expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiceExpr {
    pub count: u32,
    pub sides: u32,
    pub modifier: i32,
}

impl DiceExpr {
    pub const D20: DiceExpr = DiceExpr {
        count: 1,
        sides: 20,
        modifier: 0,
    };

    pub fn with_modifier(self, modifier: i32) -> Self {
        Self { modifier, ..self }
    }

    pub fn roll<R: Rng + ?Sized>(&self, rng: &mut R) -> DiceRoll {
        let rolls: Vec<u32> = (0..self.count)
            .map(|_| rng.gen_range(1..=self.sides))
            .collect();
        let total = rolls.iter().map(|&r| i64::from(r)).sum::<i64>() + i64::from(self.modifier);

        DiceRoll {
            expression: self.to_string(),
            rolls,
            modifier: self.modifier,
            total,
        }
    }
}

impl fmt::Display for DiceExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d{}", self.count, self.sides)?;
        match self.modifier {
            0 => Ok(()),
            m if m > 0 => write!(f, "+{}", m),
            m => write!(f, "{}", m),
        }
    }
}

impl FromStr for DiceExpr {
    type Err = DiceError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let compact: String = input
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        if compact.is_empty() {
            return Err(DiceError::Empty);
        }

        let malformed = || DiceError::Malformed(input.trim().to_string());

        let (count, rest) = compact.split_once('d').ok_or_else(malformed)?;
        let count: u32 = if count.is_empty() {
            1
        } else {
            count.parse().map_err(|_| malformed())?
        };

        let (sides, modifier) = match rest.find(['+', '-']) {
            Some(at) => {
                let (sides, modifier) = rest.split_at(at);
                let modifier: i32 = modifier.parse().map_err(|_| malformed())?;
                (sides, modifier)
            }
            None => (rest, 0),
        };
        let sides: u32 = sides.parse().map_err(|_| malformed())?;

        if count == 0 || count > MAX_DICE {
            return Err(DiceError::InvalidCount(count));
        }
        if !(2..=MAX_SIDES).contains(&sides) {
            return Err(DiceError::InvalidSides(sides));
        }
        if !(-MAX_MODIFIER..=MAX_MODIFIER).contains(&modifier) {
            return Err(DiceError::ModifierOutOfRange(modifier));
        }

        Ok(Self {
            count,
            sides,
            modifier,
        })
    }
}

/// Outcome of one roll
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiceRoll {
    pub expression: String,
    pub rolls: Vec<u32>,
    pub modifier: i32,
    pub total: i64,
}

/// Shared roller; seeded for reproducible runs
pub struct DiceRoller {
    rng: Mutex<ChaCha8Rng>,
}

impl DiceRoller {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            rng: Mutex::new(rng),
        }
    }

    pub fn roll(&self, expr: &DiceExpr) -> DiceRoll {
        expr.roll(&mut *self.rng.lock())
    }
}

/// Dice notation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiceError {
    #[error("Empty dice expression")]
    Empty,

    #[error("Malformed dice expression: {0}")]
    Malformed(String),

    #[error("Dice count must be between 1 and 100, got {0}")]
    InvalidCount(u32),

    #[error("Dice must have between 2 and 1000 sides, got {0}")]
    InvalidSides(u32),

    #[error("Modifier out of range: {0}")]
    ModifierOutOfRange(i32),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_notation() {
        assert_eq!(
            "2d6+3".parse::<DiceExpr>().unwrap(),
            DiceExpr { count: 2, sides: 6, modifier: 3 }
        );
        assert_eq!(
            " 1D20 - 1 ".parse::<DiceExpr>().unwrap(),
            DiceExpr { count: 1, sides: 20, modifier: -1 }
        );
        assert_eq!("d8".parse::<DiceExpr>().unwrap(), DiceExpr { count: 1, sides: 8, modifier: 0 });
    }

    #[test]
    fn rejects_bad_notation() {
        assert_eq!("".parse::<DiceExpr>(), Err(DiceError::Empty));
        assert!(matches!("20".parse::<DiceExpr>(), Err(DiceError::Malformed(_))));
        assert!(matches!("2d".parse::<DiceExpr>(), Err(DiceError::Malformed(_))));
        assert!(matches!("2d6+x".parse::<DiceExpr>(), Err(DiceError::Malformed(_))));
        assert_eq!("0d6".parse::<DiceExpr>(), Err(DiceError::InvalidCount(0)));
        assert_eq!("101d6".parse::<DiceExpr>(), Err(DiceError::InvalidCount(101)));
        assert_eq!("1d1".parse::<DiceExpr>(), Err(DiceError::InvalidSides(1)));
        assert_eq!(
            "1d6+20000".parse::<DiceExpr>(),
            Err(DiceError::ModifierOutOfRange(20000))
        );
        assert_eq!(
            "1d6-2147483648".parse::<DiceExpr>(),
            Err(DiceError::ModifierOutOfRange(i32::MIN))
        );
    }

    #[test]
    fn display_is_canonical() {
        let expr: DiceExpr = "3D4 + 0".parse().unwrap();
        assert_eq!(expr.to_string(), "3d4");
        assert_eq!(DiceExpr::D20.with_modifier(-2).to_string(), "1d20-2");
    }

    #[test]
    fn rolls_stay_in_range_and_sum() {
        let roller = DiceRoller::new(Some(7));
        let expr: DiceExpr = "4d6+2".parse().unwrap();

        for _ in 0..200 {
            let roll = roller.roll(&expr);
            assert_eq!(roll.rolls.len(), 4);
            assert!(roll.rolls.iter().all(|r| (1..=6).contains(r)));
            let sum: i64 = roll.rolls.iter().map(|&r| i64::from(r)).sum();
            assert_eq!(roll.total, sum + 2);
        }
    }

    #[test]
    fn seeded_rollers_agree() {
        let a = DiceRoller::new(Some(1234));
        let b = DiceRoller::new(Some(1234));
        let expr = DiceExpr::D20;

        let left: Vec<i64> = (0..10).map(|_| a.roll(&expr).total).collect();
        let right: Vec<i64> = (0..10).map(|_| b.roll(&expr).total).collect();
        assert_eq!(left, right);
    }
}
