use crate::error::DifficultyError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Expert,
    ExpertPlus,
}

impl Difficulty {
    pub const ALL: [Difficulty; 5] = [
        Difficulty::Easy,
        Difficulty::Medium,
        Difficulty::Hard,
        Difficulty::Expert,
        Difficulty::ExpertPlus,
    ];

    pub fn from_index(index: u8) -> Result<Self, DifficultyError> {
        Self::ALL
            .get(index as usize)
            .copied()
            .ok_or(DifficultyError::UnknownIndex(index))
    }

    const fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "Easy",
            Self::Medium => "Medium",
            Self::Hard => "Hard",
            Self::Expert => "Expert",
            Self::ExpertPlus => "ExpertPlus",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = DifficultyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['_', '-', ' '], "").as_str() {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            "expert" => Ok(Self::Expert),
            "expertplus" | "expert+" => Ok(Self::ExpertPlus),
            _ => Err(DifficultyError::UnknownName(s.to_string())),
        }
    }
}

/// Largest distance, in semitones within the octave, still judged on-pitch.
#[inline(always)]
pub fn tolerance_semitones(difficulty: Difficulty) -> f32 {
    match difficulty {
        Difficulty::Easy => 4.0,
        Difficulty::Medium => 4.0,
        Difficulty::Hard => 3.0,
        Difficulty::Expert => 2.5,
        Difficulty::ExpertPlus => 2.5,
    }
}

/// Share of a phrase's total note length that must be sung on-pitch to hit it.
#[inline(always)]
pub fn required_time_fraction(difficulty: Difficulty) -> f32 {
    match difficulty {
        Difficulty::Easy => 0.45,
        Difficulty::Medium => 0.5,
        Difficulty::Hard => 0.55,
        Difficulty::Expert => 0.6,
        Difficulty::ExpertPlus => 0.7,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_tighten_with_difficulty() {
        for pair in Difficulty::ALL.windows(2) {
            let (lo, hi) = (pair[0], pair[1]);
            assert!(
                required_time_fraction(hi) > required_time_fraction(lo),
                "{hi} should need more sing time than {lo}"
            );
            assert!(
                tolerance_semitones(hi) <= tolerance_semitones(lo),
                "{hi} should not be more lenient than {lo}"
            );
        }
    }

    #[test]
    fn parses_names_and_indices() {
        assert_eq!("expert_plus".parse::<Difficulty>(), Ok(Difficulty::ExpertPlus));
        assert_eq!(" Hard ".parse::<Difficulty>(), Ok(Difficulty::Hard));
        assert_eq!(
            "insane".parse::<Difficulty>(),
            Err(DifficultyError::UnknownName("insane".to_string()))
        );
        assert_eq!(Difficulty::from_index(3), Ok(Difficulty::Expert));
        assert_eq!(Difficulty::from_index(5), Err(DifficultyError::UnknownIndex(5)));
    }
}
