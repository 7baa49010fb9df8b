use crate::game::difficulty::Difficulty;
use crate::game::phrase::PlayerScoreState;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FinalGrade {
    pub player: String,
    pub difficulty: Difficulty,
    /// Average clamped phrase percentage, 0.0 to 1.0. `None` when no phrase
    /// was ever judged.
    pub percent: Option<f32>,
    pub notes_hit: u32,
    pub notes_missed: u32,
}

impl FinalGrade {
    pub fn from_player(player: &PlayerScoreState) -> Self {
        Self {
            player: player.name.clone(),
            difficulty: player.difficulty,
            percent: grade_percent(player.total_sing_percent, player.sections_hit, player.sections_failed),
            notes_hit: player.sections_hit,
            notes_missed: player.sections_failed,
        }
    }
}

pub fn grade_percent(total_sing_percent: f32, sections_hit: u32, sections_failed: u32) -> Option<f32> {
    let total_sections = sections_hit + sections_failed;
    if total_sections == 0 {
        return None;
    }
    Some(total_sing_percent / total_sections as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averages_over_judged_sections() {
        let mut player = PlayerScoreState::new("P1", Difficulty::Hard);
        player.sections_hit = 3;
        player.sections_failed = 1;
        player.total_sing_percent = 3.2;
        let grade = FinalGrade::from_player(&player);
        assert!((grade.percent.unwrap() - 0.8).abs() <= 1e-6);
        assert_eq!(grade.notes_hit, 3);
        assert_eq!(grade.notes_missed, 1);
        assert_eq!(grade.difficulty, Difficulty::Hard);
    }

    #[test]
    fn no_sections_is_no_data() {
        assert_eq!(grade_percent(0.0, 0, 0), None);
    }
}
