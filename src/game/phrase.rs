use crate::game::difficulty::{Difficulty, required_time_fraction};
use serde::Serialize;
use std::fmt;

pub const MAX_MULTIPLIER: u32 = 4;

/// Shared rating shown after each judged phrase, from the best singer's result.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum PerformanceBand {
    Awesome,
    Strong,
    Good,
    Okay,
    Messy,
    Awful,
}

impl PerformanceBand {
    pub fn from_percent(percent: f32) -> Self {
        if percent >= 1.0 { PerformanceBand::Awesome }
        else if percent >= 0.8 { PerformanceBand::Strong }
        else if percent >= 0.7 { PerformanceBand::Good }
        else if percent >= 0.6 { PerformanceBand::Okay }
        else if percent >= 0.1 { PerformanceBand::Messy }
        else { PerformanceBand::Awful }
    }

    pub const fn label(&self) -> &'static str {
        match self {
            PerformanceBand::Awesome => "AWESOME!",
            PerformanceBand::Strong => "STRONG",
            PerformanceBand::Good => "GOOD",
            PerformanceBand::Okay => "OKAY",
            PerformanceBand::Messy => "MESSY",
            PerformanceBand::Awful => "AWFUL",
        }
    }
}

impl fmt::Display for PerformanceBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-singer accumulators for the session.
#[derive(Clone, Debug)]
pub struct PlayerScoreState {
    pub name: String,
    pub difficulty: Difficulty,
    /// Seconds sung on-pitch in the current phrase.
    pub sing_progress: f32,
    pub sections_hit: u32,
    pub sections_failed: u32,
    /// Sum of per-phrase percentages, each clamped to 1.
    pub total_sing_percent: f32,
    pub octave_offset: i32,
}

impl PlayerScoreState {
    pub fn new(name: impl Into<String>, difficulty: Difficulty) -> Self {
        Self {
            name: name.into(),
            difficulty,
            sing_progress: 0.0,
            sections_hit: 0,
            sections_failed: 0,
            total_sing_percent: 0.0,
            octave_offset: 0,
        }
    }

    /// Adds on-pitch time. Negative deltas are dropped so progress never shrinks.
    #[inline(always)]
    pub fn add_progress(&mut self, delta_time: f32) {
        if delta_time > 0.0 {
            self.sing_progress += delta_time;
        }
    }

    /// Progress toward hitting a phrase of `section_sing_time`, unclamped.
    /// Zero for an empty phrase.
    pub fn phrase_percent(&self, section_sing_time: f32) -> f32 {
        if section_sing_time <= 0.0 {
            return 0.0;
        }
        self.sing_progress / (section_sing_time * required_time_fraction(self.difficulty))
    }

    /// Resolves the current phrase and clears progress. Returns the raw percent.
    fn close_phrase(&mut self, section_sing_time: f32) -> f32 {
        let percent = self.phrase_percent(section_sing_time);
        if percent >= 1.0 {
            self.sections_hit += 1;
        } else {
            self.sections_failed += 1;
        }
        self.total_sing_percent += percent.clamp(0.0, 1.0);
        self.sing_progress = 0.0;
        percent
    }
}

/// The shared combo multiplier, before any starpower doubling.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Combo {
    raw_multiplier: u32,
}

impl Default for Combo {
    fn default() -> Self {
        Self { raw_multiplier: 1 }
    }
}

impl Combo {
    #[inline(always)]
    pub fn raw_multiplier(&self) -> u32 {
        self.raw_multiplier
    }

    #[inline(always)]
    pub fn effective(&self, starpower_active: bool) -> u32 {
        self.raw_multiplier * if starpower_active { 2 } else { 1 }
    }

    pub fn apply(&mut self, phrase_hit: bool) {
        if phrase_hit {
            self.raw_multiplier = (self.raw_multiplier + 1).min(MAX_MULTIPLIER);
        } else {
            self.raw_multiplier = 1;
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PhraseOutcome {
    /// Song time of the closing marker.
    pub time: f32,
    pub section_sing_time: f32,
    /// Raw percent per player, in roster order.
    pub percents: Vec<f32>,
    pub best_percent: f32,
    pub band: PerformanceBand,
}

impl PhraseOutcome {
    #[inline(always)]
    pub fn hit(&self) -> bool {
        self.best_percent >= 1.0
    }
}

/// Phrase-level judging state: idle while `section_sing_time` is zero,
/// judging otherwise.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PhraseJudge {
    pub section_sing_time: f32,
}

impl PhraseJudge {
    pub fn new(section_sing_time: f32) -> Self {
        Self { section_sing_time }
    }

    #[inline(always)]
    pub fn is_judging(&self) -> bool {
        self.section_sing_time > 0.0
    }

    /// Closes the current phrase for every player and updates the shared combo.
    /// An empty phrase is not judged, leaves progress alone and returns `None`.
    pub fn close(
        &self,
        time: f32,
        players: &mut [PlayerScoreState],
        combo: &mut Combo,
    ) -> Option<PhraseOutcome> {
        if !self.is_judging() {
            return None;
        }

        let mut best_percent = 0.0_f32;
        let percents: Vec<f32> = players
            .iter_mut()
            .map(|p| {
                let percent = p.close_phrase(self.section_sing_time);
                best_percent = best_percent.max(percent);
                percent
            })
            .collect();

        let outcome = PhraseOutcome {
            time,
            section_sing_time: self.section_sing_time,
            percents,
            best_percent,
            band: PerformanceBand::from_percent(best_percent),
        };
        combo.apply(outcome.hit());
        Some(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close_with_progress(progress: f32) -> (PhraseOutcome, PlayerScoreState, Combo) {
        let mut players = vec![PlayerScoreState::new("P1", Difficulty::Expert)];
        players[0].add_progress(progress);
        let mut combo = Combo::default();
        let outcome = PhraseJudge::new(4.0).close(10.0, &mut players, &mut combo).unwrap();
        (outcome, players.remove(0), combo)
    }

    #[test]
    fn exact_requirement_is_a_hit() {
        let (outcome, player, combo) = close_with_progress(2.4);
        assert!((outcome.best_percent - 1.0).abs() <= 1e-5);
        assert_eq!(outcome.band, PerformanceBand::Awesome);
        assert_eq!(player.sections_hit, 1);
        assert_eq!(player.sections_failed, 0);
        assert_eq!(player.sing_progress, 0.0);
        assert_eq!(combo.raw_multiplier(), 2);
    }

    #[test]
    fn half_requirement_is_messy_fail() {
        let (outcome, player, combo) = close_with_progress(1.2);
        assert!((outcome.best_percent - 0.5).abs() <= 1e-5);
        assert_eq!(outcome.band, PerformanceBand::Messy);
        assert_eq!(player.sections_failed, 1);
        assert!((player.total_sing_percent - 0.5).abs() <= 1e-5);
        assert_eq!(combo.raw_multiplier(), 1);
    }

    #[test]
    fn overshoot_is_clamped_in_total() {
        let (outcome, player, _) = close_with_progress(4.0);
        assert!(outcome.best_percent > 1.0);
        assert!((player.total_sing_percent - 1.0).abs() <= 1e-6);
    }

    #[test]
    fn empty_phrase_is_not_judged() {
        let mut players = vec![PlayerScoreState::new("P1", Difficulty::Easy)];
        players[0].add_progress(1.0);
        let mut combo = Combo::default();
        combo.apply(true);
        assert!(PhraseJudge::new(0.0).close(1.0, &mut players, &mut combo).is_none());
        assert_eq!(players[0].sections_hit + players[0].sections_failed, 0);
        assert_eq!(players[0].sing_progress, 1.0);
        assert_eq!(combo.raw_multiplier(), 2);
    }

    #[test]
    fn replayed_phrase_is_deterministic() {
        let frames = [0.016_f32, 0.017, 0.016, 0.5, 0.25];
        let run = || {
            let mut players = vec![PlayerScoreState::new("P1", Difficulty::Hard)];
            for dt in frames {
                players[0].add_progress(dt);
            }
            PhraseJudge::new(2.0).close(3.0, &mut players, &mut Combo::default()).unwrap()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn multiplier_caps_and_resets() {
        let mut combo = Combo::default();
        for _ in 0..10 {
            combo.apply(true);
        }
        assert_eq!(combo.raw_multiplier(), MAX_MULTIPLIER);
        assert_eq!(combo.effective(true), 8);
        combo.apply(false);
        assert_eq!(combo.raw_multiplier(), 1);
    }

    #[test]
    fn band_table_edges() {
        assert_eq!(PerformanceBand::from_percent(0.8), PerformanceBand::Strong);
        assert_eq!(PerformanceBand::from_percent(0.7), PerformanceBand::Good);
        assert_eq!(PerformanceBand::from_percent(0.65), PerformanceBand::Okay);
        assert_eq!(PerformanceBand::from_percent(0.1), PerformanceBand::Messy);
        assert_eq!(PerformanceBand::from_percent(0.09), PerformanceBand::Awful);
    }

    #[test]
    fn negative_delta_is_ignored() {
        let mut player = PlayerScoreState::new("P1", Difficulty::Medium);
        player.add_progress(-0.5);
        assert_eq!(player.sing_progress, 0.0);
    }
}
