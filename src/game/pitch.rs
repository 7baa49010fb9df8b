use crate::game::chart::{Chart, LyricNote, note_at_offset};
use crate::game::difficulty::{Difficulty, tolerance_semitones};

/// The latest detector output for one singer, polled once per tick.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct PitchReading {
    pub voice_detected: bool,
    /// Note within the octave, 0..12.
    pub note: f32,
    pub octave: i32,
    /// Seconds since a voice was last detected.
    pub time_since_no_voice: f32,
}

impl PitchReading {
    pub fn silent(time_since_no_voice: f32) -> Self {
        Self {
            time_since_no_voice,
            ..Default::default()
        }
    }

    pub fn voiced(note: f32, octave: i32) -> Self {
        Self {
            voice_detected: true,
            note,
            octave,
            time_since_no_voice: 0.0,
        }
    }

    /// Voice present, or lost recently enough that the needle should linger.
    #[inline(always)]
    pub fn is_fresh(&self, timeout: f32) -> bool {
        self.voice_detected || self.time_since_no_voice < timeout
    }
}

/// Splits an absolute note value into (note within octave, octave).
#[inline(always)]
pub fn split_note_octave(raw_note: f32) -> (f32, i32) {
    let octave = (raw_note / 12.0).floor();
    (raw_note - octave * 12.0, octave as i32)
}

/// Maps a sung pitch onto the track's vertical needle axis.
pub fn note_and_octave_to_z(note: f32, octave: i32) -> f32 {
    let z = -0.353 + (note / 12.0 * 0.42) + (octave - 3) as f32 * 0.42;
    z.clamp(-0.45, 0.93)
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PitchJudgment {
    pub correct: bool,
    /// Octave correction to apply to the needle, when a harmonic note matched.
    pub octave_offset: Option<i32>,
}

/// Judges one reading against the current lyric `seconds_into_note` in.
///
/// Inharmonic notes accept any detected voice. Harmonic notes compare only
/// the note within the octave; the octave difference is reported so the
/// needle can be shifted onto the target line.
pub fn judge_pitch(
    lyric: Option<&LyricNote>,
    reading: &PitchReading,
    difficulty: Difficulty,
    seconds_into_note: f32,
) -> PitchJudgment {
    let mut judgment = PitchJudgment {
        correct: reading.voice_detected,
        octave_offset: None,
    };
    let Some(lyric) = lyric else {
        return judgment;
    };
    if lyric.inharmonic || !reading.voice_detected {
        return judgment;
    }

    let (needed_note, needed_octave) = split_note_octave(note_at_offset(lyric, seconds_into_note));
    let dist = (needed_note - reading.note).abs();
    judgment.correct = dist <= tolerance_semitones(difficulty);
    if judgment.correct {
        judgment.octave_offset = Some(needed_octave - reading.octave);
    }
    judgment
}

/// A singer that reads its pitch straight off the chart.
#[derive(Clone, Debug, Default)]
pub struct BotSinger {
    cursor: usize,
    time_since_no_voice: f32,
}

impl BotSinger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reading(&mut self, chart: &Chart, song_time: f32, delta_time: f32) -> PitchReading {
        let lyrics = chart.lyrics();
        while self.cursor < lyrics.len() && lyrics[self.cursor].end_time() < song_time {
            self.cursor += 1;
        }

        let singing = lyrics
            .get(self.cursor)
            .filter(|l| l.time <= song_time && song_time <= l.end_time());
        match singing {
            Some(lyric) => {
                self.time_since_no_voice = 0.0;
                if lyric.inharmonic {
                    return PitchReading::voiced(0.0, 3);
                }
                let (note, octave) = split_note_octave(note_at_offset(lyric, song_time - lyric.time));
                PitchReading::voiced(note, octave)
            }
            None => {
                self.time_since_no_voice += delta_time.max(0.0);
                PitchReading::silent(self.time_since_no_voice)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::chart::tests::harmonic;

    #[test]
    fn splits_into_octave_and_note() {
        let (note, octave) = split_note_octave(62.5);
        assert!((note - 2.5).abs() <= 1e-5);
        assert_eq!(octave, 5);
        let (note, octave) = split_note_octave(-1.0);
        assert!((note - 11.0).abs() <= 1e-5);
        assert_eq!(octave, -1);
    }

    #[test]
    fn needle_is_clamped() {
        assert!((note_and_octave_to_z(0.0, 3) + 0.353).abs() <= 1e-5);
        assert_eq!(note_and_octave_to_z(11.0, 9), 0.93);
        assert_eq!(note_and_octave_to_z(0.0, 0), -0.45);
    }

    #[test]
    fn harmonic_tolerance_depends_on_difficulty() {
        let lyric = harmonic(0.0, 1.0, 60.0); // note 0, octave 5
        let reading = PitchReading::voiced(3.0, 4);
        let easy = judge_pitch(Some(&lyric), &reading, Difficulty::Easy, 0.2);
        assert!(easy.correct);
        assert_eq!(easy.octave_offset, Some(1));
        let expert = judge_pitch(Some(&lyric), &reading, Difficulty::Expert, 0.2);
        assert!(!expert.correct);
        assert_eq!(expert.octave_offset, None);
    }

    #[test]
    fn inharmonic_accepts_any_voice() {
        let mut lyric = harmonic(0.0, 1.0, 60.0);
        lyric.inharmonic = true;
        let off_key = PitchReading::voiced(6.0, 2);
        assert!(judge_pitch(Some(&lyric), &off_key, Difficulty::ExpertPlus, 0.5).correct);
        assert!(!judge_pitch(Some(&lyric), &PitchReading::silent(1.0), Difficulty::Easy, 0.5).correct);
    }

    #[test]
    fn bot_sings_chart_pitch() {
        let chart = Chart::new(vec![harmonic(1.0, 1.0, 64.0)], vec![]).unwrap();
        let mut bot = BotSinger::new();
        let before = bot.reading(&chart, 0.5, 0.1);
        assert!(!before.voice_detected);
        let during = bot.reading(&chart, 1.5, 0.1);
        assert!(during.voice_detected);
        assert!((during.note - 4.0).abs() <= 1e-5);
        assert_eq!(during.octave, 5);
        let after = bot.reading(&chart, 2.5, 0.1);
        assert!(!after.voice_detected);
        assert!((after.time_since_no_voice - 0.1).abs() <= 1e-5);
    }
}
