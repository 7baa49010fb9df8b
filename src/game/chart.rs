use crate::error::ChartError;
use log::info;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const EVENT_END_PHRASE: &str = "vocal_endPhrase";
pub const EVENT_STARPOWER: &str = "starpower_vocals";

/// A named point (or span, when `length > 0`) on the song timeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChartEvent {
    pub time: f32,
    pub name: String,
    #[serde(default)]
    pub length: f32,
}

impl ChartEvent {
    #[inline(always)]
    pub fn end_time(&self) -> f32 {
        self.time + self.length
    }

    #[inline(always)]
    pub fn is_end_phrase(&self) -> bool {
        self.name == EVENT_END_PHRASE
    }

    #[inline(always)]
    pub fn is_starpower(&self) -> bool {
        self.name == EVENT_STARPOWER
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PitchPoint {
    /// Seconds into the note.
    pub offset: f32,
    /// Absolute note value, 12 per octave.
    pub note: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LyricNote {
    pub time: f32,
    pub length: f32,
    #[serde(default)]
    pub inharmonic: bool,
    #[serde(default)]
    pub lyric: String,
    #[serde(default)]
    pub pitch_curve: Vec<PitchPoint>,
}

impl LyricNote {
    #[inline(always)]
    pub fn end_time(&self) -> f32 {
        self.time + self.length
    }
}

/// Target note value `seconds_into_note` into `note`, interpolating glides
/// between pitch points. Offsets outside the curve hold the nearest end point.
pub fn note_at_offset(note: &LyricNote, seconds_into_note: f32) -> f32 {
    let points = note.pitch_curve.as_slice();
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return 0.0;
    };
    if seconds_into_note <= first.offset {
        return first.note;
    }
    if seconds_into_note >= last.offset {
        return last.note;
    }

    // First point strictly after the offset; there is always one before it.
    let next = points.partition_point(|p| p.offset <= seconds_into_note);
    let a = points[next - 1];
    let b = points[next];
    let span = b.offset - a.offset;
    if span <= 0.0 {
        return b.note;
    }
    let t = (seconds_into_note - a.offset) / span;
    a.note + (b.note - a.note) * t
}

#[derive(Deserialize)]
struct ChartFile {
    #[serde(default)]
    lyrics: Vec<LyricNote>,
    #[serde(default)]
    events: Vec<ChartEvent>,
}

/// A single song's vocal chart. Only constructible through validation, so
/// both sequences are always sorted and finite.
#[derive(Clone, Debug, Default)]
pub struct Chart {
    lyrics: Vec<LyricNote>,
    events: Vec<ChartEvent>,
}

impl Chart {
    pub fn new(lyrics: Vec<LyricNote>, events: Vec<ChartEvent>) -> Result<Self, ChartError> {
        let mut previous = f32::NEG_INFINITY;
        for (index, lyric) in lyrics.iter().enumerate() {
            if !lyric.time.is_finite() {
                return Err(ChartError::InvalidLyric { index, field: "time", value: lyric.time });
            }
            if !lyric.length.is_finite() || lyric.length < 0.0 {
                return Err(ChartError::InvalidLyric { index, field: "length", value: lyric.length });
            }
            if lyric.time < previous {
                return Err(ChartError::LyricOutOfOrder { index, time: lyric.time, previous });
            }
            if !lyric.inharmonic && lyric.pitch_curve.is_empty() {
                return Err(ChartError::MissingPitch { index });
            }
            let mut last_offset = f32::NEG_INFINITY;
            for point in &lyric.pitch_curve {
                if !point.offset.is_finite() || !point.note.is_finite() || point.offset < last_offset {
                    return Err(ChartError::PitchOutOfOrder { index });
                }
                last_offset = point.offset;
            }
            previous = lyric.time;
        }

        let mut previous = f32::NEG_INFINITY;
        for (index, event) in events.iter().enumerate() {
            if !event.time.is_finite() {
                return Err(ChartError::InvalidEvent { index, field: "time", value: event.time });
            }
            if !event.length.is_finite() || event.length < 0.0 {
                return Err(ChartError::InvalidEvent { index, field: "length", value: event.length });
            }
            if event.time < previous {
                return Err(ChartError::EventOutOfOrder {
                    index,
                    name: event.name.clone(),
                    time: event.time,
                    previous,
                });
            }
            previous = event.time;
        }

        Ok(Self { lyrics, events })
    }

    pub fn from_json_str(json: &str) -> Result<Self, ChartError> {
        let file: ChartFile = serde_json::from_str(json)?;
        Self::new(file.lyrics, file.events)
    }

    pub fn load(path: &Path) -> Result<Self, ChartError> {
        let json = std::fs::read_to_string(path).map_err(|source| ChartError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let chart = Self::from_json_str(&json)?;
        info!(
            "Loaded chart '{}': {} lyrics, {} events.",
            path.display(),
            chart.lyrics.len(),
            chart.events.len()
        );
        Ok(chart)
    }

    #[inline(always)]
    pub fn lyrics(&self) -> &[LyricNote] {
        &self.lyrics
    }

    #[inline(always)]
    pub fn events(&self) -> &[ChartEvent] {
        &self.events
    }

    /// Time of the first phrase end at or after event index `from`, among
    /// events no earlier than `min_time`.
    pub fn next_phrase_end(&self, from: usize, min_time: f32) -> Option<f32> {
        self.events
            .get(from..)?
            .iter()
            .find(|e| e.time >= min_time && e.is_end_phrase())
            .map(|e| e.time)
    }

    /// Summed length of every lyric starting inside `[start, end]`.
    pub fn section_sing_time(&self, start: f32, end: f32) -> f32 {
        let first = self.lyrics.partition_point(|l| l.time < start);
        self.lyrics[first..]
            .iter()
            .take_while(|l| l.time <= end)
            .map(|l| l.length)
            .sum()
    }

    /// Sing time of the phrase opened at `start`, scanning events from index
    /// `from` for its closing marker. Zero when no marker follows.
    pub fn phrase_sing_time(&self, from: usize, start: f32) -> f32 {
        match self.next_phrase_end(from, start) {
            Some(end) => self.section_sing_time(start, end),
            None => 0.0,
        }
    }

    /// End time of the last lyric or event span, whichever is later.
    pub fn last_time(&self) -> f32 {
        let lyrics = self.lyrics.iter().map(LyricNote::end_time).fold(0.0_f32, f32::max);
        let events = self.events.iter().map(ChartEvent::end_time).fold(0.0_f32, f32::max);
        lyrics.max(events)
    }
}
