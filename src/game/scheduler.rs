use crate::config::Config;
use crate::game::chart::{Chart, ChartEvent, LyricNote};
use crate::game::starpower::ActivationWindow;
use serde::Serialize;

/// Something the track renderer should create this frame. `position` is the
/// lag-compensated distance along the track from the judgment line.
///
/// Instructions from one tick are ordered by time; an activation window can
/// still precede a marker that only comes into range on a later tick.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum SpawnInstruction {
    Lyric {
        note_index: usize,
        time: f32,
        position: f32,
        length: f32,
        lyric: String,
        inharmonic: bool,
        in_starpower: bool,
    },
    StarpowerActivateWindow {
        time: f32,
        position: f32,
        length: f32,
    },
    EndPhraseMarker {
        time: f32,
        position: f32,
    },
}

impl SpawnInstruction {
    pub fn time(&self) -> f32 {
        match self {
            SpawnInstruction::Lyric { time, .. }
            | SpawnInstruction::StarpowerActivateWindow { time, .. }
            | SpawnInstruction::EndPhraseMarker { time, .. } => *time,
        }
    }
}

/// What the judgment-time event scan crossed this frame.
#[derive(Clone, Debug, PartialEq)]
pub enum LogicEvent {
    EndPhrase { index: usize, time: f32 },
    StarpowerWindow(ChartEvent),
}

/// Track geometry for one frame.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TrackTiming {
    pub spawn_offset: f32,
    pub end_offset: f32,
    /// Track units per second at the current playback speed.
    pub units_per_second: f32,
}

impl TrackTiming {
    pub fn new(config: &Config, playback_speed: f32) -> Self {
        Self {
            spawn_offset: config.track_spawn_offset,
            end_offset: config.track_end_offset,
            units_per_second: config.track_speed / playback_speed,
        }
    }

    /// How far ahead of song time the visual scan looks.
    #[inline(always)]
    pub fn lead_time(&self) -> f32 {
        (self.spawn_offset + self.end_offset) / self.units_per_second
    }

    #[inline(always)]
    pub fn render_time(&self, song_time: f32) -> f32 {
        song_time + self.lead_time()
    }

    #[inline(always)]
    pub fn lag_compensation(&self, current_time: f32, item_time: f32) -> f32 {
        (current_time - item_time) * self.units_per_second
    }

    /// Spawn position for an item at `item_time` first seen at `render_time`,
    /// so it reaches the judgment line exactly when song time hits `item_time`.
    #[inline(always)]
    pub fn spawn_position(&self, render_time: f32, item_time: f32) -> f32 {
        self.spawn_offset - self.lag_compensation(render_time, item_time)
    }
}

/// The four forward-only read positions into the chart.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Cursors {
    pub visual_event: usize,
    pub visual_lyric: usize,
    pub logic_event: usize,
    pub logic_lyric: usize,
}

#[derive(Clone, Debug, Default)]
pub struct Scheduler {
    cursors: Cursors,
    /// Starpower chart window open on the visual timeline.
    visual_starpower: Option<ChartEvent>,
    current_lyric: Option<usize>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    pub fn cursors(&self) -> Cursors {
        self.cursors
    }

    #[inline(always)]
    pub fn current_lyric_index(&self) -> Option<usize> {
        self.current_lyric
    }

    pub fn current_lyric<'a>(&self, chart: &'a Chart) -> Option<&'a LyricNote> {
        self.current_lyric.and_then(|i| chart.lyrics().get(i))
    }

    #[inline(always)]
    pub fn visual_starpower_open(&self) -> bool {
        self.visual_starpower.is_some()
    }

    /// Last judged lyric and the next one. Only once two lyrics have been
    /// taken by the logic cursor and another one follows.
    pub fn activation_neighbors<'a>(&self, chart: &'a Chart) -> Option<(&'a LyricNote, &'a LyricNote)> {
        let lyrics = chart.lyrics();
        let i = self.cursors.logic_lyric;
        if i < 2 || i >= lyrics.len() {
            return None;
        }
        Some((&lyrics[i - 1], &lyrics[i]))
    }

    /// Walks events and lyrics up to the render reference time, in time order
    /// with events first on ties, appending spawn instructions to `out`.
    pub fn advance_visual(
        &mut self,
        chart: &Chart,
        track: &TrackTiming,
        render_time: f32,
        config: &Config,
        out: &mut Vec<SpawnInstruction>,
    ) {
        let events = chart.events();
        let lyrics = chart.lyrics();
        let first_new = out.len();

        loop {
            let next_event = events
                .get(self.cursors.visual_event)
                .filter(|e| e.time <= render_time);
            let next_lyric = lyrics
                .get(self.cursors.visual_lyric)
                .filter(|l| l.time <= render_time);

            match (next_event, next_lyric) {
                (Some(event), lyric) if lyric.is_none_or(|l| event.time <= l.time) => {
                    if event.is_end_phrase() {
                        out.push(SpawnInstruction::EndPhraseMarker {
                            time: event.time,
                            position: track.spawn_position(render_time, event.time),
                        });
                    } else if event.is_starpower() {
                        self.visual_starpower = Some(event.clone());
                    }
                    self.cursors.visual_event += 1;
                }
                (_, Some(lyric)) => {
                    let index = self.cursors.visual_lyric;
                    if self.visual_starpower.as_ref().is_some_and(|s| s.end_time() < lyric.time) {
                        self.visual_starpower = None;
                    }
                    out.push(SpawnInstruction::Lyric {
                        note_index: index,
                        time: lyric.time,
                        position: track.spawn_position(render_time, lyric.time),
                        length: lyric.length,
                        lyric: lyric.lyric.clone(),
                        inharmonic: lyric.inharmonic,
                        in_starpower: self.visual_starpower.is_some(),
                    });
                    if let Some(next) = lyrics.get(index + 1) {
                        if let Some(window) = ActivationWindow::between(
                            lyric,
                            next,
                            config.starpower_activate_margin,
                            config.starpower_activate_min,
                        ) {
                            out.push(SpawnInstruction::StarpowerActivateWindow {
                                time: window.start,
                                position: track.spawn_position(render_time, window.start),
                                length: window.length(),
                            });
                        }
                    }
                    self.cursors.visual_lyric += 1;
                }
                _ => break,
            }
        }

        if self.visual_starpower.as_ref().is_some_and(|s| s.end_time() < render_time) {
            self.visual_starpower = None;
        }

        // Activation windows start after their lyric ends and can pass later events.
        out[first_new..].sort_by(|a, b| a.time().total_cmp(&b.time()));
    }

    /// Crosses every event at or before `song_time`, in chart order.
    pub fn advance_logic_events(&mut self, chart: &Chart, song_time: f32) -> Vec<LogicEvent> {
        let events = chart.events();
        let mut crossed = Vec::new();
        while let Some(event) = events.get(self.cursors.logic_event).filter(|e| e.time <= song_time) {
            let index = self.cursors.logic_event;
            if event.is_end_phrase() {
                crossed.push(LogicEvent::EndPhrase { index, time: event.time });
            } else if event.is_starpower() {
                crossed.push(LogicEvent::StarpowerWindow(event.clone()));
            }
            self.cursors.logic_event += 1;
        }
        crossed
    }

    /// Picks the lyric being judged. With none current, takes the latest lyric
    /// started by `song_time`; a current lyric is dropped once it has ended.
    pub fn update_current_lyric(&mut self, chart: &Chart, song_time: f32) {
        let lyrics = chart.lyrics();
        match self.current_lyric {
            None => {
                while let Some(lyric) = lyrics.get(self.cursors.logic_lyric) {
                    if lyric.time > song_time {
                        break;
                    }
                    self.current_lyric = Some(self.cursors.logic_lyric);
                    self.cursors.logic_lyric += 1;
                }
            }
            Some(index) => {
                if lyrics[index].end_time() < song_time {
                    self.current_lyric = None;
                }
            }
        }
    }
}
