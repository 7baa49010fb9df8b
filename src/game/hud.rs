//! Continuous values the vocal track's presentation layer reads every frame.
//!
//! Nothing here feeds back into scoring; it only eases and fades the numbers
//! the renderer needs.

use crate::game::phrase::PerformanceBand;
use crate::game::pitch::note_and_octave_to_z;
use crate::game::starpower::StarpowerState;
use serde::Serialize;

const PERFORMANCE_FADE_PER_SECOND: f32 = 2.0;
const NEEDLE_SMOOTHING: f32 = 15.0;
const PULSE_DECAY: f32 = 16.0;
const PULSE_ACTIVE: f32 = 0.25;
const PULSE_READY: f32 = 1.0;
const OVERLAY_ACTIVE_ALPHA: f32 = 0.25;
const OVERLAY_FADE_IN: f32 = 2.0;
const OVERLAY_FADE_OUT: f32 = 4.0;

#[inline(always)]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t.clamp(0.0, 1.0)
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum ParticleState {
    /// Singing on-pitch during a lyric.
    Active,
    /// Voice heard but not scoring.
    Idle,
    Off,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct PlayerReadout {
    /// Smoothed needle coordinate.
    pub needle_z: f32,
    pub needle_visible: bool,
    pub particles: ParticleState,
    pub bar_fill: f32,
    pub octave_offset: i32,
}

impl Default for PlayerReadout {
    fn default() -> Self {
        Self {
            needle_z: note_and_octave_to_z(0.0, 3),
            needle_visible: false,
            particles: ParticleState::Off,
            bar_fill: 0.0,
            octave_offset: 0,
        }
    }
}

impl PlayerReadout {
    pub fn ease_needle(&mut self, target_z: f32, delta_time: f32) {
        self.needle_z = lerp(self.needle_z, target_z, delta_time * NEEDLE_SMOOTHING);
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Readouts {
    pub multiplier: u32,
    /// Multiplier to print, hidden at 1x.
    pub combo_text: Option<u32>,
    pub combo_fill: f32,
    pub performance: Option<PerformanceBand>,
    pub performance_alpha: f32,
    pub starpower_charge: f32,
    pub starpower_active: bool,
    pub starpower_ready: bool,
    pub starpower_pulse_alpha: f32,
    pub starpower_overlay_alpha: f32,
    pub players: Vec<PlayerReadout>,
}

impl Readouts {
    pub fn new(player_count: usize) -> Self {
        Self {
            multiplier: 1,
            combo_text: None,
            combo_fill: 0.0,
            performance: None,
            performance_alpha: 0.0,
            starpower_charge: 0.0,
            starpower_active: false,
            starpower_ready: false,
            starpower_pulse_alpha: 0.0,
            starpower_overlay_alpha: 0.0,
            players: vec![PlayerReadout::default(); player_count],
        }
    }

    pub fn show_performance(&mut self, band: PerformanceBand) {
        self.performance = Some(band);
        self.performance_alpha = 1.0;
    }

    pub fn set_multiplier(&mut self, multiplier: u32) {
        self.multiplier = multiplier;
        self.combo_text = (multiplier != 1).then_some(multiplier);
    }

    /// Advances every time-based fade by one frame.
    pub fn tick_fades(&mut self, starpower: &StarpowerState, beat: bool, delta_time: f32) {
        self.performance_alpha = (self.performance_alpha - delta_time * PERFORMANCE_FADE_PER_SECOND).max(0.0);

        self.starpower_charge = starpower.charge();
        self.starpower_active = starpower.is_active();
        self.starpower_ready = starpower.is_ready();

        if beat {
            self.starpower_pulse_alpha = if starpower.is_active() {
                PULSE_ACTIVE
            } else if starpower.is_ready() {
                PULSE_READY
            } else {
                0.0
            };
        } else {
            self.starpower_pulse_alpha = lerp(self.starpower_pulse_alpha, 0.0, delta_time * PULSE_DECAY);
        }

        self.starpower_overlay_alpha = if starpower.is_active() {
            lerp(self.starpower_overlay_alpha, OVERLAY_ACTIVE_ALPHA, delta_time * OVERLAY_FADE_IN)
        } else {
            lerp(self.starpower_overlay_alpha, 0.0, delta_time * OVERLAY_FADE_OUT)
        };
    }
}
