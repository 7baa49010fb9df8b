use crate::config::{Config, STARPOWER_READY_CHARGE};
use crate::game::chart::{ChartEvent, LyricNote};
use log::{debug, info};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StarpowerPhase {
    Charging,
    Armed,
    Active,
}

/// Why an activation request did nothing. Never surfaced as an error.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ActivationRefusal {
    AlreadyActive,
    NotCharged,
    GapTooShort,
    OutsideWindow,
}

/// The gap between two consecutive lyrics in which starpower may be
/// activated, shrunk by the margin on both sides.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ActivationWindow {
    pub start: f32,
    pub end: f32,
}

impl ActivationWindow {
    /// `None` when the shrunk gap is shorter than the minimum activatable length.
    pub fn between(first: &LyricNote, next: &LyricNote, margin: f32, min_length: f32) -> Option<Self> {
        let start = first.end_time() + margin;
        let end = next.time - margin;
        if end - start < min_length {
            return None;
        }
        Some(Self { start, end })
    }

    #[inline(always)]
    pub fn length(&self) -> f32 {
        self.end - self.start
    }

    #[inline(always)]
    pub fn contains(&self, time: f32) -> bool {
        self.start <= time && time <= self.end
    }
}

/// Shared starpower meter for every singer in the session.
#[derive(Clone, Debug, Default)]
pub struct StarpowerState {
    charge: f32,
    active: bool,
    /// Chart window currently open on the judgment timeline.
    pub(crate) section: Option<ChartEvent>,
}

impl StarpowerState {
    #[inline(always)]
    pub fn charge(&self) -> f32 {
        self.charge
    }

    #[inline(always)]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[inline(always)]
    pub fn is_ready(&self) -> bool {
        !self.active && self.charge >= STARPOWER_READY_CHARGE
    }

    pub fn phase(&self) -> StarpowerPhase {
        if self.active {
            StarpowerPhase::Active
        } else if self.is_ready() {
            StarpowerPhase::Armed
        } else {
            StarpowerPhase::Charging
        }
    }

    pub fn open_section(&mut self, event: &ChartEvent) {
        debug!("Starpower window open {:.3}s-{:.3}s", event.time, event.end_time());
        self.section = Some(event.clone());
    }

    /// Credits a successful phrase. Charges only when an open chart window
    /// has ended by `song_time`; the window is consumed.
    pub fn on_phrase_hit(&mut self, song_time: f32, amount: f32) -> bool {
        let finished = self
            .section
            .as_ref()
            .is_some_and(|s| s.end_time() <= song_time);
        if !finished {
            return false;
        }
        self.section = None;
        self.charge = (self.charge + amount).clamp(0.0, 1.0);
        info!("Starpower charged to {:.2}", self.charge);
        true
    }

    /// Attempts activation at `song_time`. `window_lyrics` is the last judged
    /// lyric and the next one, when both exist; without them no window applies.
    pub fn request_activation(
        &mut self,
        song_time: f32,
        window_lyrics: Option<(&LyricNote, &LyricNote)>,
        config: &Config,
    ) -> Result<(), ActivationRefusal> {
        let refusal = self.check_activation(song_time, window_lyrics, config);
        match refusal {
            Err(reason) => debug!("Starpower request at {:.3}s ignored: {:?}", song_time, reason),
            Ok(()) => {
                self.active = true;
                info!("Starpower activated at {:.3}s with charge {:.2}", song_time, self.charge);
            }
        }
        refusal
    }

    fn check_activation(
        &self,
        song_time: f32,
        window_lyrics: Option<(&LyricNote, &LyricNote)>,
        config: &Config,
    ) -> Result<(), ActivationRefusal> {
        if self.active {
            return Err(ActivationRefusal::AlreadyActive);
        }
        if self.charge < STARPOWER_READY_CHARGE {
            return Err(ActivationRefusal::NotCharged);
        }
        let Some((first, next)) = window_lyrics else {
            return Ok(());
        };
        let window = ActivationWindow::between(
            first,
            next,
            config.starpower_activate_margin,
            config.starpower_activate_min,
        )
        .ok_or(ActivationRefusal::GapTooShort)?;
        if !window.contains(song_time) {
            return Err(ActivationRefusal::OutsideWindow);
        }
        Ok(())
    }

    /// Drains charge while active; a drained meter drops back to charging.
    pub fn drain(&mut self, delta_time: f32, drain_seconds: f32) {
        if !self.active {
            return;
        }
        if self.charge <= 0.0 {
            self.active = false;
            self.charge = 0.0;
            info!("Starpower ended");
            return;
        }
        self.charge = (self.charge - delta_time.max(0.0) / drain_seconds).max(0.0);
    }

    #[cfg(test)]
    pub(crate) fn with_charge(charge: f32) -> Self {
        Self {
            charge,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::chart::tests::{event, harmonic};

    #[test]
    fn activation_needs_half_charge() {
        let cfg = Config::default();
        let mut sp = StarpowerState::with_charge(0.49);
        assert_eq!(sp.request_activation(1.0, None, &cfg), Err(ActivationRefusal::NotCharged));
        assert!(!sp.is_active());

        let mut sp = StarpowerState::with_charge(0.6);
        assert_eq!(sp.phase(), StarpowerPhase::Armed);
        assert_eq!(sp.request_activation(1.0, None, &cfg), Ok(()));
        assert!(sp.is_active());
        assert!((sp.charge() - 0.6).abs() <= f32::EPSILON);
    }

    #[test]
    fn activation_respects_lyric_gap() {
        let cfg = Config::default();
        let first = harmonic(0.0, 1.0, 60.0);
        let next = harmonic(2.0, 1.0, 60.0);
        // Window is 1.1..1.9.
        let mut sp = StarpowerState::with_charge(1.0);
        assert_eq!(
            sp.request_activation(1.05, Some((&first, &next)), &cfg),
            Err(ActivationRefusal::OutsideWindow)
        );
        assert_eq!(sp.request_activation(1.5, Some((&first, &next)), &cfg), Ok(()));

        let close = harmonic(1.5, 1.0, 60.0);
        let mut sp = StarpowerState::with_charge(1.0);
        assert_eq!(
            sp.request_activation(1.2, Some((&first, &close)), &cfg),
            Err(ActivationRefusal::GapTooShort)
        );
    }

    #[test]
    fn charge_only_after_window_ends() {
        let mut sp = StarpowerState::default();
        sp.open_section(&event(1.0, "starpower_vocals", 4.0));
        assert!(!sp.on_phrase_hit(3.0, 0.25));
        assert!(sp.on_phrase_hit(5.0, 0.25));
        assert!((sp.charge() - 0.25).abs() <= f32::EPSILON);
        // Window consumed.
        assert!(!sp.on_phrase_hit(6.0, 0.25));
    }

    #[test]
    fn charge_saturates() {
        let mut sp = StarpowerState::with_charge(0.9);
        sp.open_section(&event(0.0, "starpower_vocals", 1.0));
        sp.on_phrase_hit(2.0, 0.25);
        assert_eq!(sp.charge(), 1.0);
    }

    #[test]
    fn drain_returns_to_charging() {
        let cfg = Config::default();
        let mut sp = StarpowerState::with_charge(0.5);
        sp.request_activation(0.0, None, &cfg).unwrap();
        for _ in 0..2000 {
            sp.drain(0.01, cfg.starpower_drain_seconds);
            assert!((0.0..=1.0).contains(&sp.charge()));
        }
        assert!(!sp.is_active());
        assert_eq!(sp.charge(), 0.0);
        assert_eq!(sp.phase(), StarpowerPhase::Charging);
    }
}
