use crate::config::Config;
use crate::error::SessionError;
use crate::game::chart::Chart;
use crate::game::difficulty::{Difficulty, required_time_fraction};
use crate::game::grade::FinalGrade;
use crate::game::hud::{ParticleState, Readouts};
use crate::game::phrase::{Combo, PhraseJudge, PhraseOutcome, PlayerScoreState};
use crate::game::pitch::{BotSinger, PitchReading, judge_pitch, note_and_octave_to_z};
use crate::game::scheduler::{Cursors, LogicEvent, Scheduler, SpawnInstruction, TrackTiming};
use crate::game::starpower::StarpowerState;
use log::{debug, info, warn};
use serde::Serialize;
use std::sync::Arc;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InputSource {
    /// A microphone; `None` until the player has assigned a device.
    Microphone { device: Option<usize> },
    Bot,
}

#[derive(Clone, Debug)]
pub struct RosterEntry {
    pub name: String,
    pub difficulty: Difficulty,
    pub input: InputSource,
}

impl RosterEntry {
    pub fn new(name: impl Into<String>, difficulty: Difficulty, input: InputSource) -> Self {
        Self {
            name: name.into(),
            difficulty,
            input,
        }
    }

    fn is_usable(&self) -> bool {
        match self.input {
            InputSource::Microphone { device } => device.is_some(),
            InputSource::Bot => true,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct PlayerInput {
    /// Ignored for bots.
    pub reading: PitchReading,
    /// Starpower button pressed since the previous tick.
    pub starpower_pressed: bool,
}

/// Everything the session reads for one frame.
#[derive(Clone, Debug)]
pub struct FrameInput {
    pub song_time: f32,
    pub delta_time: f32,
    pub playback_speed: f32,
    /// Beat pulse edge since the previous tick.
    pub beat: bool,
    /// One per admitted player, in roster order.
    pub players: Vec<PlayerInput>,
}

#[derive(Clone, Debug, Serialize)]
pub struct TickOutput {
    /// Ordered by chart time within this tick only.
    pub spawns: Vec<SpawnInstruction>,
    pub phrases: Vec<PhraseOutcome>,
    pub readouts: Readouts,
}

pub struct SessionState {
    chart: Arc<Chart>,
    config: Config,
    players: Vec<PlayerScoreState>,
    /// Parallel to `players`; bots generate their own readings.
    bots: Vec<Option<BotSinger>>,
    scheduler: Scheduler,
    phrase: PhraseJudge,
    combo: Combo,
    starpower: StarpowerState,
    readouts: Readouts,
    last_song_time: Option<f32>,
    log_timer: f32,
}

/// Admits every roster entry with a usable input and opens the first phrase.
pub fn on_session_start(
    roster: &[RosterEntry],
    chart: Arc<Chart>,
    config: Config,
) -> Result<SessionState, SessionError> {
    let mut players = Vec::with_capacity(roster.len());
    let mut bots = Vec::with_capacity(roster.len());
    for entry in roster {
        if !entry.is_usable() {
            warn!("Skipping '{}': no microphone assigned.", entry.name);
            continue;
        }
        players.push(PlayerScoreState::new(entry.name.clone(), entry.difficulty));
        bots.push((entry.input == InputSource::Bot).then(BotSinger::new));
    }
    if players.is_empty() {
        return Err(SessionError::NoSingers);
    }

    // No marker precedes the first phrase, so scan for it from the top.
    let phrase = PhraseJudge::new(chart.phrase_sing_time(0, 0.0));
    info!(
        "Vocal session started: {} singer(s), first phrase {:.2}s of singing.",
        players.len(),
        phrase.section_sing_time
    );

    let readouts = Readouts::new(players.len());
    Ok(SessionState {
        chart,
        config,
        players,
        bots,
        scheduler: Scheduler::new(),
        phrase,
        combo: Combo::default(),
        starpower: StarpowerState::default(),
        readouts,
        last_song_time: None,
        log_timer: 0.0,
    })
}

/// Folds every player's counters into a final grade.
pub fn on_session_end(state: SessionState) -> Vec<FinalGrade> {
    let grades: Vec<FinalGrade> = state.players.iter().map(FinalGrade::from_player).collect();
    for grade in &grades {
        match grade.percent {
            Some(p) => info!(
                "{} ({}): {:.2}% ({} hit, {} missed)",
                grade.player,
                grade.difficulty,
                p * 100.0,
                grade.notes_hit,
                grade.notes_missed
            ),
            None => info!("{} ({}): no phrases judged", grade.player, grade.difficulty),
        }
    }
    grades
}

impl SessionState {
    pub fn chart(&self) -> &Chart {
        &self.chart
    }

    pub fn players(&self) -> &[PlayerScoreState] {
        &self.players
    }

    pub fn readouts(&self) -> &Readouts {
        &self.readouts
    }

    pub fn starpower(&self) -> &StarpowerState {
        &self.starpower
    }

    pub fn raw_multiplier(&self) -> u32 {
        self.combo.raw_multiplier()
    }

    pub fn multiplier(&self) -> u32 {
        self.combo.effective(self.starpower.is_active())
    }

    pub fn section_sing_time(&self) -> f32 {
        self.phrase.section_sing_time
    }

    pub fn cursors(&self) -> Cursors {
        self.scheduler.cursors()
    }

    pub fn is_bot(&self, player: usize) -> bool {
        self.bots.get(player).is_some_and(Option::is_some)
    }

    /// Handles a starpower button press at `song_time`. Requests below the
    /// charge threshold or outside an activation window do nothing.
    pub fn request_starpower(&mut self, song_time: f32) -> bool {
        let neighbors = self.scheduler.activation_neighbors(&self.chart);
        self.starpower
            .request_activation(song_time, neighbors, &self.config)
            .is_ok()
    }

    fn validate(&self, frame: &FrameInput) -> Result<(), SessionError> {
        if !frame.song_time.is_finite() {
            return Err(SessionError::InvalidTime(frame.song_time));
        }
        if !frame.playback_speed.is_finite() || frame.playback_speed <= 0.0 {
            return Err(SessionError::InvalidSpeed(frame.playback_speed));
        }
        if !frame.delta_time.is_finite() {
            return Err(SessionError::InvalidDelta(frame.delta_time));
        }
        if frame.players.len() != self.players.len() {
            return Err(SessionError::PlayerInputMismatch {
                expected: self.players.len(),
                got: frame.players.len(),
            });
        }
        if let Some(previous) = self.last_song_time {
            if frame.song_time < previous {
                return Err(SessionError::TimeWentBackwards {
                    previous,
                    current: frame.song_time,
                });
            }
        }
        Ok(())
    }

    /// Advances the session by one frame.
    pub fn tick(&mut self, frame: &FrameInput) -> Result<TickOutput, SessionError> {
        self.validate(frame)?;
        self.last_song_time = Some(frame.song_time);

        let song_time = frame.song_time;
        let dt = frame.delta_time.max(0.0);
        let mut spawns = Vec::new();
        let mut phrases = Vec::new();

        if frame.players.iter().any(|p| p.starpower_pressed) {
            self.request_starpower(song_time);
        }

        let track = TrackTiming::new(&self.config, frame.playback_speed);
        let chart = Arc::clone(&self.chart);
        self.scheduler
            .advance_visual(&chart, &track, track.render_time(song_time), &self.config, &mut spawns);

        for event in self.scheduler.advance_logic_events(&chart, song_time) {
            match event {
                LogicEvent::EndPhrase { index, time } => {
                    if let Some(outcome) = self.close_phrase(time, song_time) {
                        phrases.push(outcome);
                    }
                    self.phrase = PhraseJudge::new(chart.phrase_sing_time(index + 1, time));
                    debug!(
                        "Phrase opened at {:.3}s with {:.2}s of singing",
                        time, self.phrase.section_sing_time
                    );
                }
                LogicEvent::StarpowerWindow(event) => self.starpower.open_section(&event),
            }
        }

        self.scheduler.update_current_lyric(&chart, song_time);
        self.judge_players(&chart, frame, song_time, dt);

        self.starpower.drain(dt, self.config.starpower_drain_seconds);
        self.readouts.set_multiplier(self.multiplier());
        self.readouts.tick_fades(&self.starpower, frame.beat, dt);

        self.log_timer += dt;
        if self.log_timer >= 1.0 {
            info!(
                "Time: {:.2}, Multiplier: {}x, Starpower: {:.2}{}, Lyric: {:?}",
                song_time,
                self.multiplier(),
                self.starpower.charge(),
                if self.starpower.is_active() { " (active)" } else { "" },
                self.scheduler.current_lyric_index()
            );
            self.log_timer -= 1.0;
        }

        Ok(TickOutput {
            spawns,
            phrases,
            readouts: self.readouts.clone(),
        })
    }

    fn close_phrase(&mut self, marker_time: f32, song_time: f32) -> Option<PhraseOutcome> {
        let outcome = self.phrase.close(marker_time, &mut self.players, &mut self.combo)?;

        info!(
            "Phrase at {:.2}s: {} (best {:.0}%), multiplier {}x",
            marker_time,
            outcome.band,
            outcome.best_percent * 100.0,
            self.combo.raw_multiplier()
        );
        self.readouts.show_performance(outcome.band);
        if outcome.hit() {
            self.starpower
                .on_phrase_hit(song_time, self.config.starpower_charge_per_phrase);
        }
        Some(outcome)
    }

    fn judge_players(&mut self, chart: &Chart, frame: &FrameInput, song_time: f32, dt: f32) {
        let lyric = self.scheduler.current_lyric(chart);
        let section = self.phrase.section_sing_time;
        let voice_timeout = self.config.voice_timeout;
        let mut highest_progress = 0.0_f32;

        for (i, (player, bot)) in self.players.iter_mut().zip(self.bots.iter_mut()).enumerate() {
            let reading = match bot.as_mut() {
                Some(bot) => bot.reading(chart, song_time, dt),
                None => frame.players[i].reading,
            };
            let seconds_into_note = lyric.map_or(0.0, |l| song_time - l.time);
            let judgment = judge_pitch(lyric, &reading, player.difficulty, seconds_into_note);
            if let Some(offset) = judgment.octave_offset {
                player.octave_offset = offset;
            }

            let scoring = judgment.correct && lyric.is_some();
            if scoring {
                player.add_progress(dt);
            }

            let readout = &mut self.readouts.players[i];
            readout.particles = if scoring {
                ParticleState::Active
            } else if reading.voice_detected {
                ParticleState::Idle
            } else {
                ParticleState::Off
            };
            readout.needle_visible = reading.is_fresh(voice_timeout);
            readout.octave_offset = player.octave_offset;
            let target_z = note_and_octave_to_z(reading.note, reading.octave + player.octave_offset);
            readout.ease_needle(target_z, dt);
            readout.bar_fill = player.phrase_percent(section);

            highest_progress = highest_progress.max(player.sing_progress);
        }

        // The shared combo meter uses the first singer's difficulty.
        self.readouts.combo_fill = match self.players.first() {
            Some(first) if section > 0.0 => {
                highest_progress / (section * required_time_fraction(first.difficulty))
            }
            _ => 0.0,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::chart::tests::{event, harmonic};

    fn mic(name: &str, difficulty: Difficulty) -> RosterEntry {
        RosterEntry::new(name, difficulty, InputSource::Microphone { device: Some(0) })
    }

    fn frame(song_time: f32, delta_time: f32, reading: PitchReading) -> FrameInput {
        FrameInput {
            song_time,
            delta_time,
            playback_speed: 1.0,
            beat: false,
            players: vec![PlayerInput { reading, starpower_pressed: false }],
        }
    }

    #[test]
    fn cannot_start_without_usable_input() {
        let chart = Arc::new(Chart::default());
        let roster = [RosterEntry::new("P1", Difficulty::Easy, InputSource::Microphone { device: None })];
        let err = on_session_start(&roster, chart, Config::default()).err();
        assert_eq!(err, Some(SessionError::NoSingers));
    }

    #[test]
    fn first_phrase_is_opened_at_start() {
        let chart = Chart::new(
            vec![harmonic(0.0, 2.0, 60.0), harmonic(2.0, 2.0, 60.0)],
            vec![event(4.5, "vocal_endPhrase", 0.0)],
        )
        .unwrap();
        let state = on_session_start(&[mic("P1", Difficulty::Expert)], Arc::new(chart), Config::default()).unwrap();
        assert!((state.section_sing_time() - 4.0).abs() <= 1e-6);
    }

    #[test]
    fn rejects_contract_violations() {
        let chart = Arc::new(Chart::default());
        let mut state = on_session_start(&[mic("P1", Difficulty::Easy)], chart, Config::default()).unwrap();
        state.tick(&frame(1.0, 0.016, PitchReading::default())).unwrap();
        assert_eq!(
            state.tick(&frame(0.5, 0.016, PitchReading::default())).err(),
            Some(SessionError::TimeWentBackwards { previous: 1.0, current: 0.5 })
        );
        let mut bad_speed = frame(2.0, 0.016, PitchReading::default());
        bad_speed.playback_speed = 0.0;
        assert_eq!(state.tick(&bad_speed).err(), Some(SessionError::InvalidSpeed(0.0)));
        let mut missing = frame(2.0, 0.016, PitchReading::default());
        missing.players.clear();
        assert_eq!(
            state.tick(&missing).err(),
            Some(SessionError::PlayerInputMismatch { expected: 1, got: 0 })
        );
    }

    #[test]
    fn activation_without_following_lyric_is_immediate() {
        let chart = Chart::new(vec![harmonic(0.0, 1.0, 60.0)], vec![]).unwrap();
        let mut state = on_session_start(&[mic("P1", Difficulty::Easy)], Arc::new(chart), Config::default()).unwrap();
        state.starpower = StarpowerState::with_charge(0.6);
        state.tick(&frame(0.5, 0.016, PitchReading::default())).unwrap();
        // Logic cursor is past the only lyric: no window constraint.
        assert!(state.request_starpower(0.5));
        assert!(state.starpower().is_active());
        assert!((state.starpower().charge() - 0.6).abs() <= f32::EPSILON);
        assert_eq!(state.multiplier(), 2);
    }

    #[test]
    fn activation_during_first_lyric_is_unconstrained() {
        let chart = Chart::new(vec![harmonic(0.0, 1.0, 60.0), harmonic(3.0, 1.0, 60.0)], vec![]).unwrap();
        let mut state = on_session_start(&[mic("P1", Difficulty::Easy)], Arc::new(chart), Config::default()).unwrap();
        state.starpower = StarpowerState::with_charge(0.6);
        state.tick(&frame(0.5, 0.016, PitchReading::default())).unwrap();
        assert_eq!(state.cursors().logic_lyric, 1);
        assert!(state.request_starpower(0.5));
        assert!(state.starpower().is_active());
    }

    #[test]
    fn on_pitch_singing_accumulates_only_during_lyrics() {
        let chart = Chart::new(vec![harmonic(1.0, 1.0, 60.0)], vec![event(3.0, "vocal_endPhrase", 0.0)]).unwrap();
        let mut state = on_session_start(&[mic("P1", Difficulty::Expert)], Arc::new(chart), Config::default()).unwrap();
        let on_pitch = PitchReading::voiced(0.5, 4);
        let mut t = 0.0;
        while t < 2.5 {
            state.tick(&frame(t, 0.1, on_pitch)).unwrap();
            t += 0.1;
        }
        let progress = state.players()[0].sing_progress;
        // Lyric spans 1.0..=2.0, judged about ten frames.
        assert!(progress > 0.85 && progress < 1.25, "progress {progress}");
        assert_eq!(state.players()[0].octave_offset, 1);
        assert_eq!(state.readouts().players[0].particles, ParticleState::Idle);
    }
}
