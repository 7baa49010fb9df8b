use log::{LevelFilter, error, info};
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use vocalsync::game::session::{FrameInput, InputSource, PlayerInput, RosterEntry};
use vocalsync::{Chart, Difficulty, config, on_session_end, on_session_start};

// Simulated time past the last chart item, so trailing phrase markers close.
const TAIL_SECONDS: f32 = 1.0;

fn parse_args() -> Result<(PathBuf, Vec<Difficulty>), Box<dyn Error>> {
    let mut args = std::env::args().skip(1);
    let chart = args
        .next()
        .map(PathBuf::from)
        .ok_or("usage: vocalsync <chart.json> [difficulty...]")?;
    let difficulties = args.map(|a| a.parse::<Difficulty>()).collect::<Result<Vec<_>, _>>()?;
    Ok((chart, difficulties))
}

fn run() -> Result<(), Box<dyn Error>> {
    let (chart_path, mut difficulties) = parse_args()?;
    if difficulties.is_empty() {
        difficulties.push(Difficulty::Expert);
    }

    let chart = Arc::new(Chart::load(&chart_path)?);
    info!(
        "Loaded '{}': {} lyrics, {} events, {:.2}s.",
        chart_path.display(),
        chart.lyrics().len(),
        chart.events().len(),
        chart.last_time()
    );

    let roster: Vec<RosterEntry> = difficulties
        .iter()
        .enumerate()
        .map(|(i, &d)| RosterEntry::new(format!("Bot {} ({})", i + 1, d), d, InputSource::Bot))
        .collect();

    let cfg = config::get();
    let mut session = on_session_start(&roster, Arc::clone(&chart), cfg)?;

    let delta_time = 1.0 / cfg.tick_rate;
    let end_time = chart.last_time() + TAIL_SECONDS;
    let mut frame = 0_u32;
    loop {
        let song_time = frame as f32 * delta_time;
        if song_time > end_time {
            break;
        }
        session.tick(&FrameInput {
            song_time,
            delta_time,
            playback_speed: 1.0,
            beat: false,
            players: vec![PlayerInput::default(); roster.len()],
        })?;
        frame += 1;
    }

    let grades = on_session_end(session);
    println!("{}", serde_json::to_string_pretty(&grades)?);
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_default_env()
        .filter_level(LevelFilter::Trace)
        .init();
    log::set_max_level(LevelFilter::Info);

    config::load();
    log::set_max_level(config::get().log_level);

    info!("vocalsync starting...");
    if let Err(e) = run() {
        error!("vocalsync exited with error: {}", e);
        return Err(e);
    }
    Ok(())
}
