use configparser::ini::Ini;
use log::{LevelFilter, info, warn};
use once_cell::sync::Lazy;
use std::path::Path;
use std::sync::Mutex;

const CONFIG_PATH: &str = "vocalsync.ini";

// Track geometry (world units and units per second at 1x speed)
pub const TRACK_SPEED: f32 = 4.0;
pub const TRACK_SPAWN_OFFSET: f32 = 12.0;
pub const TRACK_END_OFFSET: f32 = 5.0;

// Starpower
pub const STARPOWER_ACTIVATE_MARGIN: f32 = 0.1;
pub const STARPOWER_ACTIVATE_MIN: f32 = 0.5;
pub const STARPOWER_DRAIN_SECONDS: f32 = 25.0;
pub const STARPOWER_CHARGE_PER_PHRASE: f32 = 0.25;
pub const STARPOWER_READY_CHARGE: f32 = 0.5;

// Needle stays visible this long after the voice drops out.
pub const VOICE_TIMEOUT: f32 = 0.25;

// Headless runner
pub const DEFAULT_TICK_RATE: f32 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    pub track_speed: f32,
    pub track_spawn_offset: f32,
    pub track_end_offset: f32,
    pub starpower_activate_margin: f32,
    pub starpower_activate_min: f32,
    /// Seconds a full bar lasts while active.
    pub starpower_drain_seconds: f32,
    pub starpower_charge_per_phrase: f32,
    pub voice_timeout: f32,
    pub tick_rate: f32,
    pub log_level: LevelFilter,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            track_speed: TRACK_SPEED,
            track_spawn_offset: TRACK_SPAWN_OFFSET,
            track_end_offset: TRACK_END_OFFSET,
            starpower_activate_margin: STARPOWER_ACTIVATE_MARGIN,
            starpower_activate_min: STARPOWER_ACTIVATE_MIN,
            starpower_drain_seconds: STARPOWER_DRAIN_SECONDS,
            starpower_charge_per_phrase: STARPOWER_CHARGE_PER_PHRASE,
            voice_timeout: VOICE_TIMEOUT,
            tick_rate: DEFAULT_TICK_RATE,
            log_level: LevelFilter::Info,
        }
    }
}

static CONFIG: Lazy<Mutex<Config>> = Lazy::new(|| Mutex::new(Config::default()));

fn create_default_file(path: &Path) -> Result<(), std::io::Error> {
    info!("Config file not found, creating defaults at '{}'.", path.display());
    let d = Config::default();
    let mut conf = Ini::new();
    conf.set("Track", "Speed", Some(d.track_speed.to_string()));
    conf.set("Track", "SpawnOffset", Some(d.track_spawn_offset.to_string()));
    conf.set("Track", "EndOffset", Some(d.track_end_offset.to_string()));
    conf.set("Starpower", "ActivateMargin", Some(d.starpower_activate_margin.to_string()));
    conf.set("Starpower", "ActivateMin", Some(d.starpower_activate_min.to_string()));
    conf.set("Starpower", "DrainSeconds", Some(d.starpower_drain_seconds.to_string()));
    conf.set("Starpower", "ChargePerPhrase", Some(d.starpower_charge_per_phrase.to_string()));
    conf.set("Options", "VoiceTimeout", Some(d.voice_timeout.to_string()));
    conf.set("Options", "TickRate", Some(d.tick_rate.to_string()));
    conf.set("Options", "LogLevel", Some("Info".to_string()));
    conf.write(path)
}

fn parse_level(s: &str) -> Option<LevelFilter> {
    match s.trim().to_ascii_lowercase().as_str() {
        "off" => Some(LevelFilter::Off),
        "error" => Some(LevelFilter::Error),
        "warn" => Some(LevelFilter::Warn),
        "info" => Some(LevelFilter::Info),
        "debug" => Some(LevelFilter::Debug),
        "trace" => Some(LevelFilter::Trace),
        _ => None,
    }
}

// Reads a positive float, falling back to the default on a missing or bad value.
fn read_positive(conf: &Ini, section: &str, key: &str, default: f32) -> f32 {
    let Some(raw) = conf.get(section, key) else {
        return default;
    };
    match raw.trim().parse::<f32>() {
        Ok(v) if v.is_finite() && v > 0.0 => v,
        _ => {
            warn!("Invalid value '{}' for [{}] {}, using {}.", raw, section, key, default);
            default
        }
    }
}

/// Builds a config from an already-parsed INI, keeping defaults for anything missing.
pub fn from_ini(conf: &Ini) -> Config {
    let d = Config::default();
    let log_level = match conf.get("Options", "LogLevel") {
        Some(raw) => parse_level(&raw).unwrap_or_else(|| {
            warn!("Unknown LogLevel '{}', using {}.", raw, d.log_level);
            d.log_level
        }),
        None => d.log_level,
    };

    Config {
        track_speed: read_positive(conf, "Track", "Speed", d.track_speed),
        track_spawn_offset: read_positive(conf, "Track", "SpawnOffset", d.track_spawn_offset),
        track_end_offset: read_positive(conf, "Track", "EndOffset", d.track_end_offset),
        starpower_activate_margin: read_positive(
            conf,
            "Starpower",
            "ActivateMargin",
            d.starpower_activate_margin,
        ),
        starpower_activate_min: read_positive(conf, "Starpower", "ActivateMin", d.starpower_activate_min),
        starpower_drain_seconds: read_positive(conf, "Starpower", "DrainSeconds", d.starpower_drain_seconds),
        starpower_charge_per_phrase: read_positive(
            conf,
            "Starpower",
            "ChargePerPhrase",
            d.starpower_charge_per_phrase,
        ),
        voice_timeout: read_positive(conf, "Options", "VoiceTimeout", d.voice_timeout),
        tick_rate: read_positive(conf, "Options", "TickRate", d.tick_rate),
        log_level,
    }
}

pub fn load() {
    load_from(Path::new(CONFIG_PATH));
}

pub fn load_from(path: &Path) {
    if !path.exists() {
        if let Err(e) = create_default_file(path) {
            warn!("Failed to create default config file: {}", e);
            // Proceed with default struct values.
            return;
        }
    }

    let mut conf = Ini::new();
    match conf.load(path) {
        Ok(_) => {
            *CONFIG.lock().unwrap() = from_ini(&conf);
            info!("Loaded config from '{}'.", path.display());
        }
        Err(e) => warn!("Failed to load '{}': {}. Using defaults.", path.display(), e),
    }
}

/// Returns a copy of the currently loaded config.
pub fn get() -> Config {
    *CONFIG.lock().unwrap()
}
