use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("Failed to read chart '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse chart JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Lyric {index} at {time:.3}s starts before the previous lyric at {previous:.3}s")]
    LyricOutOfOrder { index: usize, time: f32, previous: f32 },

    #[error("Event '{name}' ({index}) at {time:.3}s starts before the previous event at {previous:.3}s")]
    EventOutOfOrder {
        index: usize,
        name: String,
        time: f32,
        previous: f32,
    },

    #[error("Lyric {index} has an invalid {field}: {value}")]
    InvalidLyric {
        index: usize,
        field: &'static str,
        value: f32,
    },

    #[error("Event {index} has an invalid {field}: {value}")]
    InvalidEvent {
        index: usize,
        field: &'static str,
        value: f32,
    },

    #[error("Harmonic lyric {index} has no pitch points")]
    MissingPitch { index: usize },

    #[error("Pitch points of lyric {index} are not ordered by offset")]
    PitchOutOfOrder { index: usize },
}

#[derive(Error, Debug, PartialEq)]
pub enum SessionError {
    #[error("No singer has a usable input source")]
    NoSingers,

    #[error("Song time must be finite, got {0}")]
    InvalidTime(f32),

    #[error("Song time went backwards: {previous:.4}s -> {current:.4}s")]
    TimeWentBackwards { previous: f32, current: f32 },

    #[error("Playback speed must be positive and finite, got {0}")]
    InvalidSpeed(f32),

    #[error("Frame delta must be finite, got {0}")]
    InvalidDelta(f32),

    #[error("Expected {expected} player inputs, got {got}")]
    PlayerInputMismatch { expected: usize, got: usize },
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DifficultyError {
    #[error("Unknown difficulty '{0}'")]
    UnknownName(String),

    #[error("Unknown difficulty index {0}")]
    UnknownIndex(u8),
}
