pub mod config;
pub mod error;
pub mod game;

pub use config::Config;
pub use error::{ChartError, DifficultyError, SessionError};
pub use game::chart::Chart;
pub use game::difficulty::Difficulty;
pub use game::grade::FinalGrade;
pub use game::session::{
    FrameInput, InputSource, PlayerInput, RosterEntry, SessionState, TickOutput, on_session_end,
    on_session_start,
};
