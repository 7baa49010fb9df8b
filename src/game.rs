pub mod chart;
pub mod difficulty;
pub mod grade;
pub mod hud;
pub mod phrase;
pub mod pitch;
pub mod scheduler;
pub mod session;
pub mod starpower;
