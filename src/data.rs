use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

// --- Identifiers ---
/// Grid index of a car. Car 0 is the human car.
pub type CarId = usize;

// --- Input Data ---
/// Digital control state for one tick, from a keyboard or an AI driver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlInput {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub drift: bool,
}

impl ControlInput {
    pub fn is_idle(&self) -> bool {
        *self == Self::default()
    }
}

// --- Race State ---
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
pub enum RaceState {
    /// Cars on the grid, race not started
    Grid = 0,
    /// Start lights, nothing moves
    Countdown = 1,
    Racing = 2,
    Finished = 3,
}

impl Default for RaceState {
    fn default() -> Self {
        RaceState::Grid
    }
}

/// Live race position of one car.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandingEntry {
    /// 1-based
    pub position: usize,
    pub car: CarId,
    pub lap: u32,
    pub checkpoints_passed: u32,
    pub finished: bool,
}

/// Final classification of one car.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaceResult {
    pub position: usize,
    pub car: CarId,
    pub color: String,
    pub is_player: bool,
    pub laps: u32,
    /// `None` for a car that did not finish.
    pub finish_time_ms: Option<u64>,
}

impl RaceResult {
    pub fn is_dnf(&self) -> bool {
        self.finish_time_ms.is_none()
    }
}

/// Per-car render state handed to the drawing side every frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarSnapshot {
    pub car: CarId,
    pub x: f64,
    pub y: f64,
    pub heading: f64,
    pub speed_kmh: u32,
    pub color: String,
    pub is_player: bool,
    pub is_drifting: bool,
    pub lap: u32,
    pub checkpoints_passed: u32,
    pub finished: bool,
}

/// Format milliseconds as `m:ss.cc`.
pub fn format_race_time(ms: u64) -> String {
    let minutes = ms / 60_000;
    let seconds = (ms % 60_000) / 1000;
    let centis = (ms % 1000) / 10;
    format!("{}:{:02}.{:02}", minutes, seconds, centis)
}
