//! Arcade vehicle kinematics and checkpoint/lap tracking.
//!
//! One call to [`Vehicle::update`] is one fixed simulation tick:
//! - Speed integration from the control input (accelerate, brake, reverse)
//! - Multiplicative friction and optional drift damping
//! - Speed-scaled steering
//! - Euler position step with bounce-back when leaving the track
//! - Sequential checkpoint crossing that drives the lap counter

use crate::data::ControlInput;
use crate::geometry::{line_intersection, Point2D};
use crate::track::Track;
use serde::{Deserialize, Serialize};

/// Below this speed the car cannot steer.
const MIN_STEERING_SPEED: f64 = 0.1;

/// Drift only engages above this speed.
const MIN_DRIFT_SPEED: f64 = 2.0;

/// Speed multiplier applied when a step would leave the track.
const WALL_BOUNCE_FACTOR: f64 = -0.5;

/// Display conversion from simulation units per tick to km/h.
const SPEED_TO_KMH: f64 = 20.0;

/// Physical constants of a car.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleParams {
    pub acceleration: f64,
    pub braking: f64,
    /// Per-tick speed multiplier, below 1.
    pub friction: f64,
    /// Heading change per tick at full speed (radians).
    pub turn_speed: f64,
    pub max_speed: f64,
    pub max_reverse_speed: f64,
    /// Extra per-tick speed multiplier while drifting, below 1.
    pub drift_factor: f64,
    pub width: f64,
    pub length: f64,
}

impl Default for VehicleParams {
    fn default() -> Self {
        Self {
            acceleration: 0.5,
            braking: 0.8,
            friction: 0.96,
            turn_speed: 0.04,
            max_speed: 8.0,
            max_reverse_speed: 3.0,
            drift_factor: 0.92,
            width: 16.0,
            length: 24.0,
        }
    }
}

/// A valid, in-sequence gate crossing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckpointCrossing {
    pub gate: usize,
    pub lap_completed: bool,
}

/// What happened to a vehicle during one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepEvents {
    pub bounced: bool,
    pub crossing: Option<CheckpointCrossing>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Vehicle {
    pub x: f64,
    pub y: f64,
    /// Radians, unbounded.
    pub heading: f64,
    /// Signed speed along the heading, in units per tick.
    pub speed: f64,
    pub params: VehicleParams,
    pub color: String,
    pub is_player: bool,
    pub controls: ControlInput,
    pub is_drifting: bool,

    // Race progress
    pub current_lap: u32,
    /// Last gate crossed in sequence; `None` before the first crossing.
    pub last_checkpoint: Option<usize>,
    pub checkpoints_passed: u32,
    pub race_finished: bool,
    pub finish_tick: Option<u64>,
    pub finish_time_ms: Option<u64>,
}

impl Vehicle {
    pub fn new(x: f64, y: f64, heading: f64, color: impl Into<String>, is_player: bool) -> Self {
        Self::with_params(x, y, heading, color, is_player, VehicleParams::default())
    }

    pub fn with_params(
        x: f64,
        y: f64,
        heading: f64,
        color: impl Into<String>,
        is_player: bool,
        params: VehicleParams,
    ) -> Self {
        Self {
            x,
            y,
            heading,
            speed: 0.0,
            params,
            color: color.into(),
            is_player,
            controls: ControlInput::default(),
            is_drifting: false,
            current_lap: 0,
            last_checkpoint: None,
            checkpoints_passed: 0,
            race_finished: false,
            finish_tick: None,
            finish_time_ms: None,
        }
    }

    pub fn position(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }

    /// Advance one tick with the given controls.
    pub fn update(&mut self, track: &Track, controls: ControlInput) -> StepEvents {
        self.controls = controls;
        let p = &self.params;

        if controls.forward {
            self.speed = (self.speed + p.acceleration).min(p.max_speed);
        } else if controls.backward {
            if self.speed > 0.0 {
                self.speed = (self.speed - p.braking).max(0.0);
            } else {
                self.speed = (self.speed - p.acceleration).max(-p.max_reverse_speed);
            }
        }

        self.speed *= p.friction;

        // Steering authority grows with speed and flips when reversing
        if self.speed.abs() > MIN_STEERING_SPEED {
            let turn_amount = p.turn_speed * (self.speed / p.max_speed);
            if controls.left {
                self.heading -= turn_amount;
            }
            if controls.right {
                self.heading += turn_amount;
            }
        }

        if controls.drift && self.speed.abs() > MIN_DRIFT_SPEED {
            self.is_drifting = true;
            self.speed *= p.drift_factor;
        } else {
            self.is_drifting = false;
        }

        let (old_x, old_y) = (self.x, self.y);
        self.x += self.heading.cos() * self.speed;
        self.y += self.heading.sin() * self.speed;

        let mut events = StepEvents::default();
        if !track.is_on_track(self.x, self.y) {
            self.x = old_x;
            self.y = old_y;
            self.speed *= WALL_BOUNCE_FACTOR;
            events.bounced = true;
        }

        events.crossing = self.check_checkpoints(track);
        events
    }

    /// Test the last motion segment against every gate.
    ///
    /// The segment is reconstructed from the current heading and speed. Only
    /// the gate after `last_checkpoint` (wrapping) counts; anything else is
    /// ignored. Crossing gate 0 completes a lap unless it is the very first
    /// gate crossed.
    pub fn check_checkpoints(&mut self, track: &Track) -> Option<CheckpointCrossing> {
        if self.race_finished {
            return None;
        }

        let gates = track.checkpoints();
        if gates.is_empty() {
            return None;
        }

        let current = self.position();
        let previous = current.sub(&Point2D::from_angle(self.heading).scale(self.speed));

        let mut result = None;
        for gate in gates {
            let expected = self.last_checkpoint.map_or(0, |last| (last + 1) % gates.len());
            if gate.index != expected {
                continue;
            }
            if line_intersection(&previous, &current, &gate.p1, &gate.p2).is_none() {
                continue;
            }

            self.last_checkpoint = Some(gate.index);
            self.checkpoints_passed += 1;

            let lap_completed = gate.index == 0 && self.checkpoints_passed > 1;
            if lap_completed {
                self.current_lap += 1;
            }
            result = Some(CheckpointCrossing {
                gate: gate.index,
                lap_completed,
            });
        }

        result
    }

    /// Record the finish. Checkpoint tracking stops afterwards.
    pub fn mark_finished(&mut self, tick: u64, time_ms: u64) {
        self.race_finished = true;
        self.finish_tick = Some(tick);
        self.finish_time_ms = Some(time_ms);
    }

    /// Body corners in world space, for drawing and debugging.
    pub fn corners(&self) -> [Point2D; 4] {
        let half_w = self.params.width / 2.0;
        let half_l = self.params.length / 2.0;
        let center = self.position();

        [
            Point2D::new(-half_w, -half_l),
            Point2D::new(half_w, -half_l),
            Point2D::new(half_w, half_l),
            Point2D::new(-half_w, half_l),
        ]
        .map(|offset| center.add(&offset.rotate(self.heading)))
    }

    pub fn abs_speed(&self) -> f64 {
        self.speed.abs()
    }

    pub fn speed_kmh(&self) -> u32 {
        (self.abs_speed() * SPEED_TO_KMH).round() as u32
    }

    /// Put the car back on the grid with fresh race progress.
    pub fn reset(&mut self, x: f64, y: f64, heading: f64) {
        self.x = x;
        self.y = y;
        self.heading = heading;
        self.speed = 0.0;
        self.controls = ControlInput::default();
        self.is_drifting = false;
        self.current_lap = 0;
        self.last_checkpoint = None;
        self.checkpoints_passed = 0;
        self.race_finished = false;
        self.finish_tick = None;
        self.finish_time_ms = None;
    }
}
