//! AI driver for computer-controlled cars.
//!
//! AI drivers produce the same [`ControlInput`] a human would, so the vehicle
//! model cannot tell them apart.
//!
//! ## Architecture
//! The controller runs two loops at different rates:
//! 1. Planning (every `update_interval` ticks): pick a target point a fixed
//!    number of path samples ahead of the car, and scan for cars ahead to
//!    steer around.
//! 2. Low-level control (every tick): steer toward the cached target and pick
//!    throttle or brake from the curvature coming up after it.
//!
//! Each controller has a skill factor, drawn once at creation, that scales
//! both its target speed and its steering precision.

use crate::data::{CarId, ControlInput};
use crate::geometry::angle_difference;
use crate::track::Track;
use crate::vehicle::Vehicle;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;

/// Base steering dead zone, scaled by skill.
const STEER_THRESHOLD: f64 = 0.1;

/// Drift when the heading error exceeds this...
const DRIFT_ANGLE: f64 = 0.3;
/// ...and the car is faster than this.
const DRIFT_MIN_SPEED: f64 = 4.0;

/// Overspeed tolerated before braking.
const BRAKE_MARGIN: f64 = 1.0;

/// Path distance covered by one look-ahead step.
const LOOKAHEAD_UNITS_PER_INDEX: f64 = 5.0;

/// Tuning shared by every AI driver in a race.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiSettings {
    /// Target look-ahead; divided by 5 to get a path index offset.
    pub lookahead_distance: f64,
    /// Ticks between retarget and avoidance scans.
    pub update_interval: u32,
    pub avoidance_radius: f64,
    /// Heading offset (radians) applied away from a car ahead.
    pub avoidance_nudge: f64,
    /// Path samples between the target and the point used to estimate curvature.
    pub curvature_lookahead: usize,
    /// Lower bound on the corner speed factor `1 - curvature`. Any value at or
    /// below `1 - PI` never binds, leaving the unclamped factor.
    pub min_corner_factor: f64,
    pub skill_min: f64,
    pub skill_max: f64,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            lookahead_distance: 15.0,
            update_interval: 5,
            avoidance_radius: 60.0,
            avoidance_nudge: 0.5,
            curvature_lookahead: 20,
            min_corner_factor: 0.5,
            skill_min: 0.7,
            skill_max: 1.0,
        }
    }
}

impl AiSettings {
    /// Path index offset between the closest point and the target.
    pub fn lookahead_steps(&self) -> usize {
        (self.lookahead_distance / LOOKAHEAD_UNITS_PER_INDEX).floor().max(0.0) as usize
    }
}

/// Drives one car. Owns no track or vehicle state; both are passed in on
/// every [`update`](AiController::update).
#[derive(Debug, Clone)]
pub struct AiController {
    car: CarId,
    target_index: usize,
    update_counter: u32,
    avoidance_angle: f64,
    skill: f64,
    settings: AiSettings,
}

impl AiController {
    /// Create a controller with a skill drawn uniformly from
    /// `[skill_min, skill_max)`.
    pub fn new(car: CarId, settings: AiSettings, rng: &mut impl Rng) -> Self {
        let skill = if settings.skill_min < settings.skill_max {
            rng.gen_range(settings.skill_min..settings.skill_max)
        } else {
            settings.skill_min
        };
        Self::with_skill(car, settings, skill)
    }

    pub fn with_skill(car: CarId, settings: AiSettings, skill: f64) -> Self {
        Self {
            car,
            target_index: 0,
            update_counter: 0,
            avoidance_angle: 0.0,
            skill,
            settings,
        }
    }

    pub fn car(&self) -> CarId {
        self.car
    }

    pub fn skill(&self) -> f64 {
        self.skill
    }

    pub fn target_index(&self) -> usize {
        self.target_index
    }

    pub fn avoidance_angle(&self) -> f64 {
        self.avoidance_angle
    }

    /// Decide this tick's controls for the controlled car.
    ///
    /// `cars` is the whole field; the controlled car is looked up by index and
    /// the others are only read for avoidance.
    pub fn update(&mut self, track: &Track, cars: &[Vehicle]) -> ControlInput {
        let Some(me) = cars.get(self.car) else {
            return ControlInput::default();
        };

        self.update_counter += 1;
        if self.settings.update_interval > 0 && self.update_counter % self.settings.update_interval == 0 {
            self.update_target(track, me);
            self.check_avoidance(cars, me);
        }

        let mut controls = ControlInput::default();
        self.steer_towards_target(track, me, &mut controls);
        self.control_speed(track, me, &mut controls);
        controls
    }

    fn update_target(&mut self, track: &Track, me: &Vehicle) {
        let closest = track.closest_point(me.x, me.y);
        self.target_index = (closest.index + self.settings.lookahead_steps()) % track.path_len();
    }

    /// Nudge away from any car close ahead. When several qualify the last
    /// one in grid order decides the direction.
    fn check_avoidance(&mut self, cars: &[Vehicle], me: &Vehicle) {
        self.avoidance_angle = 0.0;

        let position = me.position();
        for (index, other) in cars.iter().enumerate() {
            if index == self.car {
                continue;
            }

            let other_position = other.position();
            if position.distance_to(&other_position) >= self.settings.avoidance_radius {
                continue;
            }

            let bearing = position.angle_to(&other_position);
            let relative = angle_difference(me.heading, bearing);
            if relative.abs() < FRAC_PI_2 {
                self.avoidance_angle = if relative > 0.0 {
                    -self.settings.avoidance_nudge
                } else {
                    self.settings.avoidance_nudge
                };
            }
        }
    }

    fn steer_towards_target(&self, track: &Track, me: &Vehicle, controls: &mut ControlInput) {
        let Some(target) = track.center_path().get(self.target_index) else {
            return;
        };

        let bearing = me.position().angle_to(target);
        let angle_diff = angle_difference(me.heading, bearing) + self.avoidance_angle;

        let threshold = STEER_THRESHOLD * self.skill;
        controls.right = angle_diff > threshold;
        controls.left = angle_diff < -threshold;
        controls.drift = angle_diff.abs() > DRIFT_ANGLE && me.speed > DRIFT_MIN_SPEED;
    }

    fn control_speed(&self, track: &Track, me: &Vehicle, controls: &mut ControlInput) {
        let target_speed = self.target_speed(track, me);

        if me.speed > target_speed + BRAKE_MARGIN {
            controls.forward = false;
            controls.backward = true;
        } else {
            // Below target or within the margin: keep the throttle on
            controls.forward = true;
            controls.backward = false;
        }
    }

    /// Speed the car should carry toward the current target.
    pub fn target_speed(&self, track: &Track, me: &Vehicle) -> f64 {
        let len = track.path_len();
        let current = track.path_angle(self.target_index);
        let future = track.path_angle((self.target_index + self.settings.curvature_lookahead) % len);
        let curvature = angle_difference(current, future).abs();

        let corner_factor = (1.0 - curvature).max(self.settings.min_corner_factor);
        me.params.max_speed * self.skill * corner_factor
    }

    /// Forget the target and counters. Skill is kept.
    pub fn reset(&mut self) {
        self.target_index = 0;
        self.update_counter = 0;
        self.avoidance_angle = 0.0;
    }
}
