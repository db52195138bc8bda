//! Race session: grid, countdown, fixed-tick loop, finish detection and
//! classification.

use crate::ai_driver::AiController;
use crate::config::{ConfigError, RaceConfig};
use crate::data::*;
use crate::track::{Track, TrackError};
use crate::vehicle::Vehicle;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::f64::consts::FRAC_PI_2;
use tracing::{debug, info, trace};

/// Car colours, cycled over the grid. The first one is the player's.
pub const CAR_COLORS: [&str; 4] = ["#ff3333", "#3333ff", "#33ff33", "#ffff33"];

/// Weight of one lap in the standings sort key.
const LAP_WEIGHT: u64 = 1000;

pub struct Race {
    config: RaceConfig,
    track: Track,
    cars: Vec<Vehicle>,
    /// One slot per car; `None` for a car driven by external input.
    drivers: Vec<Option<AiController>>,
    autopilot: bool,
    player_input: ControlInput,
    state: RaceState,
    current_tick: u64,
    race_ticks: u64,
    countdown_remaining: u32,
}

impl Race {
    /// Build a race on the track generated from `seed`, with the player in
    /// car 0 and `ai_count` AI cars behind it on the grid.
    pub fn new(config: RaceConfig, seed: f64) -> Result<Self, ConfigError> {
        config.validate()?;
        let track = Track::generate_with(seed, &config.track)?;

        let count = config.race.ai_count + 1;
        let mut race = Self {
            config,
            track,
            cars: Vec::with_capacity(count),
            drivers: Vec::with_capacity(count),
            autopilot: false,
            player_input: ControlInput::default(),
            state: RaceState::Grid,
            current_tick: 0,
            race_ticks: 0,
            countdown_remaining: 0,
        };
        race.place_grid();
        race.spawn_drivers();
        Ok(race)
    }

    /// Hand the player car to an AI driver (demo lap).
    pub fn with_autopilot(mut self) -> Self {
        self.autopilot = true;
        self.spawn_drivers();
        self
    }

    fn car_count(&self) -> usize {
        self.config.race.ai_count + 1
    }

    /// Grid slot `index` of `count`, spread across the start line.
    pub fn grid_slot(track: &Track, index: usize, count: usize, spacing: f64) -> (f64, f64, f64) {
        let start = track.start_line();
        let offset = (index as f64 - (count as f64 - 1.0) / 2.0) * spacing;
        let across = start.angle + FRAC_PI_2;
        (
            start.center.x + across.cos() * offset,
            start.center.y + across.sin() * offset,
            start.angle,
        )
    }

    fn place_grid(&mut self) {
        let count = self.car_count();
        self.cars = (0..count)
            .map(|i| {
                let (x, y, heading) = Self::grid_slot(&self.track, i, count, self.config.race.grid_spacing);
                Vehicle::with_params(
                    x,
                    y,
                    heading,
                    CAR_COLORS[i % CAR_COLORS.len()],
                    i == 0,
                    self.config.vehicle.clone(),
                )
            })
            .collect();
    }

    /// Create the AI drivers with skills drawn from the track seed. AI cars
    /// draw first so the autopilot does not change their skills.
    fn spawn_drivers(&mut self) {
        let mut rng = StdRng::seed_from_u64(self.track.seed().to_bits());
        let settings = &self.config.ai;

        let mut drivers: Vec<Option<AiController>> = vec![None];
        for car in 1..self.car_count() {
            drivers.push(Some(AiController::new(car, settings.clone(), &mut rng)));
        }
        if self.autopilot {
            drivers[0] = Some(AiController::new(0, settings.clone(), &mut rng));
        }
        self.drivers = drivers;
    }

    /// Leave the grid: start the countdown, or go straight to racing when the
    /// countdown is disabled. Does nothing outside `Grid`.
    pub fn start(&mut self) {
        if self.state != RaceState::Grid {
            return;
        }

        info!(
            seed = self.track.seed(),
            cars = self.cars.len(),
            laps = self.config.race.laps,
            "Race started"
        );

        self.countdown_remaining = self.config.race.countdown_ticks;
        if self.countdown_remaining == 0 {
            self.state = RaceState::Racing;
        } else {
            self.state = RaceState::Countdown;
        }
    }

    /// Controls for the player car, used until replaced. Ignored while the
    /// autopilot drives.
    pub fn set_player_input(&mut self, input: ControlInput) {
        self.player_input = input;
    }

    /// Advance the race by one tick.
    pub fn tick(&mut self) {
        self.current_tick += 1;

        match self.state {
            RaceState::Grid => {
                // Waiting for start
            }
            RaceState::Countdown => {
                self.countdown_remaining = self.countdown_remaining.saturating_sub(1);
                if self.countdown_remaining == 0 {
                    debug!(tick = self.current_tick, "Countdown complete");
                    self.state = RaceState::Racing;
                }
            }
            RaceState::Racing => {
                self.tick_racing();
            }
            RaceState::Finished => {
                // Race is done
            }
        }
    }

    fn tick_racing(&mut self) {
        self.race_ticks += 1;

        // All decisions see the same pre-tick field
        let mut controls = Vec::with_capacity(self.cars.len());
        for (index, driver) in self.drivers.iter_mut().enumerate() {
            let input = match driver {
                Some(ai) => ai.update(&self.track, &self.cars),
                None if index == 0 => self.player_input,
                None => ControlInput::default(),
            };
            controls.push(input);
        }

        for (index, car) in self.cars.iter_mut().enumerate() {
            let input = controls.get(index).copied().unwrap_or_default();
            let events = car.update(&self.track, input);

            if events.bounced {
                trace!(car = index, speed = car.speed, "Wall bounce");
            }
            if let Some(crossing) = events.crossing {
                if crossing.lap_completed {
                    info!(car = index, lap = car.current_lap, "Lap completed");
                }
            }
        }

        self.check_finishers();

        if self.is_race_complete() {
            self.state = RaceState::Finished;
            info!(
                ticks = self.race_ticks,
                finished = self.cars.iter().filter(|c| c.race_finished).count(),
                cars = self.cars.len(),
                "Race finished"
            );
        }
    }

    fn check_finishers(&mut self) {
        let laps = self.config.race.laps;
        let time_ms = self.elapsed_ms();

        for (index, car) in self.cars.iter_mut().enumerate() {
            if !car.race_finished && car.current_lap >= laps {
                car.mark_finished(self.race_ticks, time_ms);
                info!(
                    car = index,
                    player = car.is_player,
                    time = %format_race_time(time_ms),
                    "Car finished"
                );
            }
        }
    }

    fn is_race_complete(&self) -> bool {
        if self.cars.is_empty() {
            return false;
        }

        if self.cars.iter().all(|c| c.race_finished) {
            return true;
        }

        let grace_over = self
            .cars
            .first()
            .and_then(|player| player.finish_tick)
            .map_or(false, |tick| self.race_ticks - tick >= self.config.race.finish_grace_ticks);

        grace_over || self.race_ticks >= self.config.race.max_ticks
    }

    /// Race time so far, in milliseconds.
    pub fn elapsed_ms(&self) -> u64 {
        self.race_ticks * 1000 / u64::from(self.config.race.tick_rate_hz.max(1))
    }

    /// Start (if needed) and tick until the race is finished. Returns the
    /// number of ticks run.
    pub fn run_to_finish(&mut self) -> u64 {
        self.start();
        let first = self.current_tick;
        while self.state != RaceState::Finished {
            self.tick();
        }
        self.current_tick - first
    }

    /// Live order: laps first, then gates passed. Ties keep grid order.
    pub fn standings(&self) -> Vec<StandingEntry> {
        let mut order: Vec<CarId> = (0..self.cars.len()).collect();
        order.sort_by_key(|&i| {
            let car = &self.cars[i];
            std::cmp::Reverse(u64::from(car.current_lap) * LAP_WEIGHT + u64::from(car.checkpoints_passed))
        });

        order
            .into_iter()
            .enumerate()
            .map(|(rank, car)| {
                let v = &self.cars[car];
                StandingEntry {
                    position: rank + 1,
                    car,
                    lap: v.current_lap,
                    checkpoints_passed: v.checkpoints_passed,
                    finished: v.race_finished,
                }
            })
            .collect()
    }

    /// 1-based live position of `car`.
    pub fn position_of(&self, car: CarId) -> Option<usize> {
        self.standings()
            .into_iter()
            .find(|entry| entry.car == car)
            .map(|entry| entry.position)
    }

    /// Final classification: finishers by time, then non-finishers in grid
    /// order.
    pub fn results(&self) -> Vec<RaceResult> {
        let mut finishers: Vec<CarId> = (0..self.cars.len()).filter(|&i| self.cars[i].race_finished).collect();
        finishers.sort_by_key(|&i| self.cars[i].finish_time_ms);
        let dnf = (0..self.cars.len()).filter(|&i| !self.cars[i].race_finished);

        finishers
            .into_iter()
            .chain(dnf)
            .enumerate()
            .map(|(rank, car)| {
                let v = &self.cars[car];
                RaceResult {
                    position: rank + 1,
                    car,
                    color: v.color.clone(),
                    is_player: v.is_player,
                    laps: v.current_lap,
                    finish_time_ms: v.finish_time_ms,
                }
            })
            .collect()
    }

    pub fn snapshot(&self) -> Vec<CarSnapshot> {
        self.cars
            .iter()
            .enumerate()
            .map(|(car, v)| CarSnapshot {
                car,
                x: v.x,
                y: v.y,
                heading: v.heading,
                speed_kmh: v.speed_kmh(),
                color: v.color.clone(),
                is_player: v.is_player,
                is_drifting: v.is_drifting,
                lap: v.current_lap,
                checkpoints_passed: v.checkpoints_passed,
                finished: v.race_finished,
            })
            .collect()
    }

    /// New track from `seed`, every car back on its grid slot, every AI
    /// driver reset with a fresh skill.
    pub fn restart(&mut self, seed: f64) -> Result<(), TrackError> {
        self.track = Track::generate_with(seed, &self.config.track)?;

        let count = self.cars.len();
        let spacing = self.config.race.grid_spacing;
        for (index, car) in self.cars.iter_mut().enumerate() {
            let (x, y, heading) = Self::grid_slot(&self.track, index, count, spacing);
            car.reset(x, y, heading);
        }

        self.spawn_drivers();
        for driver in self.drivers.iter_mut().flatten() {
            driver.reset();
        }

        self.player_input = ControlInput::default();
        self.state = RaceState::Grid;
        self.current_tick = 0;
        self.race_ticks = 0;
        self.countdown_remaining = 0;

        info!(seed, "Race restarted");
        Ok(())
    }

    pub fn config(&self) -> &RaceConfig {
        &self.config
    }

    pub fn track(&self) -> &Track {
        &self.track
    }

    pub fn cars(&self) -> &[Vehicle] {
        &self.cars
    }

    pub fn player(&self) -> Option<&Vehicle> {
        self.cars.first()
    }

    pub fn driver(&self, car: CarId) -> Option<&AiController> {
        self.drivers.get(car).and_then(Option::as_ref)
    }

    pub fn state(&self) -> RaceState {
        self.state
    }

    pub fn current_tick(&self) -> u64 {
        self.current_tick
    }

    pub fn race_ticks(&self) -> u64 {
        self.race_ticks
    }

    pub fn countdown_remaining(&self) -> u32 {
        self.countdown_remaining
    }
}
