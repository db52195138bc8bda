use apexsim_arcade::data::ControlInput;
use apexsim_arcade::geometry::{angle_difference, Point2D};
use apexsim_arcade::track::Track;
use apexsim_arcade::vehicle::Vehicle;

/// Steering dead zone of the test driver.
const STEER_THRESHOLD: f64 = 0.05;

/// Path samples the test driver aims ahead of its closest point.
const AIM_AHEAD: usize = 3;

/// Full throttle, steering for a point a few samples ahead on the center line.
fn pursuit_input(track: &Track, car: &Vehicle) -> ControlInput {
    let closest = track.closest_point(car.x, car.y);
    let target = track.center_path()[(closest.index + AIM_AHEAD) % track.path_len()];
    let diff = angle_difference(car.heading, car.position().angle_to(&target));

    ControlInput {
        forward: true,
        left: diff < -STEER_THRESHOLD,
        right: diff > STEER_THRESHOLD,
        ..ControlInput::default()
    }
}

fn car_on_start(track: &Track) -> Vehicle {
    let start = track.start_line();
    Vehicle::new(start.center.x, start.center.y, start.angle, "#ff3333", true)
}

#[test]
fn test_first_tick_registers_start_line() {
    let track = Track::generate(0.5);
    let mut car = car_on_start(&track);

    let events = car.update(&track, pursuit_input(&track, &car));

    let crossing = events.crossing.expect("leaving the start line crosses gate 0");
    assert_eq!(crossing.gate, 0);
    assert!(!crossing.lap_completed);
    assert_eq!(car.last_checkpoint, Some(0));
    assert_eq!(car.checkpoints_passed, 1);
    assert_eq!(car.current_lap, 0);
}

#[test]
fn test_laps_complete_on_gate_zero_only() {
    for seed in [0.5, 0.1, 0.9, 0.0, 0.33] {
        let track = Track::generate(seed);
        let gates = track.checkpoints().len();
        let mut car = car_on_start(&track);
        let mut lap_ticks = Vec::new();

        for tick in 0..1500 {
            let before = (car.last_checkpoint, car.checkpoints_passed, car.current_lap);
            let events = car.update(&track, pursuit_input(&track, &car));

            assert!(!events.bounced, "seed {}: bounced at tick {}", seed, tick);

            match events.crossing {
                Some(crossing) => {
                    let expected = before.0.map_or(0, |last| (last + 1) % gates);
                    assert_eq!(crossing.gate, expected, "seed {}: gates out of order", seed);
                    assert_eq!(car.checkpoints_passed, before.1 + 1);

                    if crossing.lap_completed {
                        assert_eq!(crossing.gate, 0);
                        assert_eq!(car.current_lap, before.2 + 1);
                        assert_eq!(car.checkpoints_passed as usize, gates * car.current_lap as usize + 1);
                        lap_ticks.push(tick);
                    } else {
                        assert_eq!(car.current_lap, before.2);
                    }
                }
                None => {
                    assert_eq!((car.last_checkpoint, car.checkpoints_passed, car.current_lap), before);
                }
            }
        }

        assert!(car.current_lap >= 3, "seed {}: only {} laps", seed, car.current_lap);
        assert_eq!(lap_ticks.len(), car.current_lap as usize);
        // first lap takes a few hundred ticks at this pace
        assert!(lap_ticks[0] > 300 && lap_ticks[0] < 500, "seed {}: lap 1 at {}", seed, lap_ticks[0]);
    }
}

#[test]
fn test_car_stays_on_track_while_driving() {
    let track = Track::generate(0.75);
    let mut car = car_on_start(&track);

    for _ in 0..600 {
        car.update(&track, pursuit_input(&track, &car));
        assert!(track.is_on_track(car.x, car.y));
        assert!(car.speed <= car.params.max_speed);
    }
}

#[test]
fn test_gate_crossing_ignores_direction() {
    let track = Track::generate(0.5);
    let start = track.start_line();
    // a little ahead of the line, pointing forward, rolling backwards
    let ahead = start.center.add(&Point2D::from_angle(start.angle).scale(3.0));
    let mut car = Vehicle::new(ahead.x, ahead.y, start.angle, "#ff3333", true);

    let backward = ControlInput {
        backward: true,
        ..ControlInput::default()
    };
    let mut crossed_at = None;
    for tick in 0..30 {
        if car.update(&track, backward).crossing.is_some() && crossed_at.is_none() {
            crossed_at = Some(tick);
        }
    }

    // 0.48 + 0.94 + 1.38 < 3 <= 0.48 + 0.94 + 1.38 + 1.8
    assert_eq!(crossed_at, Some(3));
    assert_eq!(car.last_checkpoint, Some(0));
    assert_eq!(car.checkpoints_passed, 1);
    assert_eq!(car.current_lap, 0);
}
