//! Procedural track generation and track geometry queries.
//!
//! A track is a closed loop: control points are laid out around a center with
//! a seeded sinusoidal radius, a Catmull-Rom spline is sampled through them to
//! get the center path, and the inner/outer walls are the path offset by half
//! the track width along the path normal. Checkpoint gates are evenly spaced
//! along the path; gate 0 is the start/finish line.

use crate::geometry::{distance_to_segment, point_in_polygon, Point2D};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, PartialEq)]
pub enum TrackError {
    #[error("track needs at least 4 control points, got {0}")]
    TooFewControlPoints(usize),
    #[error("resolution {resolution} is smaller than the control point count {control_points}")]
    ResolutionTooLow {
        resolution: usize,
        control_points: usize,
    },
    #[error("checkpoint count must be between 1 and {max}, got {count}")]
    InvalidCheckpointCount { count: usize, max: usize },
    #[error("invalid track dimension: {0}")]
    InvalidDimension(String),
}

/// Generation parameters. The defaults produce the standard arcade loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackParams {
    pub control_points: usize,
    pub base_radius: f64,
    pub center_x: f64,
    pub center_y: f64,
    /// Amplitude of the sinusoidal radius perturbation, as a fraction of `base_radius`.
    pub radius_variation: f64,
    /// Total number of center path samples.
    pub resolution: usize,
    pub track_width: f64,
    pub num_checkpoints: usize,
    /// How far each gate reaches past the walls on either side.
    pub gate_margin: f64,
}

impl Default for TrackParams {
    fn default() -> Self {
        Self {
            control_points: 16,
            base_radius: 400.0,
            center_x: 640.0,
            center_y: 360.0,
            radius_variation: 0.3,
            resolution: 100,
            track_width: 120.0,
            num_checkpoints: 10,
            gate_margin: 10.0,
        }
    }
}

impl TrackParams {
    pub fn validate(&self) -> Result<(), TrackError> {
        if self.control_points < 4 {
            return Err(TrackError::TooFewControlPoints(self.control_points));
        }
        if self.resolution < self.control_points {
            return Err(TrackError::ResolutionTooLow {
                resolution: self.resolution,
                control_points: self.control_points,
            });
        }
        if self.num_checkpoints == 0 || self.num_checkpoints > self.resolution {
            return Err(TrackError::InvalidCheckpointCount {
                count: self.num_checkpoints,
                max: self.resolution,
            });
        }
        if !(self.track_width > 0.0) {
            return Err(TrackError::InvalidDimension(format!(
                "track_width must be positive, got {}",
                self.track_width
            )));
        }
        if !(self.base_radius > 0.0) {
            return Err(TrackError::InvalidDimension(format!(
                "base_radius must be positive, got {}",
                self.base_radius
            )));
        }
        if !(0.0..1.0).contains(&self.radius_variation) {
            return Err(TrackError::InvalidDimension(format!(
                "radius_variation must be in [0, 1), got {}",
                self.radius_variation
            )));
        }
        if self.gate_margin < 0.0 {
            return Err(TrackError::InvalidDimension(format!(
                "gate_margin must not be negative, got {}",
                self.gate_margin
            )));
        }
        Ok(())
    }
}

/// A gate spanning the track width; crossing the gates in index order makes a lap.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckpointGate {
    pub index: usize,
    /// Center path index the gate sits on.
    pub path_index: usize,
    pub center: Point2D,
    pub angle: f64,
    /// Endpoint on the inner side.
    pub p1: Point2D,
    /// Endpoint on the outer side.
    pub p2: Point2D,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StartLine {
    pub center: Point2D,
    pub angle: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosestPoint {
    pub point: Point2D,
    pub index: usize,
    pub distance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallPoint {
    /// Start vertex of the nearest wall segment, not the projected point.
    pub point: Point2D,
    pub distance: f64,
}

/// Immutable race track. Built once per race, read-only afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct Track {
    seed: f64,
    track_width: f64,
    center_path: Vec<Point2D>,
    inner_boundary: Vec<Point2D>,
    outer_boundary: Vec<Point2D>,
    checkpoints: Vec<CheckpointGate>,
    start_line: StartLine,
}

impl Track {
    /// Generate the standard track for `seed`.
    pub fn generate(seed: f64) -> Self {
        Self::build(seed, &TrackParams::default())
    }

    pub fn generate_with(seed: f64, params: &TrackParams) -> Result<Self, TrackError> {
        params.validate()?;
        Ok(Self::build(seed, params))
    }

    fn build(seed: f64, params: &TrackParams) -> Self {
        let control_points = Self::control_points(seed, params);
        let center_path = SplineInterpolator::sample_closed_loop(&control_points, params.resolution);

        let mut track = Self {
            seed,
            track_width: params.track_width,
            center_path,
            inner_boundary: Vec::new(),
            outer_boundary: Vec::new(),
            checkpoints: Vec::new(),
            start_line: StartLine {
                center: Point2D::default(),
                angle: 0.0,
            },
        };

        track.generate_boundaries();
        track.generate_checkpoints(params.num_checkpoints, params.gate_margin);
        track.start_line = StartLine {
            center: track.center_path[0],
            angle: track.path_angle(0),
        };

        debug!(
            seed,
            path_points = track.center_path.len(),
            checkpoints = track.checkpoints.len(),
            "Generated track"
        );

        track
    }

    fn control_points(seed: f64, params: &TrackParams) -> Vec<Point2D> {
        (0..params.control_points)
            .map(|i| {
                let angle = (i as f64 / params.control_points as f64) * PI * 2.0;
                let variation = 1.0 + params.radius_variation * (angle * 3.0 + seed * 10.0).sin();
                let r = params.base_radius * variation;
                Point2D::new(
                    params.center_x + angle.cos() * r,
                    params.center_y + angle.sin() * r,
                )
            })
            .collect()
    }

    fn generate_boundaries(&mut self) {
        let half_width = self.track_width / 2.0;
        let (inner, outer): (Vec<_>, Vec<_>) = (0..self.center_path.len())
            .map(|i| {
                let point = self.center_path[i];
                let normal = Point2D::from_angle(self.path_angle(i) + PI / 2.0).scale(half_width);
                (point.add(&normal), point.sub(&normal))
            })
            .unzip();

        self.inner_boundary = inner;
        self.outer_boundary = outer;
    }

    fn generate_checkpoints(&mut self, count: usize, margin: f64) {
        let len = self.center_path.len();
        let step = len / count;
        let reach = self.track_width / 2.0 + margin;

        self.checkpoints = (0..count)
            .map(|i| {
                let path_index = (i * step) % len;
                let center = self.center_path[path_index];
                let angle = self.path_angle(path_index);
                let normal = Point2D::from_angle(angle + PI / 2.0).scale(reach);

                CheckpointGate {
                    index: i,
                    path_index,
                    center,
                    angle,
                    p1: center.add(&normal),
                    p2: center.sub(&normal),
                }
            })
            .collect();
    }

    pub fn seed(&self) -> f64 {
        self.seed
    }

    pub fn track_width(&self) -> f64 {
        self.track_width
    }

    pub fn center_path(&self) -> &[Point2D] {
        &self.center_path
    }

    pub fn inner_boundary(&self) -> &[Point2D] {
        &self.inner_boundary
    }

    pub fn outer_boundary(&self) -> &[Point2D] {
        &self.outer_boundary
    }

    pub fn checkpoints(&self) -> &[CheckpointGate] {
        &self.checkpoints
    }

    pub fn start_line(&self) -> StartLine {
        self.start_line
    }

    pub fn path_len(&self) -> usize {
        self.center_path.len()
    }

    /// Tangent heading at a path index, pointing at the next point. Indices wrap.
    pub fn path_angle(&self, index: usize) -> f64 {
        let len = self.center_path.len();
        let current = self.center_path[index % len];
        let next = self.center_path[(index + 1) % len];
        current.angle_to(&next)
    }

    /// Inside the outer wall and outside the inner wall.
    pub fn is_on_track(&self, x: f64, y: f64) -> bool {
        let point = Point2D::new(x, y);
        point_in_polygon(&point, &self.outer_boundary) && !point_in_polygon(&point, &self.inner_boundary)
    }

    pub fn closest_point(&self, x: f64, y: f64) -> ClosestPoint {
        let target = Point2D::new(x, y);
        let mut best = ClosestPoint {
            point: self.center_path[0],
            index: 0,
            distance: f64::INFINITY,
        };

        for (index, point) in self.center_path.iter().enumerate() {
            let distance = target.distance_to(point);
            if distance < best.distance {
                best = ClosestPoint {
                    point: *point,
                    index,
                    distance,
                };
            }
        }

        best
    }

    /// Nearest wall segment over both boundaries.
    ///
    /// `distance` is the true point-to-segment distance, but `point` is the
    /// segment's start vertex.
    pub fn nearest_wall_point(&self, x: f64, y: f64) -> WallPoint {
        let target = Point2D::new(x, y);
        let mut best = WallPoint {
            point: self.inner_boundary[0],
            distance: f64::INFINITY,
        };

        for wall in [&self.inner_boundary, &self.outer_boundary] {
            for i in 0..wall.len() {
                let start = &wall[i];
                let end = &wall[(i + 1) % wall.len()];
                let distance = distance_to_segment(&target, start, end);
                if distance < best.distance {
                    best = WallPoint {
                        point: *start,
                        distance,
                    };
                }
            }
        }

        best
    }
}

pub struct SplineInterpolator;

impl SplineInterpolator {
    /// Sample exactly `resolution` points along a closed Catmull-Rom loop.
    ///
    /// Each segment gets `resolution / n` samples; the first
    /// `resolution % n` segments take one more so the total is exact.
    pub fn sample_closed_loop(control_points: &[Point2D], resolution: usize) -> Vec<Point2D> {
        let n = control_points.len();
        let base_steps = resolution / n;
        let extra = resolution % n;
        let mut path = Vec::with_capacity(resolution);

        for i in 0..n {
            let p0 = &control_points[(i + n - 1) % n];
            let p1 = &control_points[i];
            let p2 = &control_points[(i + 1) % n];
            let p3 = &control_points[(i + 2) % n];

            let steps = base_steps + usize::from(i < extra);
            for j in 0..steps {
                let t = j as f64 / steps as f64;
                path.push(Self::catmull_rom_point(p0, p1, p2, p3, t));
            }
        }

        path
    }

    pub fn catmull_rom_point(p0: &Point2D, p1: &Point2D, p2: &Point2D, p3: &Point2D, t: f64) -> Point2D {
        let t2 = t * t;
        let t3 = t2 * t;

        let x = 0.5
            * ((2.0 * p1.x)
                + (-p0.x + p2.x) * t
                + (2.0 * p0.x - 5.0 * p1.x + 4.0 * p2.x - p3.x) * t2
                + (-p0.x + 3.0 * p1.x - 3.0 * p2.x + p3.x) * t3);

        let y = 0.5
            * ((2.0 * p1.y)
                + (-p0.y + p2.y) * t
                + (2.0 * p0.y - 5.0 * p1.y + 4.0 * p2.y - p3.y) * t2
                + (-p0.y + 3.0 * p1.y - 3.0 * p2.y + p3.y) * t3);

        Point2D { x, y }
    }
}
