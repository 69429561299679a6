use std::fmt;

use log::{debug, trace};
use rand::Rng;

use crate::config::ResetPolicy;
use crate::environment::{Acceleration, CellKind, GridTrack, Pos};
use crate::error::{RaceError, Result};
use crate::raster::rasterize;

/// Per-axis speed limit. Excess is capped, not carried over.
pub const MAX_SPEED: isize = 5;

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Velocity {
    pub x: isize,
    pub y: isize,
}

impl Velocity {
    pub const ZERO: Velocity = Velocity { x: 0, y: 0 };

    pub fn new(x: isize, y: isize) -> Self {
        Velocity { x, y }
    }

    /// Adds the acceleration and caps each axis to `[-MAX_SPEED, MAX_SPEED]`.
    pub fn accelerated(self, acceleration: Acceleration) -> Self {
        Velocity {
            x: (self.x + acceleration.x).clamp(-MAX_SPEED, MAX_SPEED),
            y: (self.y + acceleration.y).clamp(-MAX_SPEED, MAX_SPEED),
        }
    }
}

impl fmt::Display for Velocity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.x, self.y)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Transition {
    /// New position and velocity were committed.
    Moved,
    /// The move ran into `wall` (a wall cell or the outside of the grid).
    Crashed { wall: Pos },
    /// The move crossed `finish`; the vehicle stays there.
    Finished { finish: Pos },
}

/// What a single `accelerate` call did.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Move {
    pub requested: Acceleration,
    pub applied: Acceleration,
    /// Whether the x and y acceleration was dropped by a failure roll.
    pub dropped: (bool, bool),
    pub transition: Transition,
}

/// A car on the track. Owned by whoever drives the episode.
#[derive(Debug, Clone)]
pub struct VehicleState<'t> {
    track: &'t GridTrack,
    reset_policy: ResetPolicy,
    failure_probability: f64,
    position: Pos,
    last_position: Pos,
    velocity: Velocity,
    elapsed_time: u32,
    crashes: u32,
    finished: bool,
}

impl<'t> VehicleState<'t> {
    /// Places a stationary car on a randomly chosen start cell.
    pub fn new<R: Rng + ?Sized>(
        track: &'t GridTrack,
        reset_policy: ResetPolicy,
        failure_probability: f64,
        rng: &mut R,
    ) -> Result<Self> {
        let start = track.sample_start(rng);
        Self::at(track, start, reset_policy, failure_probability)
    }

    /// Places a stationary car on `position`.
    pub fn at(
        track: &'t GridTrack,
        position: Pos,
        reset_policy: ResetPolicy,
        failure_probability: f64,
    ) -> Result<Self> {
        if !(0.0..=1.0).contains(&failure_probability) {
            return Err(RaceError::config(
                "failure_probability",
                format!("{} is not in [0, 1]", failure_probability),
            ));
        }
        match track.cell_kind(position)? {
            CellKind::Open | CellKind::Start => {}
            kind => {
                return Err(RaceError::config(
                    "position",
                    format!("{} is a {:?} cell, not open track", position, kind),
                ));
            }
        }
        Ok(VehicleState {
            track,
            reset_policy,
            failure_probability,
            position,
            last_position: position,
            velocity: Velocity::ZERO,
            elapsed_time: 0,
            crashes: 0,
            finished: false,
        })
    }

    pub fn position(&self) -> Pos {
        self.position
    }

    pub fn last_position(&self) -> Pos {
        self.last_position
    }

    pub fn velocity(&self) -> Velocity {
        self.velocity
    }

    pub fn elapsed_time(&self) -> u32 {
        self.elapsed_time
    }

    pub fn crashes(&self) -> u32 {
        self.crashes
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Applies one time step of acceleration.
    ///
    /// Inputs are reduced to `{-1, 0, 1}` by sign. A non-braking acceleration on
    /// an axis is dropped with the configured failure probability. The move is
    /// then rasterized from the current cell and the first wall or finish cell
    /// along it decides the outcome. Each call advances elapsed time by one,
    /// except on a finished car, where calls are no-ops and the clock stays put.
    pub fn accelerate<R: Rng + ?Sized>(&mut self, ax: isize, ay: isize, rng: &mut R) -> Move {
        let requested = Acceleration::clamped(ax, ay);
        if self.finished {
            return Move {
                requested,
                applied: Acceleration { x: 0, y: 0 },
                dropped: (false, false),
                transition: Transition::Finished {
                    finish: self.position,
                },
            };
        }

        let (x, dropped_x) = roll(requested.x, self.velocity.x, self.failure_probability, rng);
        let (y, dropped_y) = roll(requested.y, self.velocity.y, self.failure_probability, rng);
        let applied = Acceleration { x, y };

        let velocity = self.velocity.accelerated(applied);
        let tentative = self.position.offset(velocity.x, velocity.y);
        self.last_position = self.position;
        self.elapsed_time += 1;

        let transition = match self.first_obstacle(self.last_position, tentative) {
            Some((pos, CellKind::Finish)) => {
                self.finished = true;
                self.position = pos;
                self.velocity = velocity;
                Transition::Finished { finish: pos }
            }
            Some((pos, _)) => {
                self.crashes += 1;
                self.velocity = Velocity::ZERO;
                if self.reset_policy == ResetPolicy::ResetToStart {
                    self.position = self.track.sample_start(rng);
                }
                Transition::Crashed { wall: pos }
            }
            None => {
                self.position = tentative;
                self.velocity = velocity;
                Transition::Moved
            }
        };

        debug!(
            "t={} accel {} -> {} {} at {} {:?}",
            self.elapsed_time, requested, applied, self.velocity, self.position, transition
        );
        Move {
            requested,
            applied,
            dropped: (dropped_x, dropped_y),
            transition,
        }
    }

    /// First wall or finish cell crossed going from `from` to `to`, in travel
    /// order. Leaving the grid counts as hitting a wall.
    fn first_obstacle(&self, from: Pos, to: Pos) -> Option<(Pos, CellKind)> {
        rasterize(from, to).into_iter().find_map(|pos| {
            let kind = self.track.get(pos).unwrap_or(CellKind::Wall);
            trace!("scan {} {:?}", pos, kind);
            match kind {
                CellKind::Wall | CellKind::Finish => Some((pos, kind)),
                CellKind::Open | CellKind::Start => None,
            }
        })
    }
}

/// Failure roll for one axis. Braking (opposite sign to the velocity) always
/// succeeds; anything else that is nonzero is dropped with `probability`.
fn roll<R: Rng + ?Sized>(
    requested: isize,
    velocity: isize,
    probability: f64,
    rng: &mut R,
) -> (isize, bool) {
    let braking = requested * velocity < 0;
    if requested != 0 && !braking && rng.gen_bool(probability) {
        (0, true)
    } else {
        (requested, false)
    }
}
