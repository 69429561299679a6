//! Racetrack driving on a discrete grid.
//!
//! A car moves over a [`GridTrack`] under noisy acceleration. A [`ValueField`]
//! is solved by value iteration, then a [`Driver`] steers the car with a
//! softmax policy over that field and refines it online with Q-learning or
//! SARSA.

pub mod agent;
pub mod config;
pub mod environment;
pub mod error;
pub mod policy;
pub mod raster;
pub mod report;
pub mod rl;
pub mod value;

pub use agent::{Move, Transition, Velocity, VehicleState, MAX_SPEED};
pub use config::{RaceConfig, ResetPolicy};
pub use environment::{Acceleration, CellKind, GridTrack, Pos};
pub use error::{RaceError, Result};
pub use policy::{Driver, StepRecord};
pub use raster::rasterize;
pub use report::{EpisodeSummary, Outcome, TrainingStats};
pub use rl::LearningStrategy;
pub use value::{SolveReport, ValueField, WALL_PENALTY};
