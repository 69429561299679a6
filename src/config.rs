use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{RaceError, Result};
use crate::rl::LearningStrategy;

/// What happens to the car after it hits a wall.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetPolicy {
    /// Velocity drops to zero, the car keeps its position.
    StopInPlace,
    /// Velocity drops to zero and the car goes back to a random start cell.
    ResetToStart,
}

impl FromStr for ResetPolicy {
    type Err = RaceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "s" | "stop" | "stop_in_place" | "stop-in-place" => Ok(ResetPolicy::StopInPlace),
            "r" | "reset" | "reset_to_start" | "reset-to-start" => Ok(ResetPolicy::ResetToStart),
            _ => Err(RaceError::config(
                "reset_policy",
                format!("unknown policy {:?}, expected 'stop' or 'reset'", s),
            )),
        }
    }
}

impl fmt::Display for ResetPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResetPolicy::StopInPlace => "stop",
            ResetPolicy::ResetToStart => "reset",
        })
    }
}

/// Everything the solver and driver need besides the track itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceConfig {
    pub reset_policy: ResetPolicy,
    pub learning_strategy: LearningStrategy,
    pub discount_rate: f64,
    pub convergence_delta: f64,
    pub learning_rate: f64,
    pub failure_probability: f64,
    pub random_seed: u64,
    /// Upper bound on value-iteration sweeps.
    pub max_sweeps: usize,
    /// Upper bound on control steps in one episode.
    pub max_steps: usize,
}

impl Default for RaceConfig {
    fn default() -> Self {
        RaceConfig {
            reset_policy: ResetPolicy::StopInPlace,
            learning_strategy: LearningStrategy::QLearning,
            discount_rate: 0.9,
            convergence_delta: 0.001,
            learning_rate: 0.9,
            failure_probability: 0.2,
            random_seed: 1,
            max_sweeps: 10_000,
            max_steps: 10_000,
        }
    }
}

impl RaceConfig {
    pub fn validate(&self) -> Result<()> {
        open_unit("discount_rate", self.discount_rate)?;
        open_unit("learning_rate", self.learning_rate)?;
        if !(self.convergence_delta > 0.0 && self.convergence_delta.is_finite()) {
            return Err(RaceError::config(
                "convergence_delta",
                format!("{} must be a positive number", self.convergence_delta),
            ));
        }
        if !(0.0..=1.0).contains(&self.failure_probability) {
            return Err(RaceError::config(
                "failure_probability",
                format!("{} is not in [0, 1]", self.failure_probability),
            ));
        }
        if self.max_sweeps == 0 {
            return Err(RaceError::config("max_sweeps", "must be at least 1"));
        }
        if self.max_steps == 0 {
            return Err(RaceError::config("max_steps", "must be at least 1"));
        }
        Ok(())
    }
}

fn open_unit(field: &'static str, value: f64) -> Result<()> {
    if value > 0.0 && value < 1.0 {
        Ok(())
    } else {
        Err(RaceError::config(field, format!("{} is not in (0, 1)", value)))
    }
}
