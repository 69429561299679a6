use std::fmt;
use std::str::FromStr;

use ordered_float::OrderedFloat;
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::agent::Velocity;
use crate::environment::{Acceleration, Pos};
use crate::error::{RaceError, Result};
use crate::value::{ValueField, WALL_PENALTY};

/// Online update rule applied after every control step.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningStrategy {
    /// Bootstraps from the best candidate.
    QLearning,
    /// Bootstraps from the candidate actually taken.
    Sarsa,
}

impl LearningStrategy {
    pub fn target(self, max_reward: f64, sampled_reward: f64) -> f64 {
        match self {
            LearningStrategy::QLearning => max_reward,
            LearningStrategy::Sarsa => sampled_reward,
        }
    }
}

impl FromStr for LearningStrategy {
    type Err = RaceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "q" | "qlearning" | "q_learning" | "q-learning" => Ok(LearningStrategy::QLearning),
            "s" | "sarsa" => Ok(LearningStrategy::Sarsa),
            _ => Err(RaceError::config(
                "learning_strategy",
                format!("unknown strategy {:?}, expected 'q' or 'sarsa'", s),
            )),
        }
    }
}

impl fmt::Display for LearningStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LearningStrategy::QLearning => "q_learning",
            LearningStrategy::Sarsa => "sarsa",
        })
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Candidate {
    pub acceleration: Acceleration,
    /// Where the car would land if the acceleration took effect.
    pub landing: Pos,
    pub reward: f64,
}

/// The nine candidate accelerations from one state, scored against the field.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateScores {
    candidates: [Candidate; 9],
    max_reward: f64,
}

impl CandidateScores {
    /// Scores each acceleration by the field value where it would land.
    /// Velocity is capped the same way the car caps it; landing outside the
    /// grid scores `WALL_PENALTY`.
    pub fn score(field: &ValueField, position: Pos, velocity: Velocity) -> Self {
        let candidates = Acceleration::ALL.map(|acceleration| {
            let v = velocity.accelerated(acceleration);
            let landing = position.offset(v.x, v.y);
            Candidate {
                acceleration,
                landing,
                reward: field.value_or_penalty(landing),
            }
        });
        let max_reward = candidates
            .iter()
            .map(|c| OrderedFloat(c.reward))
            .max()
            .map_or(WALL_PENALTY, |r| r.into_inner());
        CandidateScores {
            candidates,
            max_reward,
        }
    }

    pub fn candidates(&self) -> &[Candidate; 9] {
        &self.candidates
    }

    pub fn max_reward(&self) -> f64 {
        self.max_reward
    }

    /// Softmax weights `exp(reward)`; wall-penalty candidates weigh nothing.
    pub fn weights(&self) -> [f64; 9] {
        self.candidates.map(|c| {
            if c.reward > WALL_PENALTY {
                c.reward.exp()
            } else {
                0.0
            }
        })
    }

    /// Picks a candidate with probability `exp(reward) / total`. Fails when
    /// no candidate carries any weight.
    pub fn sample<R: Rng + ?Sized>(&self, at: Pos, rng: &mut R) -> Result<Candidate> {
        let weights = self.weights();
        let total: f64 = weights.iter().sum();
        if !(total > 0.0) {
            return Err(RaceError::DegenerateDistribution { at });
        }
        let dist = WeightedIndex::new(weights)
            .map_err(|_| RaceError::DegenerateDistribution { at })?;
        Ok(self.candidates[dist.sample(rng)])
    }
}

/// Temporal-difference step of `value` towards `target`.
pub fn td_update(value: f64, target: f64, learning_rate: f64) -> f64 {
    value + learning_rate * (target - value)
}
