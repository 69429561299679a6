use log::{debug, info, warn};
use rand::Rng;

use crate::agent::{Move, Velocity, VehicleState};
use crate::config::RaceConfig;
use crate::environment::{GridTrack, Pos};
use crate::error::{RaceError, Result};
use crate::report::{EpisodeSummary, Outcome};
use crate::rl::{td_update, Candidate, CandidateScores, LearningStrategy};
use crate::value::{SolveReport, ValueField};

/// Everything that happened during one control step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepRecord {
    pub position: Pos,
    pub velocity: Velocity,
    pub chosen: Candidate,
    pub max_reward: f64,
    pub target: f64,
    /// Value stored at `position` after the update.
    pub updated_value: f64,
    pub movement: Move,
}

/// Drives a car with a softmax policy over a solved value field and keeps
/// refining the field online.
#[derive(Debug, Clone)]
pub struct Driver {
    config: RaceConfig,
    values: ValueField,
    solve_report: SolveReport,
}

impl Driver {
    /// Validates `config` and solves the value field for `track`.
    pub fn new(track: &GridTrack, config: RaceConfig) -> Result<Self> {
        config.validate()?;
        let mut values = ValueField::new(track);
        let solve_report = values.solve(
            track,
            config.discount_rate,
            config.convergence_delta,
            config.max_sweeps,
        );
        Ok(Driver {
            config,
            values,
            solve_report,
        })
    }

    pub fn config(&self) -> &RaceConfig {
        &self.config
    }

    pub fn strategy(&self) -> LearningStrategy {
        self.config.learning_strategy
    }

    pub fn values(&self) -> &ValueField {
        &self.values
    }

    pub fn solve_report(&self) -> &SolveReport {
        &self.solve_report
    }

    /// Throws away online updates and solves the field again.
    pub fn resolve(&mut self, track: &GridTrack) -> &SolveReport {
        self.solve_report = self.values.solve(
            track,
            self.config.discount_rate,
            self.config.convergence_delta,
            self.config.max_sweeps,
        );
        &self.solve_report
    }

    /// One control step: score the nine accelerations, sample one, apply it,
    /// then pull the value of the cell the car left towards the strategy's
    /// target.
    pub fn step<R: Rng + ?Sized>(
        &mut self,
        vehicle: &mut VehicleState<'_>,
        rng: &mut R,
    ) -> Result<StepRecord> {
        let position = vehicle.position();
        let velocity = vehicle.velocity();

        let scores = CandidateScores::score(&self.values, position, velocity);
        let chosen = scores.sample(position, rng)?;
        let movement = vehicle.accelerate(chosen.acceleration.x, chosen.acceleration.y, rng);

        let max_reward = scores.max_reward();
        let target = self.config.learning_strategy.target(max_reward, chosen.reward);
        let updated_value = td_update(self.values.value(position)?, target, self.config.learning_rate);
        self.values.set(position, updated_value)?;

        debug!(
            "{} {} chose {} (reward {:.3}, best {:.3}) -> {:?}",
            position, velocity, chosen.acceleration, chosen.reward, max_reward, movement.transition
        );
        Ok(StepRecord {
            position,
            velocity,
            chosen,
            max_reward,
            target,
            updated_value,
            movement,
        })
    }

    /// Steps until the car finishes, gets boxed in, or the step budget runs out.
    pub fn run_episode<R: Rng + ?Sized>(
        &mut self,
        vehicle: &mut VehicleState<'_>,
        rng: &mut R,
    ) -> Result<EpisodeSummary> {
        let mut steps = 0;
        let mut outcome = Outcome::OutOfSteps;
        while steps < self.config.max_steps {
            if vehicle.is_finished() {
                break;
            }
            match self.step(vehicle, rng) {
                Ok(_) => steps += 1,
                Err(RaceError::DegenerateDistribution { at }) => {
                    warn!("No viable move from {} at t={}", at, vehicle.elapsed_time());
                    outcome = Outcome::Stalled;
                    break;
                }
                Err(e) => return Err(e),
            }
        }
        if vehicle.is_finished() {
            outcome = Outcome::Finished;
        } else if outcome == Outcome::OutOfSteps {
            warn!("Step budget of {} exhausted", self.config.max_steps);
        }

        Ok(EpisodeSummary {
            episode: 0,
            outcome,
            elapsed_time: vehicle.elapsed_time(),
            steps,
            crashes: vehicle.crashes(),
            final_x: vehicle.position().x,
            final_y: vehicle.position().y,
        })
    }

    /// Runs `episodes` episodes in a row, each with a fresh car on a random
    /// start cell. The value field carries over between them.
    pub fn train<R: Rng + ?Sized>(
        &mut self,
        track: &GridTrack,
        episodes: usize,
        rng: &mut R,
    ) -> Result<Vec<EpisodeSummary>> {
        let mut summaries = Vec::with_capacity(episodes);
        for episode in 1..=episodes {
            let mut vehicle = VehicleState::new(
                track,
                self.config.reset_policy,
                self.config.failure_probability,
                rng,
            )?;
            let summary = EpisodeSummary {
                episode,
                ..self.run_episode(&mut vehicle, rng)?
            };
            info!(
                "Episode {}: {} after {} steps (time {}, {} crashes)",
                episode, summary.outcome, summary.steps, summary.elapsed_time, summary.crashes
            );
            summaries.push(summary);
        }
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Transition;
    use crate::config::ResetPolicy;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    const ROOM: &str = "5,5\n#####\n#S..#\n#...#\n#..F#\n#####\n";

    fn config(strategy: LearningStrategy) -> RaceConfig {
        RaceConfig {
            learning_strategy: strategy,
            failure_probability: 0.0,
            ..RaceConfig::default()
        }
    }

    #[test]
    fn q_learning_pulls_value_to_best_candidate() {
        let track: GridTrack = ROOM.parse().unwrap();
        let mut driver = Driver::new(&track, config(LearningStrategy::QLearning)).unwrap();
        assert!(driver.solve_report().converged);
        let before = driver.values().value(Pos::new(1, 1)).unwrap();

        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let mut car = VehicleState::at(&track, Pos::new(1, 1), ResetPolicy::StopInPlace, 0.0).unwrap();
        let record = driver.step(&mut car, &mut rng).unwrap();

        assert_eq!(record.position, Pos::new(1, 1));
        assert_eq!(record.target, record.max_reward);
        let expected = before + 0.9 * (record.max_reward - before);
        assert!((record.updated_value - expected).abs() < 1e-12);
        assert_eq!(driver.values().value(Pos::new(1, 1)).unwrap(), record.updated_value);
        assert_eq!(car.elapsed_time(), 1);
    }

    #[test]
    fn sarsa_pulls_value_to_sampled_candidate() {
        let track: GridTrack = ROOM.parse().unwrap();
        let mut driver = Driver::new(&track, config(LearningStrategy::Sarsa)).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(22);
        let mut car = VehicleState::at(&track, Pos::new(1, 1), ResetPolicy::StopInPlace, 0.0).unwrap();

        let record = driver.step(&mut car, &mut rng).unwrap();
        assert_eq!(record.target, record.chosen.reward);
        assert_eq!(record.movement.requested, record.chosen.acceleration);
    }

    #[test]
    fn step_surfaces_a_dead_end() {
        let lane: GridTrack = "1,3\nS.F\n".parse().unwrap();
        let mut driver = Driver::new(&lane, config(LearningStrategy::QLearning)).unwrap();
        for pos in lane.positions() {
            driver.values.set(pos, crate::value::WALL_PENALTY).unwrap();
        }
        let poisoned = driver.values().clone();
        let mut rng = ChaCha8Rng::seed_from_u64(23);
        let mut car = VehicleState::at(&lane, Pos::new(0, 0), ResetPolicy::StopInPlace, 0.0).unwrap();

        match driver.step(&mut car, &mut rng) {
            Err(RaceError::DegenerateDistribution { at }) => assert_eq!(at, Pos::new(0, 0)),
            other => panic!("expected a dead end, got {:?}", other),
        }
        // Nothing moved and nothing was learned.
        assert_eq!(car.elapsed_time(), 0);
        assert_eq!(car.position(), Pos::new(0, 0));
        assert_eq!(driver.values(), &poisoned);
    }

    #[test]
    fn episode_reports_stalled_car() {
        let track: GridTrack = "5,5\n#####\n#S..#\n#...#\n#..F#\n#####\n".parse().unwrap();
        let mut driver = Driver::new(&track, config(LearningStrategy::QLearning)).unwrap();
        // Poison every cell the car could land on.
        for pos in track.positions() {
            if track.get(pos) != Some(crate::environment::CellKind::Finish) {
                driver.values.set(pos, crate::value::WALL_PENALTY).unwrap();
            }
        }
        let mut rng = ChaCha8Rng::seed_from_u64(24);
        let mut car = VehicleState::at(&track, Pos::new(1, 1), ResetPolicy::StopInPlace, 0.0).unwrap();
        let summary = driver.run_episode(&mut car, &mut rng).unwrap();
        assert_eq!(summary.outcome, Outcome::Stalled);
        assert_eq!(summary.steps, 0);
        assert_eq!(car.elapsed_time(), 0);
    }

    #[test]
    fn episode_stops_at_the_step_budget() {
        let track: GridTrack = ROOM.parse().unwrap();
        let mut driver = Driver::new(
            &track,
            RaceConfig {
                max_steps: 1,
                failure_probability: 1.0,
                ..RaceConfig::default()
            },
        )
        .unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(25);
        let mut car = VehicleState::at(&track, Pos::new(1, 1), ResetPolicy::StopInPlace, 1.0).unwrap();
        let summary = driver.run_episode(&mut car, &mut rng).unwrap();
        // Every acceleration from rest fails, so the car cannot move.
        assert_eq!(summary.outcome, Outcome::OutOfSteps);
        assert_eq!(summary.steps, 1);
        assert_eq!(summary.elapsed_time, 1);
    }

    #[test]
    fn short_room_is_finished() {
        let track: GridTrack = ROOM.parse().unwrap();
        let mut driver = Driver::new(&track, config(LearningStrategy::QLearning)).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(26);
        let mut finished = 0;
        for summary in driver.train(&track, 20, &mut rng).unwrap() {
            assert!(summary.steps <= driver.config().max_steps);
            assert_ne!(summary.outcome, Outcome::OutOfSteps);
            if summary.outcome == Outcome::Finished {
                finished += 1;
                assert_eq!((summary.final_x, summary.final_y), (3, 3));
            }
        }
        assert!(finished > 0);
    }

    #[test]
    fn resolve_discards_online_updates() {
        let track: GridTrack = ROOM.parse().unwrap();
        let mut driver = Driver::new(&track, config(LearningStrategy::QLearning)).unwrap();
        let solved = driver.values().clone();
        let mut rng = ChaCha8Rng::seed_from_u64(27);
        let mut car = VehicleState::at(&track, Pos::new(1, 1), ResetPolicy::StopInPlace, 0.0).unwrap();
        let record = driver.step(&mut car, &mut rng).unwrap();
        assert!(matches!(
            record.movement.transition,
            Transition::Moved | Transition::Finished { .. }
        ));

        driver.resolve(&track);
        assert_eq!(driver.values(), &solved);
    }

    #[test]
    fn rejects_invalid_config() {
        let track: GridTrack = ROOM.parse().unwrap();
        let bad = RaceConfig {
            discount_rate: 1.5,
            ..RaceConfig::default()
        };
        assert!(matches!(Driver::new(&track, bad), Err(RaceError::Config { .. })));
    }
}
