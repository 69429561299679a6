use log::{debug, info, warn};
use ndarray::Array2;
use ordered_float::OrderedFloat;

use crate::environment::{Acceleration, CellKind, GridTrack, Pos};
use crate::error::{RaceError, Result};

/// Absorbing value of walls and of anything outside the grid.
pub const WALL_PENALTY: f64 = -1000.0;

/// Cost of one time step.
pub const STEP_COST: f64 = -1.0;

/// Outcome of a value-iteration run.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveReport {
    pub sweeps: usize,
    pub converged: bool,
    /// Largest per-cell change seen in each sweep, in order.
    pub deltas: Vec<f64>,
}

impl SolveReport {
    pub fn final_delta(&self) -> f64 {
        self.deltas.last().copied().unwrap_or(0.0)
    }
}

/// Expected (negative) time-to-finish for every cell of a track.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueField {
    values: Array2<f64>,
}

impl ValueField {
    /// All-zero field with the track's dimensions.
    pub fn new(track: &GridTrack) -> Self {
        ValueField {
            values: Array2::zeros(track.size()),
        }
    }

    pub fn size(&self) -> (usize, usize) {
        self.values.dim()
    }

    pub fn get(&self, pos: Pos) -> Option<f64> {
        self.index(pos).map(|idx| self.values[idx])
    }

    pub fn value(&self, pos: Pos) -> Result<f64> {
        self.get(pos).ok_or_else(|| {
            let (rows, cols) = self.size();
            RaceError::OutOfBounds {
                x: pos.x,
                y: pos.y,
                rows,
                cols,
            }
        })
    }

    /// Value used when scoring moves: outside the grid is a wall.
    pub fn value_or_penalty(&self, pos: Pos) -> f64 {
        self.get(pos).unwrap_or(WALL_PENALTY)
    }

    pub fn set(&mut self, pos: Pos, value: f64) -> Result<()> {
        let idx = self.index(pos).ok_or_else(|| {
            let (rows, cols) = self.size();
            RaceError::OutOfBounds {
                x: pos.x,
                y: pos.y,
                rows,
                cols,
            }
        })?;
        self.values[idx] = value;
        Ok(())
    }

    /// Value iteration from an all-zero field.
    ///
    /// Sweeps run row-major and update in place, so later cells already see
    /// this sweep's values for earlier ones. Stops once the largest change of
    /// a sweep falls below `convergence_delta`, or after `max_sweeps`.
    pub fn solve(
        &mut self,
        track: &GridTrack,
        discount: f64,
        convergence_delta: f64,
        max_sweeps: usize,
    ) -> SolveReport {
        self.values.fill(0.0);
        let mut deltas = Vec::new();
        let mut converged = false;

        while deltas.len() < max_sweeps {
            let delta = self.sweep(track, discount);
            deltas.push(delta);
            debug!("Sweep {}: max delta {}", deltas.len(), delta);
            if delta < convergence_delta {
                converged = true;
                break;
            }
        }

        let report = SolveReport {
            sweeps: deltas.len(),
            converged,
            deltas,
        };
        if converged {
            info!(
                "Value iteration converged after {} sweeps (delta {})",
                report.sweeps,
                report.final_delta()
            );
        } else {
            warn!(
                "Value iteration stopped at the {} sweep cap without converging (delta {})",
                max_sweeps,
                report.final_delta()
            );
        }
        report
    }

    fn sweep(&mut self, track: &GridTrack, discount: f64) -> f64 {
        let mut delta: f64 = 0.0;
        for pos in track.positions() {
            let new_value = match track.get(pos) {
                Some(CellKind::Finish) => 0.0,
                Some(CellKind::Wall) => WALL_PENALTY,
                _ => self.best_backup(pos, discount),
            };
            if let Some(idx) = self.index(pos) {
                delta = delta.max((new_value - self.values[idx]).abs());
                self.values[idx] = new_value;
            }
        }
        delta
    }

    /// Bellman backup: best `STEP_COST + discount * V(neighbour)` over the
    /// nine acceleration offsets.
    fn best_backup(&self, pos: Pos, discount: f64) -> f64 {
        Acceleration::ALL
            .iter()
            .map(|a| match self.get(pos.offset(a.x, a.y)) {
                Some(v) => OrderedFloat(STEP_COST + discount * v),
                None => OrderedFloat(WALL_PENALTY),
            })
            .max()
            .map_or(WALL_PENALTY, |best| best.into_inner())
    }

    fn index(&self, pos: Pos) -> Option<(usize, usize)> {
        if pos.x < 0 || pos.y < 0 {
            return None;
        }
        let (x, y) = (pos.x as usize, pos.y as usize);
        let (rows, cols) = self.size();
        if x < rows && y < cols {
            Some((x, y))
        } else {
            None
        }
    }
}
