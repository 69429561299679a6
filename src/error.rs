use thiserror::Error;

use crate::environment::Pos;

pub type Result<T> = std::result::Result<T, RaceError>;

#[derive(Debug, Error)]
pub enum RaceError {
    /// Rejected configuration value or identifier.
    #[error("invalid {field}: {reason}")]
    Config { field: &'static str, reason: String },

    /// Malformed track source. `line` is 1-based, 0 when the whole file is at fault.
    #[error("malformed track at line {line}: {reason}")]
    Format { line: usize, reason: String },

    #[error("could not read track: {0}")]
    Io(#[from] std::io::Error),

    #[error("position ({x}, {y}) is outside the {rows}x{cols} grid")]
    OutOfBounds {
        x: isize,
        y: isize,
        rows: usize,
        cols: usize,
    },

    /// Every candidate acceleration from `at` scored the wall penalty.
    #[error("no viable acceleration from {at}")]
    DegenerateDistribution { at: Pos },

    #[error("could not write report: {0}")]
    Csv(#[from] csv::Error),
}

impl RaceError {
    pub(crate) fn config(field: &'static str, reason: impl Into<String>) -> Self {
        RaceError::Config {
            field,
            reason: reason.into(),
        }
    }

    pub(crate) fn format(line: usize, reason: impl Into<String>) -> Self {
        RaceError::Format {
            line,
            reason: reason.into(),
        }
    }
}
