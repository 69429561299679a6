use std::fmt;
use std::fs::File;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// How an episode ended.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Finished,
    /// Every candidate move scored the wall penalty.
    Stalled,
    /// The step budget ran out first.
    OutOfSteps,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Outcome::Finished => "finished",
            Outcome::Stalled => "stalled",
            Outcome::OutOfSteps => "out of steps",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeSummary {
    pub episode: usize,
    pub outcome: Outcome,
    pub elapsed_time: u32,
    pub steps: usize,
    pub crashes: u32,
    pub final_x: isize,
    pub final_y: isize,
}

/// Aggregate over a batch of episodes.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingStats {
    pub episodes: usize,
    pub finished: usize,
    /// Mean elapsed time over finished episodes.
    pub mean_finish_time: Option<f64>,
    pub best_finish_time: Option<u32>,
}

impl TrainingStats {
    pub fn from_summaries(summaries: &[EpisodeSummary]) -> Self {
        let times: Vec<u32> = summaries
            .iter()
            .filter(|s| s.outcome == Outcome::Finished)
            .map(|s| s.elapsed_time)
            .collect();
        let mean_finish_time = if times.is_empty() {
            None
        } else {
            Some(times.iter().map(|&t| f64::from(t)).sum::<f64>() / times.len() as f64)
        };
        TrainingStats {
            episodes: summaries.len(),
            finished: times.len(),
            mean_finish_time,
            best_finish_time: times.iter().copied().min(),
        }
    }
}

/// Writes one CSV row per episode, with a header.
pub fn write_summaries<W: io::Write>(writer: W, summaries: &[EpisodeSummary]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for summary in summaries {
        wtr.serialize(summary)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_summaries_to_path(path: impl AsRef<Path>, summaries: &[EpisodeSummary]) -> Result<()> {
    let file = File::create(path)?;
    write_summaries(file, summaries)
}
