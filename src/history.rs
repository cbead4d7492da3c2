//! Per-second score timeline
//!
//! Lives only for one session and feeds the end-screen chart through
//! [`crate::sim::SessionSummary`].

use serde::{Deserialize, Serialize};

/// One `(time, score)` sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreSample {
    /// Seconds since the session started
    pub time: f32,
    pub score: u64,
}

/// Score over time, sampled once per second
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreTimeline {
    samples: Vec<ScoreSample>,
    /// Time of the next sample
    next_sample: f32,
}

impl ScoreTimeline {
    /// Sampling period in seconds
    pub const INTERVAL: f32 = 1.0;

    pub fn new() -> Self {
        Self::default()
    }

    /// Record a sample for every whole interval passed by `elapsed`
    pub fn record(&mut self, elapsed: f32, score: u64) {
        while elapsed >= self.next_sample {
            self.samples.push(ScoreSample {
                time: self.next_sample,
                score,
            });
            self.next_sample += Self::INTERVAL;
        }
    }

    pub fn samples(&self) -> &[ScoreSample] {
        &self.samples
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.next_sample = 0.0;
    }
}
