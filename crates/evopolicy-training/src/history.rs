//! Per-generation fitness records and the series handed to plotting.

use serde::{Deserialize, Serialize};

/// Summary of one generation's fitness scores.
///
/// Non-finite scores (failed rollouts score `-inf`) are counted as failures
/// and excluded from `min`, `max` and `mean`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreSummary {
    pub min: f32,
    pub max: f32,
    pub mean: f32,
    pub failures: usize,
}

impl ScoreSummary {
    /// Returns `None` when no score is finite.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn new<I>(scores: I) -> Option<Self>
    where
        I: IntoIterator<Item = f32>,
    {
        let mut failures = 0;
        let mut finite = vec![];
        for score in scores {
            if score.is_finite() {
                finite.push(score);
            } else {
                failures += 1;
            }
        }
        let min = finite.iter().copied().reduce(f32::min)?;
        let max = finite.iter().copied().reduce(f32::max)?;
        let mean = finite.iter().sum::<f32>() / finite.len() as f32;
        Some(Self {
            min,
            max,
            mean,
            failures,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub generation: usize,
    /// Best score; `-inf` when every rollout failed.
    pub best: f32,
    /// Mean over finite scores; `-inf` when every rollout failed.
    pub mean: f32,
    pub failures: usize,
    /// Rate applied to the offspring bred from this generation.
    pub mutation_rate: f32,
}

/// Append-only log of generation records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FitnessHistory {
    records: Vec<GenerationRecord>,
}

impl FitnessHistory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: GenerationRecord) {
        self.records.push(record);
    }

    #[must_use]
    pub fn records(&self) -> &[GenerationRecord] {
        &self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn last(&self) -> Option<&GenerationRecord> {
        self.records.last()
    }

    pub fn best_series(&self) -> impl Iterator<Item = f32> + '_ {
        self.records.iter().map(|r| r.best)
    }

    pub fn mean_series(&self) -> impl Iterator<Item = f32> + '_ {
        self.records.iter().map(|r| r.mean)
    }

    /// Highest best score over all generations.
    #[must_use]
    pub fn best_ever(&self) -> Option<f32> {
        self.best_series().reduce(f32::max)
    }

    /// Series for a fitness-over-generations chart.
    #[must_use]
    pub fn plot_series(&self, acceptance: Option<f32>) -> FitnessPlot {
        FitnessPlot {
            generations: self.records.iter().map(|r| r.generation).collect(),
            best: self.best_series().collect(),
            mean: self.mean_series().collect(),
            acceptance,
        }
    }
}

/// Plain data for plotting best and mean fitness per generation, with an
/// optional horizontal acceptance line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitnessPlot {
    pub generations: Vec<usize>,
    pub best: Vec<f32>,
    pub mean: Vec<f32>,
    pub acceptance: Option<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(generation: usize, best: f32, mean: f32) -> GenerationRecord {
        GenerationRecord {
            generation,
            best,
            mean,
            failures: 0,
            mutation_rate: 0.5,
        }
    }

    #[test]
    fn test_summary_ignores_failures() {
        let summary = ScoreSummary::new([3.0, f32::NEG_INFINITY, 1.0, 2.0]).unwrap();
        assert!((summary.max - 3.0).abs() < f32::EPSILON);
        assert!((summary.min - 1.0).abs() < f32::EPSILON);
        assert!((summary.mean - 2.0).abs() < f32::EPSILON);
        assert_eq!(summary.failures, 1);
    }

    #[test]
    fn test_summary_of_only_failures() {
        assert_eq!(ScoreSummary::new([f32::NEG_INFINITY, f32::NAN]), None);
        assert_eq!(ScoreSummary::new([]), None);
    }

    #[test]
    fn test_plot_series() {
        let mut history = FitnessHistory::new();
        history.push(record(0, 10.0, 4.0));
        history.push(record(1, 30.0, 12.0));
        history.push(record(2, 25.0, 15.0));
        assert_eq!(history.best_ever(), Some(30.0));
        assert_eq!(history.last(), Some(&record(2, 25.0, 15.0)));
        let plot = history.plot_series(Some(195.0));
        assert_eq!(plot.generations, [0, 1, 2]);
        assert_eq!(plot.best, [10.0, 30.0, 25.0]);
        assert_eq!(plot.mean, [4.0, 12.0, 15.0]);
        assert_eq!(plot.acceptance, Some(195.0));
    }

    #[test]
    fn test_history_serializes_as_list() {
        let mut history = FitnessHistory::new();
        history.push(record(0, 1.0, 0.5));
        let json = serde_json::to_value(&history).unwrap();
        assert!(json.is_array());
        let back: FitnessHistory = serde_json::from_value(json).unwrap();
        assert_eq!(back, history);
    }
}
