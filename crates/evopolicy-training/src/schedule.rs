//! Mutation rate that shrinks as the best score approaches the goal.

use serde::{Deserialize, Serialize};

use crate::{ConfigurationError, mutation::MutationRate};

/// Raw rate for the next generation: `1 - best / goal`.
///
/// Not clamped: scores above the goal give a negative value and negative
/// scores give a value above `1`.
#[must_use]
pub fn next_rate(best: f32, goal: f32) -> f32 {
    1.0 - best / goal
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MutationSchedule {
    goal: f32,
    floor: f32,
}

impl MutationSchedule {
    /// `goal` must be finite and non-zero; `floor` is a lower bound in `[0, 1]`
    /// applied before clamping.
    pub fn new(goal: f32, floor: f32) -> Result<Self, ConfigurationError> {
        if !goal.is_finite() || goal == 0.0 {
            return Err(ConfigurationError::InvalidGoal { goal });
        }
        let floor = MutationRate::new(floor)?.get();
        Ok(Self { goal, floor })
    }

    #[must_use]
    pub fn goal(&self) -> f32 {
        self.goal
    }

    #[must_use]
    pub fn floor(&self) -> f32 {
        self.floor
    }

    /// Rate used for the offspring of a generation whose best score is `best`.
    #[must_use]
    pub fn rate_for(&self, best: f32) -> MutationRate {
        MutationRate::clamped(next_rate(best, self.goal).max(self.floor))
    }
}
