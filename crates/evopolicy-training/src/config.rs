//! Training run configuration.

use evopolicy_network::{DEFAULT_HIDDEN_LAYERS, SeedPolicy, Topology};
use serde::{Deserialize, Serialize};

use crate::{
    ConfigurationError,
    crossover::CrossoverStrategy,
    donor::DonorPolicy,
    mutation::{MutationOperator, MutationStrategy},
    schedule::MutationSchedule,
};

/// Everything needed to start a [`GenerationLoop`](crate::generation::GenerationLoop).
///
/// Missing fields take their defaults when deserialized, so a JSON file only
/// needs to list what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrainingConfig {
    pub population_size: usize,
    /// Hidden layer widths; input and output widths come from the environment.
    pub hidden_layers: Vec<usize>,
    /// Seed of the run; drawn from OS entropy when absent.
    pub seed: Option<u64>,
    pub seed_policy: SeedPolicy,
    pub crossover: CrossoverStrategy,
    pub mutation: MutationStrategy,
    pub donors: DonorPolicy,
    /// Score at which the mutation rate reaches its floor.
    pub goal_score: f32,
    /// Lower bound of the mutation rate.
    pub min_mutation_rate: f32,
    pub elite_count: usize,
    pub tournament_size: usize,
    pub max_generations: usize,
    /// Step budget of one rollout.
    pub max_steps: Option<usize>,
    /// Stop early once a generation's best score reaches this value.
    pub acceptance_score: Option<f32>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            population_size: 20,
            hidden_layers: DEFAULT_HIDDEN_LAYERS.to_vec(),
            seed: None,
            seed_policy: SeedPolicy::default(),
            crossover: CrossoverStrategy::default(),
            mutation: MutationStrategy::default(),
            donors: DonorPolicy::default(),
            goal_score: 500.0,
            min_mutation_rate: 0.0,
            elite_count: 2,
            tournament_size: 2,
            max_generations: 50,
            max_steps: Some(500),
            acceptance_score: None,
        }
    }
}

impl TrainingConfig {
    /// Rejects configurations that cannot run.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.crossover.validate()?;
        let required = self.crossover.min_population();
        if self.population_size < required {
            return Err(ConfigurationError::PopulationTooSmall {
                size: self.population_size,
                required,
                strategy: self.crossover,
            });
        }
        // input and output widths are placeholders until the environment is known
        Topology::new(1, self.hidden_layers.clone(), 1)?;
        MutationOperator::new(self.mutation)?;
        self.schedule()?;
        if self.elite_count >= self.population_size {
            return Err(ConfigurationError::invalid(
                "elite_count",
                format!(
                    "{} leaves no room for offspring in a population of {}",
                    self.elite_count, self.population_size
                ),
            ));
        }
        if !(1..=self.population_size).contains(&self.tournament_size) {
            return Err(ConfigurationError::invalid(
                "tournament_size",
                format!("must be in 1..={}", self.population_size),
            ));
        }
        if self.max_steps == Some(0) {
            return Err(ConfigurationError::invalid("max_steps", "must be positive"));
        }
        Ok(())
    }

    /// Mutation rate schedule derived from `goal_score` and `min_mutation_rate`.
    pub fn schedule(&self) -> Result<MutationSchedule, ConfigurationError> {
        MutationSchedule::new(self.goal_score, self.min_mutation_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        TrainingConfig::default().validate().unwrap();
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: TrainingConfig = serde_json::from_str(
            r#"{"population_size": 8, "crossover": {"type": "two-point"}, "seed": 3}"#,
        )
        .unwrap();
        assert_eq!(config.population_size, 8);
        assert_eq!(config.crossover, CrossoverStrategy::TwoPoint);
        assert_eq!(config.seed, Some(3));
        assert_eq!(config.hidden_layers, [4]);
        assert_eq!(config.max_steps, Some(500));
        assert!(serde_json::from_str::<TrainingConfig>(r#"{"populaton_size": 8}"#).is_err());
    }

    #[test]
    fn test_rejects_small_population() {
        let config = TrainingConfig {
            population_size: 3,
            ..TrainingConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::PopulationTooSmall { required: 4, .. })
        ));
        let config = TrainingConfig {
            population_size: 3,
            crossover: CrossoverStrategy::SinglePoint,
            ..TrainingConfig::default()
        };
        config.validate().unwrap();
    }

    #[test]
    fn test_rejects_bad_parameters() {
        let cases = [
            TrainingConfig {
                goal_score: 0.0,
                ..TrainingConfig::default()
            },
            TrainingConfig {
                min_mutation_rate: 1.5,
                ..TrainingConfig::default()
            },
            TrainingConfig {
                hidden_layers: vec![4, 0],
                ..TrainingConfig::default()
            },
            TrainingConfig {
                elite_count: 20,
                ..TrainingConfig::default()
            },
            TrainingConfig {
                tournament_size: 0,
                ..TrainingConfig::default()
            },
            TrainingConfig {
                mutation: MutationStrategy::Gaussian { std_dev: -2.0 },
                ..TrainingConfig::default()
            },
            TrainingConfig {
                max_steps: Some(0),
                ..TrainingConfig::default()
            },
        ];
        for config in cases {
            assert!(config.validate().is_err(), "{config:?}");
        }
    }
}
