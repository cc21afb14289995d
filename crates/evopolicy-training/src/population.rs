//! Individuals and the population evaluated together each generation.

use std::{
    cmp::Ordering,
    thread::{self, ScopedJoinHandle},
};

use evopolicy_env::EnvironmentFactory;
use evopolicy_network::{Agent, AgentFactory};

use crate::{
    ConfigurationError,
    aggregate::{self, AggregateError},
    crossover::CrossoverStrategy,
    fitness::{self, RolloutOptions},
    history::ScoreSummary,
};

/// An agent and the score of its most recent rollout.
#[derive(Debug, Clone, PartialEq)]
pub struct Individual {
    agent: Agent,
    fitness: f32,
}

impl Individual {
    /// Wraps an agent that has not been evaluated yet.
    #[must_use]
    pub fn new(agent: Agent) -> Self {
        Self {
            agent,
            fitness: f32::NEG_INFINITY,
        }
    }

    #[must_use]
    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    /// Score of the last rollout; `-inf` before evaluation or after a failure.
    #[must_use]
    pub fn fitness(&self) -> f32 {
        self.fitness
    }
}

/// Descending fitness with NaN treated as the worst score.
pub(crate) fn by_fitness_desc(a: &Individual, b: &Individual) -> Ordering {
    rank_key(b.fitness).total_cmp(&rank_key(a.fitness))
}

fn rank_key(fitness: f32) -> f32 {
    if fitness.is_nan() {
        f32::NEG_INFINITY
    } else {
        fitness
    }
}

/// An ordered collection of individuals with identical topologies.
#[derive(Debug, Clone)]
pub struct Population {
    individuals: Vec<Individual>,
}

impl Population {
    /// Creates `size` fresh agents.
    ///
    /// # Arguments
    ///
    /// * `size` - Number of individuals; must be large enough for `strategy`
    ///   to find its parents
    /// * `factory` - Source of initial agents, `factory.create(i)` for slot `i`
    /// * `strategy` - Crossover strategy the population will be bred with
    pub fn initialise(
        size: usize,
        factory: &AgentFactory,
        strategy: &CrossoverStrategy,
    ) -> Result<Self, ConfigurationError> {
        let required = strategy.min_population();
        if size < required {
            return Err(ConfigurationError::PopulationTooSmall {
                size,
                required,
                strategy: *strategy,
            });
        }
        let individuals = (0..size)
            .map(|i| Individual::new(factory.create(i)))
            .collect();
        Ok(Self { individuals })
    }

    /// Wraps already built agents as unevaluated individuals.
    #[must_use]
    pub fn from_agents<I>(agents: I) -> Self
    where
        I: IntoIterator<Item = Agent>,
    {
        Self {
            individuals: agents.into_iter().map(Individual::new).collect(),
        }
    }

    #[must_use]
    pub fn individuals(&self) -> &[Individual] {
        &self.individuals
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.individuals.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty()
    }

    /// Scores every individual with one rollout on its own environment.
    ///
    /// Rollouts run in parallel, one scoped thread per individual. A failing
    /// rollout scores `-inf` and is logged.
    ///
    /// # Arguments
    ///
    /// * `envs` - Builds a private environment for each individual
    /// * `seeds` - Environment seed per individual (same length as the population)
    /// * `options` - Rollout options shared by every individual
    ///
    /// # Returns
    ///
    /// Number of rollouts that failed
    pub fn evaluate_fitness<F>(
        &mut self,
        envs: &F,
        seeds: &[u64],
        options: &RolloutOptions,
    ) -> usize
    where
        F: EnvironmentFactory + ?Sized,
    {
        assert_eq!(seeds.len(), self.individuals.len());
        let failed = thread::scope(|s| {
            let handles = self
                .individuals
                .iter_mut()
                .zip(seeds)
                .enumerate()
                .map(|(index, (ind, &seed))| {
                    ind.fitness = f32::NEG_INFINITY;
                    s.spawn(move || {
                        let mut env = envs.create(seed);
                        match fitness::simulate(&ind.agent, &mut env, options) {
                            Ok(rollout) => {
                                ind.fitness = rollout.score;
                                true
                            }
                            Err(e) => {
                                log::warn!("rollout of individual {index} failed: {e}");
                                false
                            }
                        }
                    })
                })
                .collect::<Vec<_>>();
            handles
                .into_iter()
                .map(ScopedJoinHandle::join)
                .filter(|r| !matches!(r, Ok(true)))
                .count()
        });
        for (index, ind) in self.individuals.iter().enumerate() {
            log::debug!("individual {index}: fitness {}", ind.fitness);
        }
        failed
    }

    /// Sorts individuals by fitness, best first.
    pub fn rank(&mut self) {
        self.individuals.sort_by(by_fitness_desc);
    }

    #[must_use]
    pub fn is_ranked(&self) -> bool {
        self.individuals
            .is_sorted_by(|a, b| by_fitness_desc(a, b) != Ordering::Greater)
    }

    /// Individual with the highest fitness.
    #[must_use]
    pub fn best(&self) -> Option<&Individual> {
        self.individuals.iter().min_by(|a, b| by_fitness_desc(a, b))
    }

    #[must_use]
    pub fn score_summary(&self) -> Option<ScoreSummary> {
        ScoreSummary::new(self.individuals.iter().map(|ind| ind.fitness))
    }

    /// Element-wise mean of every agent in the population.
    pub fn average_agent(&self) -> Result<Agent, AggregateError> {
        aggregate::average_agent(self.individuals.iter().map(|ind| &ind.agent))
    }

    /// Replaces the population with the next generation.
    pub fn replace(&mut self, individuals: Vec<Individual>) {
        self.individuals = individuals;
    }
}
