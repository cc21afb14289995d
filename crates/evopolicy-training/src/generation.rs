//! The generation cycle: evaluate, select, breed, mutate, record.
//!
//! # Breeding
//!
//! The `elite_count` best individuals are carried over unchanged, fitness
//! included. The remaining slots are filled with offspring:
//!
//! - **Two-parent strategies** draw each parent by tournament selection
//!   (`tournament_size` random individuals, the fittest wins). Single-point
//!   crossover keeps both children while there is room for them.
//! - **Classic differential evolution** breeds one trial child for every
//!   non-elite position of the ranked population, using that individual as
//!   the target and three donors from the [`DonorSelector`].
//!
//! # Mutation
//!
//! Only offspring are mutated. The rate comes from the
//! [`MutationSchedule`] applied to the best score of the generation that was
//! just evaluated, so mutation fades as the population nears the goal.
//!
//! # Termination
//!
//! [`GenerationLoop::step`] runs exactly one cycle; the caller decides when to
//! stop. [`GenerationLoop::run`] is a helper that stops at a generation limit
//! or when a generation's best score reaches an acceptance threshold.

use std::fmt;

use evopolicy_env::{Environment as _, EnvironmentFactory};
use evopolicy_network::{Agent, AgentFactory, Topology};
use rand::{Rng, SeedableRng as _, seq::IndexedRandom as _};
use rand_pcg::Pcg64;

use crate::{
    ConfigurationError, TrainingError,
    config::TrainingConfig,
    crossover::{self, CrossoverStrategy},
    donor::{self, DonorSelector},
    fitness::RolloutOptions,
    history::{FitnessHistory, GenerationRecord},
    mutation::MutationOperator,
    population::{self, Individual, Population},
    schedule::MutationSchedule,
};

/// Where a [`GenerationLoop`] is within its current cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, derive_more::Display)]
pub enum GenerationPhase {
    #[default]
    Evaluating,
    Selecting,
    Breeding,
    Mutating,
    Recording,
}

/// Why [`GenerationLoop::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StopReason {
    /// The generation limit was reached.
    MaxGenerations,
    /// A generation's best score reached the acceptance threshold.
    Accepted { generation: usize, score: f32 },
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MaxGenerations => write!(f, "generation limit reached"),
            Self::Accepted { generation, score } => {
                write!(f, "accepted at generation {generation} with score {score}")
            }
        }
    }
}

/// Next generation before mutation: unchanged elites and new offspring.
#[derive(Debug, Clone)]
pub struct Offspring {
    pub elites: Vec<Individual>,
    pub children: Vec<Agent>,
}

/// Selection and breeding parameters.
#[derive(Debug, Clone)]
pub struct PopulationEvolver {
    pub strategy: CrossoverStrategy,
    /// Number of top individuals preserved unchanged
    pub elite_count: usize,
    /// Tournament size for parent selection (larger = stronger selection pressure)
    pub tournament_size: usize,
}

impl PopulationEvolver {
    /// Breeds offspring from a ranked population.
    ///
    /// # Arguments
    ///
    /// * `population` - Current population (must be sorted by fitness descending)
    /// * `donors` - Donor selector for classic differential evolution
    /// * `rng` - Random number generator
    ///
    /// # Returns
    ///
    /// Elites and unmutated children; `elites.len() + children.len()` always
    /// equals the population size. An invalid donor selection is an error.
    pub fn breed<R>(
        &self,
        population: &Population,
        donors: &dyn DonorSelector,
        rng: &mut R,
    ) -> Result<Offspring, TrainingError>
    where
        R: Rng,
    {
        assert!(population.is_ranked());
        let individuals = population.individuals();
        let elite_count = self.elite_count.min(individuals.len());
        let elites = individuals[..elite_count].to_vec();
        let slots = individuals.len() - elite_count;
        let mut children = Vec::with_capacity(slots);

        match &self.strategy {
            CrossoverStrategy::DeClassic(params) => {
                for target in elite_count..individuals.len() {
                    let picked = donors.select(individuals.len(), target, &mut *rng)?;
                    donor::validate_donors(individuals.len(), target, picked)?;
                    let [d1, d2, d3] = picked.map(|i| individuals[i].agent());
                    children.push(crossover::de_classic(
                        individuals[target].agent(),
                        [d1, d2, d3],
                        params,
                        rng,
                    )?);
                }
            }
            strategy => {
                while children.len() < slots {
                    let p1 = self.select_parent(individuals, rng)?;
                    let p2 = self.select_parent(individuals, rng)?;
                    match strategy {
                        CrossoverStrategy::TwoPoint => {
                            children.push(crossover::two_point(p1, p2, rng)?);
                        }
                        CrossoverStrategy::SinglePoint => {
                            let (c1, c2) = crossover::single_point(p1, p2, rng)?;
                            children.push(c1);
                            if children.len() < slots {
                                children.push(c2);
                            }
                        }
                        CrossoverStrategy::DeUniform | CrossoverStrategy::DeClassic(_) => {
                            children.push(crossover::de_uniform(p1, p2, rng)?);
                        }
                    }
                }
            }
        }

        Ok(Offspring { elites, children })
    }

    fn select_parent<'a, R>(
        &self,
        individuals: &'a [Individual],
        rng: &mut R,
    ) -> Result<&'a Agent, ConfigurationError>
    where
        R: Rng + ?Sized,
    {
        tournament_select(individuals, self.tournament_size, rng)
            .map(Individual::agent)
            .ok_or_else(|| {
                ConfigurationError::invalid("tournament_size", "tournament selected nobody")
            })
    }
}

/// Picks `tournament_size` distinct individuals at random and returns the
/// fittest of them.
///
/// # Arguments
///
/// * `individuals` - Pool of individuals to select from
/// * `tournament_size` - Number of individuals in each tournament
/// * `rng` - Random number generator
fn tournament_select<'a, R>(
    individuals: &'a [Individual],
    tournament_size: usize,
    rng: &mut R,
) -> Option<&'a Individual>
where
    R: Rng + ?Sized,
{
    individuals
        .choose_multiple(rng, tournament_size)
        .min_by(|a, b| population::by_fitness_desc(a, b))
}

/// Owns a training run: the population, its random stream and its history.
pub struct GenerationLoop<F>
where
    F: EnvironmentFactory,
{
    envs: F,
    seed: u64,
    rng: Pcg64,
    topology: Topology,
    population: Population,
    evolver: PopulationEvolver,
    mutation: MutationOperator,
    schedule: MutationSchedule,
    donors: Box<dyn DonorSelector>,
    options: RolloutOptions,
    history: FitnessHistory,
    phase: GenerationPhase,
    generation: usize,
    champion: Option<Individual>,
}

impl<F> fmt::Debug for GenerationLoop<F>
where
    F: EnvironmentFactory,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationLoop")
            .field("seed", &self.seed)
            .field("topology", &self.topology)
            .field("population_size", &self.population.len())
            .field("phase", &self.phase)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

impl<F> GenerationLoop<F>
where
    F: EnvironmentFactory,
{
    /// Validates `config` and creates the initial population.
    ///
    /// The network topology is sized to the spaces of an environment built
    /// from `envs`.
    pub fn new(config: &TrainingConfig, envs: F) -> Result<Self, ConfigurationError> {
        config.validate()?;
        let sizing_env = envs.create(0);
        let topology = Topology::new(
            sizing_env.observation_space().dim,
            config.hidden_layers.clone(),
            sizing_env.action_space().output_width(),
        )?;
        let seed = config.seed.unwrap_or_else(|| rand::rng().random());
        log::info!("training seed: {seed}");
        log::info!(
            "topology: {:?}, population: {}, crossover: {}",
            topology.widths(),
            config.population_size,
            config.crossover,
        );

        let factory = AgentFactory::new(topology.clone(), seed, config.seed_policy);
        let population =
            Population::initialise(config.population_size, &factory, &config.crossover)?;
        Ok(Self {
            envs,
            seed,
            rng: Pcg64::seed_from_u64(seed),
            topology,
            population,
            evolver: PopulationEvolver {
                strategy: config.crossover,
                elite_count: config.elite_count,
                tournament_size: config.tournament_size,
            },
            mutation: MutationOperator::new(config.mutation)?,
            schedule: config.schedule()?,
            donors: config.donors.selector(),
            options: RolloutOptions::with_max_steps(config.max_steps),
            history: FitnessHistory::new(),
            phase: GenerationPhase::default(),
            generation: 0,
            champion: None,
        })
    }

    /// Replaces the configured donor selector.
    #[must_use]
    pub fn with_donor_selector(mut self, donors: Box<dyn DonorSelector>) -> Self {
        self.donors = donors;
        self
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    #[must_use]
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    #[must_use]
    pub fn population(&self) -> &Population {
        &self.population
    }

    #[must_use]
    pub fn history(&self) -> &FitnessHistory {
        &self.history
    }

    #[must_use]
    pub fn phase(&self) -> GenerationPhase {
        self.phase
    }

    /// Number of completed generations.
    #[must_use]
    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Fittest individual evaluated so far, across all generations.
    #[must_use]
    pub fn best_individual(&self) -> Option<&Individual> {
        self.champion.as_ref()
    }

    fn enter(&mut self, phase: GenerationPhase) {
        log::trace!("generation {}: {phase}", self.generation);
        self.phase = phase;
    }

    /// Runs one full generation and returns its record.
    pub fn step(&mut self) -> Result<GenerationRecord, TrainingError> {
        self.enter(GenerationPhase::Evaluating);
        let seeds = (0..self.population.len())
            .map(|_| self.rng.random())
            .collect::<Vec<u64>>();
        let failures = self
            .population
            .evaluate_fitness(&self.envs, &seeds, &self.options);
        if failures > 0 {
            log::warn!(
                "generation {}: {failures} of {} rollouts failed",
                self.generation,
                self.population.len()
            );
        }

        self.enter(GenerationPhase::Selecting);
        self.population.rank();
        let best = self
            .population
            .best()
            .map_or(f32::NEG_INFINITY, Individual::fitness);
        let mean = self
            .population
            .score_summary()
            .map_or(f32::NEG_INFINITY, |s| s.mean);
        if let Some(leader) = self.population.best()
            && self
                .champion
                .as_ref()
                .is_none_or(|c| leader.fitness() > c.fitness())
        {
            self.champion = Some(leader.clone());
        }
        let rate = self.schedule.rate_for(best);

        self.enter(GenerationPhase::Breeding);
        let Offspring {
            elites,
            mut children,
        } = self
            .evolver
            .breed(&self.population, self.donors.as_ref(), &mut self.rng)?;

        self.enter(GenerationPhase::Mutating);
        for child in &mut children {
            self.mutation.mutate(child, rate, &mut self.rng);
        }

        self.enter(GenerationPhase::Recording);
        let record = GenerationRecord {
            generation: self.generation,
            best,
            mean,
            failures,
            mutation_rate: rate.get(),
        };
        log::info!(
            "generation {}: best {best:.3}, mean {mean:.3}, next mutation rate {:.3}",
            record.generation,
            rate.get(),
        );
        self.history.push(record);
        let next = elites
            .into_iter()
            .chain(children.into_iter().map(Individual::new))
            .collect();
        self.population.replace(next);
        self.generation += 1;
        self.phase = GenerationPhase::Evaluating;
        Ok(record)
    }

    /// Steps until `max_generations` generations have completed or a best
    /// score reaches `acceptance`.
    ///
    /// # Returns
    ///
    /// Which of the two conditions ended the run. Generations completed by
    /// earlier calls count toward `max_generations`.
    pub fn run(
        &mut self,
        max_generations: usize,
        acceptance: Option<f32>,
    ) -> Result<StopReason, TrainingError> {
        while self.generation < max_generations {
            let record = self.step()?;
            if let Some(threshold) = acceptance
                && record.best >= threshold
            {
                log::info!(
                    "generation {}: best score {:.3} reached acceptance score {threshold}",
                    record.generation,
                    record.best
                );
                return Ok(StopReason::Accepted {
                    generation: record.generation,
                    score: record.best,
                });
            }
        }
        Ok(StopReason::MaxGenerations)
    }
}
