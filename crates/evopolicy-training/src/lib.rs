//! Evolutionary training of policy networks.
//!
//! This crate evolves populations of [`Agent`](evopolicy_network::Agent)s to
//! maximize the reward they collect in an
//! [`Environment`](evopolicy_env::Environment). No gradients are involved:
//! agents are scored by rollouts, and the next generation is bred from the
//! ranked population with crossover and mutation operators.
//!
//! # How Training Works
//!
//! 1. **Population** - Create a population of agents with freshly initialized tensors
//! 2. **Evaluation** - Each agent plays one episode on a private environment (in parallel)
//! 3. **Selection** - Rank agents by accumulated reward
//! 4. **Breeding** - Keep elites, create offspring with the configured crossover
//! 5. **Mutation** - Perturb offspring with a rate that decays as the best score nears the goal
//! 6. **Recording** - Append best and mean score to the fitness history
//! 7. **Repeat** - Until the caller's generation limit or acceptance score is reached
//!
//! # Architecture
//!
//! ```text
//! GenerationLoop
//!     ↓ evaluates (fitness::simulate, one thread per agent)
//! Population (ranked)
//!     ↓ bred by PopulationEvolver
//! crossover::{two_point, single_point, de_uniform, de_classic}
//!     ↓ perturbed by
//! MutationOperator  ← rate from MutationSchedule (1 - best / goal)
//!     ↓ recorded in
//! FitnessHistory → FitnessPlot
//! ```
//!
//! # Operators
//!
//! - [`crossover`] - two-point, single-point and two differential-evolution variants
//! - [`mutation`] - swap, scramble, inverse, gaussian and uniform perturbations
//! - [`schedule`] - the dynamic mutation rate
//! - [`aggregate`] - element-wise mean ("centroid") agent of a population
//! - [`donor`] - donor selection for classic differential evolution
//!
//! # Example
//!
//! ```rust,no_run
//! use evopolicy_env::CartPole;
//! use evopolicy_training::{config::TrainingConfig, generation::GenerationLoop};
//!
//! let config = TrainingConfig::default();
//! let mut training = GenerationLoop::new(&config, CartPole::new).unwrap();
//! let reason = training
//!     .run(config.max_generations, config.acceptance_score)
//!     .unwrap();
//! println!("stopped: {reason:?}");
//! ```
//!
//! # Reproducibility
//!
//! All randomness of a run flows from a single seeded generator owned by the
//! [`GenerationLoop`](generation::GenerationLoop). Environment seeds for the
//! parallel evaluation phase are drawn from it before worker threads start,
//! so the thread schedule never affects results.
//!
//! # Current Limitations
//!
//! - **One episode per evaluation**: fitness is the reward of a single rollout, so noisy
//!   environments produce noisy rankings
//! - **No restart mechanism**: a converged population is only perturbed by the mutation rate,
//!   which itself shrinks as the best score approaches the goal

use evopolicy_network::{InvalidTopologyError, ShapeMismatchError};

use crate::crossover::CrossoverStrategy;

pub mod aggregate;
pub mod config;
pub mod crossover;
pub mod donor;
pub mod fitness;
pub mod generation;
pub mod history;
pub mod mutation;
pub mod population;
pub mod schedule;

/// Invalid training setup, detected before any generation runs.
#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum ConfigurationError {
    #[display(
        "population of {size} is too small for {strategy} crossover (needs at least {required})"
    )]
    PopulationTooSmall {
        size: usize,
        required: usize,
        #[error(not(source))]
        strategy: CrossoverStrategy,
    },
    #[display("{_0}")]
    InvalidTopology(InvalidTopologyError),
    #[display("mutation rate {rate} is outside [0, 1]")]
    InvalidMutationRate {
        #[error(not(source))]
        rate: f32,
    },
    #[display("goal score must be finite and non-zero, got {goal}")]
    InvalidGoal {
        #[error(not(source))]
        goal: f32,
    },
    #[display("invalid {name}: {reason}")]
    InvalidParameter {
        #[error(not(source))]
        name: &'static str,
        #[error(not(source))]
        reason: String,
    },
    #[display("donor selection for target {target} returned {donors:?}")]
    InvalidDonors {
        target: usize,
        #[error(not(source))]
        donors: [usize; 3],
    },
}

impl From<InvalidTopologyError> for ConfigurationError {
    fn from(err: InvalidTopologyError) -> Self {
        Self::InvalidTopology(err)
    }
}

impl ConfigurationError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// Fatal error that stops a training run.
#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum TrainingError {
    #[display("{_0}")]
    Configuration(ConfigurationError),
    #[display("{_0}")]
    ShapeMismatch(ShapeMismatchError),
}
