//! Mutation operators perturbing an agent's tensors in place.
//!
//! Weight matrices are walked row by row and bias vectors element by
//! element; each visited unit is selected with probability `rate`. For a
//! selected unit the strategy acts on its *containing vector* (the weight row
//! itself, or the whole bias vector):
//!
//! | strategy | effect |
//! |---|---|
//! | [`Swap`](MutationStrategy::Swap) | exchange positions `lo` and `hi` of the containing vector |
//! | [`Scramble`](MutationStrategy::Scramble) | shuffle `[lo, hi)` of the containing vector |
//! | [`Inverse`](MutationStrategy::Inverse) | reverse `[lo, hi)` of the containing vector |
//! | [`Gaussian`](MutationStrategy::Gaussian) | add `N(0, std_dev)` to every selected scalar |
//! | [`Uniform`](MutationStrategy::Uniform) | replace every selected scalar with `U(0, 1)` |
//!
//! `lo` and `hi` are drawn uniformly from `[0, len)` and ordered. The
//! selected scalars are the whole row for weights and the single element
//! for biases.

use std::ops::Range;

use evopolicy_network::Agent;
use rand::{Rng, seq::SliceRandom as _};
use rand_distr::Normal;
use serde::{Deserialize, Serialize};

use crate::ConfigurationError;

/// Standard deviation of gaussian mutation noise unless configured otherwise.
pub const DEFAULT_GAUSSIAN_STD_DEV: f32 = 2.0;

fn default_std_dev() -> f32 {
    DEFAULT_GAUSSIAN_STD_DEV
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum MutationStrategy {
    Swap,
    Scramble,
    Inverse,
    Gaussian {
        #[serde(default = "default_std_dev")]
        std_dev: f32,
    },
    Uniform,
}

impl Default for MutationStrategy {
    fn default() -> Self {
        Self::Gaussian {
            std_dev: DEFAULT_GAUSSIAN_STD_DEV,
        }
    }
}

/// Probability in `[0, 1]` that a row or bias element is mutated.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct MutationRate(f32);

impl MutationRate {
    pub const ZERO: Self = Self(0.0);
    pub const ONE: Self = Self(1.0);

    /// Validates a configured rate.
    pub fn new(rate: f32) -> Result<Self, ConfigurationError> {
        if (0.0..=1.0).contains(&rate) {
            Ok(Self(rate))
        } else {
            Err(ConfigurationError::InvalidMutationRate { rate })
        }
    }

    /// Forces a computed rate into `[0, 1]`; NaN becomes `0`.
    #[must_use]
    pub fn clamped(rate: f32) -> Self {
        if rate.is_nan() {
            Self::ZERO
        } else {
            Self(rate.clamp(0.0, 1.0))
        }
    }

    #[must_use]
    pub fn get(self) -> f32 {
        self.0
    }
}

/// A mutation strategy ready to be applied.
#[derive(Debug, Clone)]
pub struct MutationOperator {
    strategy: MutationStrategy,
    noise: Option<Normal<f32>>,
}

impl MutationOperator {
    /// Prepares `strategy`, rejecting a negative or non-finite gaussian deviation.
    pub fn new(strategy: MutationStrategy) -> Result<Self, ConfigurationError> {
        let noise = match strategy {
            MutationStrategy::Gaussian { std_dev } => {
                if !std_dev.is_finite() || std_dev < 0.0 {
                    return Err(ConfigurationError::invalid(
                        "gaussian std_dev",
                        format!("must be finite and non-negative, got {std_dev}"),
                    ));
                }
                Some(
                    Normal::new(0.0, std_dev).map_err(|e| {
                        ConfigurationError::invalid("gaussian std_dev", e.to_string())
                    })?,
                )
            }
            MutationStrategy::Swap
            | MutationStrategy::Scramble
            | MutationStrategy::Inverse
            | MutationStrategy::Uniform => None,
        };
        Ok(Self { strategy, noise })
    }

    /// Mutates `agent` in place: weight matrices first, then bias vectors,
    /// layer by layer.
    pub fn mutate<R>(&self, agent: &mut Agent, rate: MutationRate, rng: &mut R)
    where
        R: Rng + ?Sized,
    {
        let p = f64::from(rate.get());
        for weights in agent.coefs_mut() {
            for row in 0..weights.rows() {
                if rng.random_bool(p) {
                    let row = weights.row_mut(row);
                    let len = row.len();
                    self.apply(row, 0..len, rng);
                }
            }
        }
        for biases in agent.intercepts_mut() {
            for i in 0..biases.len() {
                if rng.random_bool(p) {
                    self.apply(biases, i..i + 1, rng);
                }
            }
        }
    }

    fn apply<R>(&self, container: &mut [f32], selected: Range<usize>, rng: &mut R)
    where
        R: Rng + ?Sized,
    {
        if container.is_empty() {
            return;
        }
        match self.strategy {
            MutationStrategy::Swap => {
                let (lo, hi) = positions(rng, container.len());
                container.swap(lo, hi);
            }
            MutationStrategy::Scramble => {
                let (lo, hi) = positions(rng, container.len());
                container[lo..hi].shuffle(rng);
            }
            MutationStrategy::Inverse => {
                let (lo, hi) = positions(rng, container.len());
                container[lo..hi].reverse();
            }
            MutationStrategy::Gaussian { .. } => {
                if let Some(noise) = &self.noise {
                    for v in &mut container[selected] {
                        *v += rng.sample(noise);
                    }
                }
            }
            MutationStrategy::Uniform => {
                for v in &mut container[selected] {
                    *v = rng.random();
                }
            }
        }
    }
}

fn positions<R>(rng: &mut R, len: usize) -> (usize, usize)
where
    R: Rng + ?Sized,
{
    let a = rng.random_range(0..len);
    let b = rng.random_range(0..len);
    if a <= b { (a, b) } else { (b, a) }
}
