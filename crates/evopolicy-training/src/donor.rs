//! Donor selection for classic differential evolution.
//!
//! Each non-elite target position of the ranked population gets three donor
//! indices `[d1, d2, d3]`. Valid selections contain three distinct indices,
//! none of them equal to the target. The generation loop checks this
//! contract and rejects a selector that breaks it.

use rand::{RngCore, seq::index};
use serde::{Deserialize, Serialize};

use crate::ConfigurationError;

pub trait DonorSelector: Send + Sync {
    /// Picks donors for `target` in a population of `population_len`
    /// individuals ranked best first.
    fn select(
        &self,
        population_len: usize,
        target: usize,
        rng: &mut dyn RngCore,
    ) -> Result<[usize; 3], ConfigurationError>;
}

/// Uniform sample without replacement from every index except the target
/// (DE/rand/1).
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomDistinctDonors;

impl DonorSelector for RandomDistinctDonors {
    fn select(
        &self,
        population_len: usize,
        target: usize,
        rng: &mut dyn RngCore,
    ) -> Result<[usize; 3], ConfigurationError> {
        let mut donors = [0; 3];
        sample_excluding(population_len, &[target], rng, &mut donors)?;
        Ok(donors)
    }
}

/// Uses the best individual as base donor `d1` and two random others
/// (DE/best/1). Falls back to random donors when the target is the best.
#[derive(Debug, Clone, Copy, Default)]
pub struct BestBaseDonors;

impl DonorSelector for BestBaseDonors {
    fn select(
        &self,
        population_len: usize,
        target: usize,
        rng: &mut dyn RngCore,
    ) -> Result<[usize; 3], ConfigurationError> {
        if target == 0 {
            return RandomDistinctDonors.select(population_len, target, rng);
        }
        let mut donors = [0; 3];
        sample_excluding(population_len, &[target, 0], rng, &mut donors[1..])?;
        Ok(donors)
    }
}

/// Configurable choice of [`DonorSelector`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DonorPolicy {
    #[default]
    RandomDistinct,
    BestBase,
}

impl DonorPolicy {
    #[must_use]
    pub fn selector(self) -> Box<dyn DonorSelector> {
        match self {
            Self::RandomDistinct => Box::new(RandomDistinctDonors),
            Self::BestBase => Box::new(BestBaseDonors),
        }
    }
}

/// Fills `out` with distinct indices in `0..len` that are not in `excluded`.
fn sample_excluding(
    len: usize,
    excluded: &[usize],
    rng: &mut dyn RngCore,
    out: &mut [usize],
) -> Result<(), ConfigurationError> {
    let available = len.saturating_sub(excluded.len());
    if excluded.iter().any(|&e| e >= len) || available < out.len() {
        return Err(ConfigurationError::invalid(
            "donor selection",
            format!(
                "need {} donors besides {excluded:?} in a population of {len}",
                out.len()
            ),
        ));
    }
    let mut excluded = excluded.to_vec();
    excluded.sort_unstable();
    let picks = index::sample(rng, available, out.len());
    for (slot, mut i) in out.iter_mut().zip(picks.iter()) {
        // map 0..available onto 0..len skipping excluded indices
        for &e in &excluded {
            if i >= e {
                i += 1;
            }
        }
        *slot = i;
    }
    Ok(())
}

/// Checks the donor contract for a selection returned by any selector.
pub fn validate_donors(
    population_len: usize,
    target: usize,
    donors: [usize; 3],
) -> Result<(), ConfigurationError> {
    let [a, b, c] = donors;
    let distinct = a != b && b != c && a != c;
    let in_range = donors.iter().all(|&d| d < population_len);
    if distinct && in_range && !donors.contains(&target) {
        Ok(())
    } else {
        Err(ConfigurationError::InvalidDonors { target, donors })
    }
}
