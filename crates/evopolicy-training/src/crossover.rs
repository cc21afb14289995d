//! Crossover operators combining parent agents into offspring.
//!
//! Every operator works tensor by tensor in the agent's canonical order
//! (layer 0 weights, layer 0 biases, layer 1 weights, ...). Each tensor is
//! viewed flat (row-major), combined, and reshaped back to the parent's
//! shape, so offspring always have exactly the parents' topology. Parents are
//! only read; offspring own freshly allocated tensors.
//!
//! # Operators
//!
//! | operator | parents | per tensor |
//! |---|---|---|
//! | [`two_point`] | 2 | cuts `i1 <= i2`; `b` inside `[i1, i2)`, `a` elsewhere |
//! | [`single_point`] | 2 | cut `i`; children `a[..i] + b[i..]` and `b[..i] + a[i..]` |
//! | [`de_uniform`] | 2 | `a + u * (b - a)`, `u ~ U(0, 1)` per element |
//! | [`de_classic`] | target + 3 donors | `d1 + F * (d2 - d3)` where `r < CR` or at a forced index |
//!
//! Degenerate draws (empty two-point segment, a cut at index 0, a forced
//! index that would have been selected anyway) are valid outcomes.

use std::fmt;

use evopolicy_network::{Agent, ShapeMismatchError};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::ConfigurationError;

/// Parameters of classic differential-evolution crossover.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeParams {
    /// Probability `CR` that an element takes the mutant value.
    pub crossover_probability: f32,
    /// Differential weight `F` scaling `d2 - d3`.
    pub differential_weight: f32,
}

impl Default for DeParams {
    fn default() -> Self {
        Self {
            crossover_probability: 0.9,
            differential_weight: 0.8,
        }
    }
}

impl DeParams {
    /// Checks `CR` is in `[0, 1]` and `F` in `[0, 2]`.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !(0.0..=1.0).contains(&self.crossover_probability) {
            return Err(ConfigurationError::invalid(
                "crossover probability",
                format!("{} is outside [0, 1]", self.crossover_probability),
            ));
        }
        if !(0.0..=2.0).contains(&self.differential_weight) {
            return Err(ConfigurationError::invalid(
                "differential weight",
                format!("{} is outside [0, 2]", self.differential_weight),
            ));
        }
        Ok(())
    }
}

/// Breeding strategy used by the generation loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum CrossoverStrategy {
    TwoPoint,
    SinglePoint,
    DeUniform,
    DeClassic(DeParams),
}

impl Default for CrossoverStrategy {
    fn default() -> Self {
        Self::DeClassic(DeParams::default())
    }
}

impl fmt::Display for CrossoverStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::TwoPoint => "two-point",
            Self::SinglePoint => "single-point",
            Self::DeUniform => "de-uniform",
            Self::DeClassic(_) => "de-classic",
        };
        f.write_str(name)
    }
}

impl CrossoverStrategy {
    /// Smallest population the strategy can breed from.
    ///
    /// Classic DE needs a target plus three distinct donors.
    #[must_use]
    pub const fn min_population(&self) -> usize {
        match self {
            Self::TwoPoint | Self::SinglePoint | Self::DeUniform => 2,
            Self::DeClassic(_) => 4,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        match self {
            Self::DeClassic(params) => params.validate(),
            Self::TwoPoint | Self::SinglePoint | Self::DeUniform => Ok(()),
        }
    }
}

/// Two-point crossover.
///
/// For each tensor, two cut indices are drawn uniformly from `[0, len)` and
/// ordered. The child takes `b` inside `[i1, i2)` and `a` everywhere else; an
/// empty segment yields a copy of `a`.
pub fn two_point<R>(a: &Agent, b: &Agent, rng: &mut R) -> Result<Agent, ShapeMismatchError>
where
    R: Rng + ?Sized,
{
    combine(a, &[b], |tensors| {
        let [a, b] = [tensors[0], tensors[1]];
        let (lo, hi) = ordered_cuts(rng, a.len());
        let mut child = a.to_vec();
        child[lo..hi].copy_from_slice(&b[lo..hi]);
        child
    })
}

/// Single-point crossover producing two complementary children.
///
/// One cut `i` is drawn per tensor; the first child is `a[..i] + b[i..]` and
/// the second is `b[..i] + a[i..]`.
pub fn single_point<R>(
    a: &Agent,
    b: &Agent,
    rng: &mut R,
) -> Result<(Agent, Agent), ShapeMismatchError>
where
    R: Rng + ?Sized,
{
    a.check_compatible(b)?;
    let mut first = Vec::with_capacity(a.tensor_count());
    let mut second = Vec::with_capacity(a.tensor_count());
    for i in 0..a.tensor_count() {
        let (ta, tb) = (a.tensor(i), b.tensor(i));
        let cut = cut_index(rng, ta.len());
        first.push([&ta[..cut], &tb[cut..]].concat());
        second.push([&tb[..cut], &ta[cut..]].concat());
    }
    Ok((a.with_tensors(first)?, a.with_tensors(second)?))
}

/// Two-parent differential-evolution blend.
///
/// Each element is `a + u * (b - a)` with an independent `u ~ U(0, 1)`, so
/// the child lies element-wise between its parents.
pub fn de_uniform<R>(a: &Agent, b: &Agent, rng: &mut R) -> Result<Agent, ShapeMismatchError>
where
    R: Rng + ?Sized,
{
    combine(a, &[b], |tensors| {
        let [a, b] = [tensors[0], tensors[1]];
        a.iter()
            .zip(b)
            .map(|(&x, &y)| {
                let u: f32 = rng.random();
                let (lo, hi) = if x <= y { (x, y) } else { (y, x) };
                // rounding in `x + u * (y - x)` may step one ulp outside the parents
                let v = x + u * (y - x);
                if v < lo {
                    lo
                } else if v > hi {
                    hi
                } else {
                    v
                }
            })
            .collect()
    })
}

/// Classic differential-evolution crossover (`DE/rand/1/bin`).
///
/// For each tensor a forced index `R` is drawn from `[0, len)`. Element `j`
/// becomes `d1 + F * (d2 - d3)` if `r < CR` (fresh `r ~ U(0, 1)` per element)
/// or `j == R`, and keeps the target's value otherwise.
///
/// The donors should be three distinct population members other than the
/// target; choosing them is the caller's job (see [`crate::donor`]).
///
/// # Arguments
///
/// * `target` - Individual whose values are kept where no crossover happens
/// * `donors` - `[d1, d2, d3]`; `d1` is the base vector of the mutant
/// * `params` - Crossover probability `CR` and differential weight `F`
/// * `rng` - Random number generator
///
/// # Returns
///
/// The trial child, shaped like `target`. Fails if any donor's shape differs.
pub fn de_classic<R>(
    target: &Agent,
    donors: [&Agent; 3],
    params: &DeParams,
    rng: &mut R,
) -> Result<Agent, ShapeMismatchError>
where
    R: Rng + ?Sized,
{
    let [d1, d2, d3] = donors;
    let DeParams {
        crossover_probability: cr,
        differential_weight: f,
    } = *params;
    combine(target, &[d1, d2, d3], |tensors| {
        let [target, d1, d2, d3] = [tensors[0], tensors[1], tensors[2], tensors[3]];
        let forced = cut_index(rng, target.len());
        (0..target.len())
            .map(|j| {
                let r: f32 = rng.random();
                if r < cr || j == forced {
                    d1[j] + f * (d2[j] - d3[j])
                } else {
                    target[j]
                }
            })
            .collect()
    })
}

/// Builds a child by mapping the parents' flat tensors one tensor at a time.
///
/// `f` receives the `template` tensor first, followed by the `others` in order.
fn combine<F>(template: &Agent, others: &[&Agent], mut f: F) -> Result<Agent, ShapeMismatchError>
where
    F: FnMut(&[&[f32]]) -> Vec<f32>,
{
    for other in others {
        template.check_compatible(other)?;
    }
    let mut tensors = Vec::with_capacity(template.tensor_count());
    let mut views = Vec::with_capacity(others.len() + 1);
    for i in 0..template.tensor_count() {
        views.clear();
        views.push(template.tensor(i));
        views.extend(others.iter().map(|p| p.tensor(i)));
        tensors.push(f(&views));
    }
    template.with_tensors(tensors)
}

fn cut_index<R>(rng: &mut R, len: usize) -> usize
where
    R: Rng + ?Sized,
{
    if len == 0 { 0 } else { rng.random_range(0..len) }
}

fn ordered_cuts<R>(rng: &mut R, len: usize) -> (usize, usize)
where
    R: Rng + ?Sized,
{
    let i1 = cut_index(rng, len);
    let i2 = cut_index(rng, len);
    if i1 <= i2 { (i1, i2) } else { (i2, i1) }
}

#[cfg(test)]
mod tests {
    use evopolicy_network::{AgentFactory, Matrix, SeedPolicy, Shape, Topology};
    use rand::SeedableRng as _;
    use rand_pcg::Pcg64;

    use super::*;

    fn factory() -> AgentFactory {
        AgentFactory::new(
            Topology::new(3, vec![4], 2).unwrap(),
            11,
            SeedPolicy::PerAgent,
        )
    }

    fn constant_agent(value: f32) -> Agent {
        let agent = factory().create(0);
        let tensors = agent
            .tensor_shapes()
            .map(|s| vec![value; s.len()])
            .collect();
        agent.with_tensors(tensors).unwrap()
    }

    fn all_tensors(agent: &Agent) -> Vec<f32> {
        (0..agent.tensor_count())
            .flat_map(|i| agent.tensor(i).to_vec())
            .collect()
    }

    #[test]
    fn test_same_parent_is_identity() {
        let mut rng = Pcg64::seed_from_u64(0);
        let a = factory().create(0);
        for _ in 0..50 {
            assert_eq!(two_point(&a, &a, &mut rng).unwrap(), a);
            let (c1, c2) = single_point(&a, &a, &mut rng).unwrap();
            assert_eq!(c1, a);
            assert_eq!(c2, a);
        }
    }

    #[test]
    fn test_two_point_takes_one_contiguous_segment() {
        let mut rng = Pcg64::seed_from_u64(1);
        let a = constant_agent(0.0);
        let b = constant_agent(1.0);
        for _ in 0..50 {
            let child = two_point(&a, &b, &mut rng).unwrap();
            for i in 0..child.tensor_count() {
                let t = child.tensor(i);
                let ones: Vec<_> = (0..t.len()).filter(|j| t[*j] > 0.5).collect();
                if let (Some(first), Some(last)) = (ones.first(), ones.last()) {
                    assert_eq!(last - first + 1, ones.len());
                    // the segment is half-open, so the last element can never come from `b`
                    assert!(*last < t.len() - 1);
                }
            }
        }
    }

    #[test]
    fn test_single_point_children_are_complementary() {
        let mut rng = Pcg64::seed_from_u64(2);
        let a = constant_agent(0.0);
        let b = constant_agent(1.0);
        for _ in 0..50 {
            let (c1, c2) = single_point(&a, &b, &mut rng).unwrap();
            for (x, y) in all_tensors(&c1).iter().zip(all_tensors(&c2)) {
                assert!((x + y - 1.0).abs() < f32::EPSILON);
            }
            for i in 0..c1.tensor_count() {
                // a[..i] then b[i..]: values never decrease
                assert!(c1.tensor(i).is_sorted());
            }
        }
    }

    #[test]
    fn test_de_uniform_between_parents() {
        let mut rng = Pcg64::seed_from_u64(3);
        let a = factory().create(0);
        let b = factory().create(1);
        for _ in 0..100 {
            let child = de_uniform(&a, &b, &mut rng).unwrap();
            let values = all_tensors(&child);
            for ((v, x), y) in values.iter().zip(all_tensors(&a)).zip(all_tensors(&b)) {
                assert!(x.min(y) <= *v && *v <= x.max(y), "{v} not in [{x}, {y}]");
            }
        }
    }

    #[test]
    fn test_de_classic_forces_one_element_without_crossover() {
        let mut rng = Pcg64::seed_from_u64(4);
        let target = constant_agent(0.0);
        let d1 = constant_agent(0.0);
        let d2 = constant_agent(1.0);
        let d3 = constant_agent(0.0);
        let params = DeParams {
            crossover_probability: 0.0,
            differential_weight: 0.8,
        };
        for _ in 0..50 {
            let child = de_classic(&target, [&d1, &d2, &d3], &params, &mut rng).unwrap();
            for i in 0..child.tensor_count() {
                let changed: Vec<_> = child
                    .tensor(i)
                    .iter()
                    .filter(|v| v.abs() > f32::EPSILON)
                    .collect();
                assert_eq!(changed.len(), 1);
                assert!((changed[0] - 0.8).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_de_classic_full_crossover_is_mutant() {
        let mut rng = Pcg64::seed_from_u64(5);
        let target = constant_agent(5.0);
        let d1 = constant_agent(1.0);
        let d2 = constant_agent(3.0);
        let d3 = constant_agent(2.0);
        let params = DeParams {
            crossover_probability: 1.0,
            differential_weight: 0.5,
        };
        let child = de_classic(&target, [&d1, &d2, &d3], &params, &mut rng).unwrap();
        assert!(all_tensors(&child).iter().all(|v| (v - 1.5).abs() < 1e-6));
        // parents are untouched
        assert!(all_tensors(&target).iter().all(|v| (v - 5.0).abs() < 1e-6));
    }

    #[test]
    fn test_mismatched_parents_are_rejected() {
        let mut rng = Pcg64::seed_from_u64(6);
        let a = factory().create(0);
        let other = AgentFactory::new(
            Topology::new(3, vec![5], 2).unwrap(),
            11,
            SeedPolicy::PerAgent,
        )
        .create(0);
        assert!(two_point(&a, &other, &mut rng).is_err());
        assert!(single_point(&a, &other, &mut rng).is_err());
        assert!(de_uniform(&a, &other, &mut rng).is_err());
        assert!(de_classic(&a, [&a, &a, &other], &DeParams::default(), &mut rng).is_err());
    }

    #[test]
    fn test_offspring_keep_matrix_shape() {
        let mut rng = Pcg64::seed_from_u64(7);
        let a = factory().create(0);
        let b = factory().create(1);
        let child = two_point(&a, &b, &mut rng).unwrap();
        let shapes: Vec<Shape> = child.coefs().iter().map(Matrix::shape).collect();
        assert_eq!(shapes, [Shape::new(3, 4), Shape::new(4, 2)]);
    }

    #[test]
    fn test_strategy_serde() {
        let json = r#"{"type":"de-classic","crossover_probability":0.5}"#;
        let strategy: CrossoverStrategy = serde_json::from_str(json).unwrap();
        assert_eq!(
            strategy,
            CrossoverStrategy::DeClassic(DeParams {
                crossover_probability: 0.5,
                differential_weight: 0.8,
            })
        );
        let json = serde_json::to_string(&CrossoverStrategy::TwoPoint).unwrap();
        assert_eq!(json, r#"{"type":"two-point"}"#);
        assert_eq!(CrossoverStrategy::DeUniform.min_population(), 2);
    }

    #[test]
    fn test_de_params_validation() {
        assert!(DeParams::default().validate().is_ok());
        let bad = DeParams {
            crossover_probability: 1.5,
            ..DeParams::default()
        };
        assert!(bad.validate().is_err());
    }
}
