//! Agents (policy networks) and their construction.
//!
//! An [`Agent`] owns one weight [`Matrix`] and one bias vector per layer.
//! Evolutionary operators address tensors through a canonical order: layer 0
//! weights, layer 0 biases, layer 1 weights, layer 1 biases, and so on
//! (see [`Agent::tensor`] and [`Agent::with_tensors`]).

use rand::Rng;
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};

use crate::{Matrix, Shape, ShapeMismatchError, Topology};

/// A feed-forward policy network.
///
/// Hidden layers use ReLU; the output layer is linear. Cloning deep-copies all
/// tensors, so a clone never aliases its source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "AgentParts", into = "AgentParts")]
pub struct Agent {
    coefs: Vec<Matrix>,
    intercepts: Vec<Vec<f32>>,
}

#[derive(Serialize, Deserialize)]
struct AgentParts {
    coefs: Vec<Matrix>,
    intercepts: Vec<Vec<f32>>,
}

impl TryFrom<AgentParts> for Agent {
    type Error = ShapeMismatchError;

    fn try_from(parts: AgentParts) -> Result<Self, Self::Error> {
        Agent::from_parts(parts.coefs, parts.intercepts)
    }
}

impl From<Agent> for AgentParts {
    fn from(agent: Agent) -> Self {
        Self {
            coefs: agent.coefs,
            intercepts: agent.intercepts,
        }
    }
}

impl Agent {
    /// Assembles an agent from weight matrices and bias vectors.
    ///
    /// Fails unless every layer's bias length matches its weight columns and
    /// consecutive layers chain (`coefs[i].cols == coefs[i + 1].rows`).
    pub fn from_parts(
        coefs: Vec<Matrix>,
        intercepts: Vec<Vec<f32>>,
    ) -> Result<Self, ShapeMismatchError> {
        if coefs.is_empty() || coefs.len() != intercepts.len() {
            return Err(ShapeMismatchError {
                expected: Shape::vector(coefs.len()),
                found: Shape::vector(intercepts.len()),
            });
        }
        for (i, (w, b)) in coefs.iter().zip(&intercepts).enumerate() {
            ShapeMismatchError::check(Shape::vector(w.cols()), Shape::vector(b.len()))?;
            if let Some(next) = coefs.get(i + 1) {
                ShapeMismatchError::check(
                    Shape::new(w.cols(), next.cols()),
                    Shape::new(next.rows(), next.cols()),
                )?;
            }
        }
        Ok(Self { coefs, intercepts })
    }

    /// Weight matrices, one per layer.
    #[must_use]
    pub fn coefs(&self) -> &[Matrix] {
        &self.coefs
    }

    pub fn coefs_mut(&mut self) -> &mut [Matrix] {
        &mut self.coefs
    }

    /// Bias vectors, one per layer.
    #[must_use]
    pub fn intercepts(&self) -> &[Vec<f32>] {
        &self.intercepts
    }

    pub fn intercepts_mut(&mut self) -> &mut [Vec<f32>] {
        &mut self.intercepts
    }

    /// Layer widths of this agent, input first.
    #[must_use]
    pub fn widths(&self) -> Vec<usize> {
        let mut widths = Vec::with_capacity(self.coefs.len() + 1);
        widths.extend(self.coefs.first().map(Matrix::rows));
        widths.extend(self.coefs.iter().map(Matrix::cols));
        widths
    }

    /// Number of tensors in canonical order (two per layer).
    #[must_use]
    pub fn tensor_count(&self) -> usize {
        self.coefs.len() * 2
    }

    /// Flat view of the `index`-th tensor in canonical order.
    #[must_use]
    pub fn tensor(&self, index: usize) -> &[f32] {
        let layer = index / 2;
        if index % 2 == 0 {
            self.coefs[layer].as_flat()
        } else {
            &self.intercepts[layer]
        }
    }

    /// Shape of the `index`-th tensor in canonical order.
    #[must_use]
    pub fn tensor_shape(&self, index: usize) -> Shape {
        let layer = index / 2;
        if index % 2 == 0 {
            self.coefs[layer].shape()
        } else {
            Shape::vector(self.intercepts[layer].len())
        }
    }

    pub fn tensor_shapes(&self) -> impl Iterator<Item = Shape> + '_ {
        (0..self.tensor_count()).map(|i| self.tensor_shape(i))
    }

    /// Fails if `other` has a different number of layers or any tensor shape differs.
    pub fn check_compatible(&self, other: &Agent) -> Result<(), ShapeMismatchError> {
        ShapeMismatchError::check(
            Shape::vector(self.tensor_count()),
            Shape::vector(other.tensor_count()),
        )?;
        for (expected, found) in self.tensor_shapes().zip(other.tensor_shapes()) {
            ShapeMismatchError::check(expected, found)?;
        }
        Ok(())
    }

    /// Builds a new agent with this agent's shapes from flat tensors in canonical order.
    pub fn with_tensors(&self, tensors: Vec<Vec<f32>>) -> Result<Agent, ShapeMismatchError> {
        ShapeMismatchError::check(
            Shape::vector(self.tensor_count()),
            Shape::vector(tensors.len()),
        )?;
        let mut coefs = Vec::with_capacity(self.coefs.len());
        let mut intercepts = Vec::with_capacity(self.intercepts.len());
        for (i, data) in tensors.into_iter().enumerate() {
            let shape = self.tensor_shape(i);
            if i % 2 == 0 {
                coefs.push(Matrix::from_flat(shape, data)?);
            } else {
                ShapeMismatchError::check(shape, Shape::vector(data.len()))?;
                intercepts.push(data);
            }
        }
        Ok(Agent { coefs, intercepts })
    }

    /// Runs the network on `observation` and returns the raw output layer.
    pub fn forward(&self, observation: &[f32]) -> Result<Vec<f32>, ShapeMismatchError> {
        let input = self.coefs.first().map_or(0, Matrix::rows);
        ShapeMismatchError::check(Shape::vector(input), Shape::vector(observation.len()))?;

        let mut activations = observation.to_vec();
        let last = self.coefs.len() - 1;
        for (i, (weights, biases)) in self.coefs.iter().zip(&self.intercepts).enumerate() {
            let mut next = biases.clone();
            for (row, x) in activations.iter().enumerate() {
                for (out, w) in next.iter_mut().zip(weights.row(row)) {
                    *out += x * w;
                }
            }
            if i < last {
                for v in &mut next {
                    *v = v.max(0.0);
                }
            }
            activations = next;
        }
        Ok(activations)
    }

    /// Returns the index of the largest output (the chosen discrete action).
    ///
    /// Ties resolve to the lowest index.
    pub fn predict(&self, observation: &[f32]) -> Result<usize, ShapeMismatchError> {
        let output = self.forward(observation)?;
        let mut best = 0;
        for (i, v) in output.iter().enumerate().skip(1) {
            if *v > output[best] {
                best = i;
            }
        }
        Ok(best)
    }
}

/// How random streams are assigned to agents created by an [`AgentFactory`].
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SeedPolicy {
    /// Every agent is initialized from the same stream, so all initial agents are identical.
    Shared,
    /// Agent `i` is initialized from its own stream derived from the seed and `i`.
    #[default]
    PerAgent,
}

/// Creates freshly initialized agents for one topology.
///
/// Weights and biases are drawn from the Glorot uniform distribution
/// `U(-b, b)` with `b = sqrt(6 / (fan_in + fan_out))`.
#[derive(Debug, Clone)]
pub struct AgentFactory {
    topology: Topology,
    seed: u64,
    policy: SeedPolicy,
}

impl AgentFactory {
    #[must_use]
    pub fn new(topology: Topology, seed: u64, policy: SeedPolicy) -> Self {
        Self {
            topology,
            seed,
            policy,
        }
    }

    #[must_use]
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Creates the `index`-th agent of a population.
    ///
    /// The result depends only on the factory's seed, its policy and `index`.
    #[must_use]
    pub fn create(&self, index: usize) -> Agent {
        let stream = match self.policy {
            SeedPolicy::Shared => 0,
            SeedPolicy::PerAgent => index as u128,
        };
        let mut rng = Pcg64::new(u128::from(self.seed), stream);
        self.create_with_rng(&mut rng)
    }

    /// Creates an agent drawing its initial parameters from `rng`.
    pub fn create_with_rng<R>(&self, rng: &mut R) -> Agent
    where
        R: Rng + ?Sized,
    {
        let mut coefs = Vec::with_capacity(self.topology.layer_count());
        let mut intercepts = Vec::with_capacity(self.topology.layer_count());
        for shape in self.topology.weight_shapes() {
            #[expect(clippy::cast_precision_loss)]
            let bound = (6.0 / (shape.rows + shape.cols) as f32).sqrt();
            coefs.push(Matrix::from_fn(shape.rows, shape.cols, |_, _| {
                rng.random_range(-bound..=bound)
            }));
            intercepts.push(
                (0..shape.cols)
                    .map(|_| rng.random_range(-bound..=bound))
                    .collect(),
            );
        }
        Agent { coefs, intercepts }
    }
}
