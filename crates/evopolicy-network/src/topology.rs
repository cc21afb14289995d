use serde::{Deserialize, Serialize};

use crate::Shape;

/// Hidden layer widths used when nothing else is configured: one layer of four units.
pub const DEFAULT_HIDDEN_LAYERS: [usize; 1] = [4];

/// A layer width of zero was requested.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("invalid topology: {layer} layer width must be positive")]
pub struct InvalidTopologyError {
    #[error(not(source))]
    pub layer: LayerKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum LayerKind {
    #[display("input")]
    Input,
    #[display("hidden layer #{_0}")]
    Hidden(usize),
    #[display("output")]
    Output,
}

/// Layer widths of a fully connected network, input first.
///
/// Every agent of a population is built from the same topology, which is what
/// keeps their tensors shape-compatible for crossover and averaging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<usize>", into = "Vec<usize>")]
pub struct Topology {
    widths: Vec<usize>,
}

impl Topology {
    /// Creates a topology from input width, hidden widths and output width.
    ///
    /// # Examples
    ///
    /// ```
    /// use evopolicy_network::Topology;
    ///
    /// let topology = Topology::new(4, vec![4], 2).unwrap();
    /// assert_eq!(topology.layer_count(), 2);
    /// assert!(Topology::new(0, vec![4], 2).is_err());
    /// ```
    pub fn new(
        input: usize,
        hidden: Vec<usize>,
        output: usize,
    ) -> Result<Self, InvalidTopologyError> {
        let mut widths = Vec::with_capacity(hidden.len() + 2);
        widths.push(input);
        widths.extend(hidden);
        widths.push(output);
        Self::from_widths(widths)
    }

    fn from_widths(widths: Vec<usize>) -> Result<Self, InvalidTopologyError> {
        let last = widths.len().saturating_sub(1);
        if widths.len() < 2 {
            return Err(InvalidTopologyError {
                layer: LayerKind::Output,
            });
        }
        if let Some(i) = widths.iter().position(|w| *w == 0) {
            let layer = match i {
                0 => LayerKind::Input,
                i if i == last => LayerKind::Output,
                i => LayerKind::Hidden(i - 1),
            };
            return Err(InvalidTopologyError { layer });
        }
        Ok(Self { widths })
    }

    #[must_use]
    pub fn input_width(&self) -> usize {
        self.widths[0]
    }

    #[must_use]
    pub fn output_width(&self) -> usize {
        self.widths[self.widths.len() - 1]
    }

    /// Number of weight/bias layers (one fewer than the number of widths).
    #[must_use]
    pub fn layer_count(&self) -> usize {
        self.widths.len() - 1
    }

    #[must_use]
    pub fn widths(&self) -> &[usize] {
        &self.widths
    }

    /// Weight matrix shapes, one per layer: `n_i x n_{i+1}`.
    pub fn weight_shapes(&self) -> impl Iterator<Item = Shape> + '_ {
        self.widths.windows(2).map(|w| Shape::new(w[0], w[1]))
    }

    /// Bias vector shapes, one per layer.
    pub fn bias_shapes(&self) -> impl Iterator<Item = Shape> + '_ {
        self.widths[1..].iter().map(|w| Shape::vector(*w))
    }

    /// Total number of trainable scalars.
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.weight_shapes()
            .chain(self.bias_shapes())
            .map(Shape::len)
            .sum()
    }
}

impl TryFrom<Vec<usize>> for Topology {
    type Error = InvalidTopologyError;

    fn try_from(widths: Vec<usize>) -> Result<Self, Self::Error> {
        Self::from_widths(widths)
    }
}

impl From<Topology> for Vec<usize> {
    fn from(topology: Topology) -> Self {
        topology.widths
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shapes() {
        let topology = Topology::new(3, vec![4], 2).unwrap();
        let weights: Vec<_> = topology.weight_shapes().collect();
        let biases: Vec<_> = topology.bias_shapes().collect();
        assert_eq!(weights, [Shape::new(3, 4), Shape::new(4, 2)]);
        assert_eq!(biases, [Shape::vector(4), Shape::vector(2)]);
        assert_eq!(topology.parameter_count(), 12 + 8 + 4 + 2);
    }

    #[test]
    fn test_rejects_zero_width() {
        assert_eq!(
            Topology::new(3, vec![4, 0], 2).unwrap_err().layer,
            LayerKind::Hidden(1)
        );
        assert_eq!(
            Topology::new(3, vec![4], 0).unwrap_err().layer,
            LayerKind::Output
        );
        assert_eq!(
            Topology::new(0, vec![], 2).unwrap_err().layer,
            LayerKind::Input
        );
    }
}
