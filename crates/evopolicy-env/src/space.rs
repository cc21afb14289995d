use std::fmt;

use serde::{Deserialize, Serialize};

/// Continuous observation vector of a fixed length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
#[display("Box({dim})")]
pub struct ObservationSpace {
    pub dim: usize,
}

impl ObservationSpace {
    #[must_use]
    pub const fn new(dim: usize) -> Self {
        Self { dim }
    }
}

/// The set of actions an environment accepts.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::IsVariant,
)]
#[serde(rename_all = "kebab-case")]
pub enum ActionSpace {
    /// `n` mutually exclusive actions `0..n`.
    #[display("Discrete({_0})")]
    Discrete(usize),
    /// A real-valued action vector of the given dimensionality.
    #[display("Continuous({_0})")]
    Continuous(usize),
}

impl ActionSpace {
    /// Number of network outputs needed to drive this space.
    #[must_use]
    pub const fn output_width(self) -> usize {
        match self {
            Self::Discrete(n) | Self::Continuous(n) => n,
        }
    }

    #[must_use]
    pub fn contains(self, action: &Action) -> bool {
        match (self, action) {
            (Self::Discrete(n), Action::Discrete(a)) => *a < n,
            (Self::Continuous(n), Action::Continuous(v)) => v.len() == n,
            _ => false,
        }
    }
}

/// An action chosen by an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_more::IsVariant)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    Discrete(usize),
    Continuous(Vec<f32>),
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Discrete(a) => write!(f, "{a}"),
            Self::Continuous(v) => write!(f, "{v:?}"),
        }
    }
}
