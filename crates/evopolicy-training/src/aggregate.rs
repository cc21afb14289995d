//! Element-wise mean ("centroid") of a set of agents.

use evopolicy_network::{Agent, ShapeMismatchError};

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum AggregateError {
    #[display("cannot average an empty set of agents")]
    Empty,
    #[display("{_0}")]
    ShapeMismatch(ShapeMismatchError),
}

impl From<ShapeMismatchError> for AggregateError {
    fn from(err: ShapeMismatchError) -> Self {
        Self::ShapeMismatch(err)
    }
}

/// Computes the element-wise mean of every tensor across `agents`.
///
/// All agents must share the first agent's shapes.
#[expect(clippy::cast_precision_loss)]
pub fn average_agent<'a, I>(agents: I) -> Result<Agent, AggregateError>
where
    I: IntoIterator<Item = &'a Agent>,
{
    let mut agents = agents.into_iter();
    let first = agents.next().ok_or(AggregateError::Empty)?;
    let mut sums = (0..first.tensor_count())
        .map(|i| first.tensor(i).to_vec())
        .collect::<Vec<_>>();
    let mut count = 1;
    for agent in agents {
        first.check_compatible(agent)?;
        for (i, sum) in sums.iter_mut().enumerate() {
            for (s, v) in sum.iter_mut().zip(agent.tensor(i)) {
                *s += v;
            }
        }
        count += 1;
    }
    let n = count as f32;
    for sum in &mut sums {
        for s in sum.iter_mut() {
            *s /= n;
        }
    }
    Ok(first.with_tensors(sums)?)
}
