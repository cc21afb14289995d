//! Feed-forward policy networks evolved by `evopolicy-training`.
//!
//! An [`Agent`] is a stack of dense layers: one weight [`Matrix`] and one bias
//! vector per layer, ReLU on hidden layers and an identity output layer. The
//! network is never trained by gradient descent; its tensors are read and
//! rewritten directly by the evolutionary operators.
//!
//! # Example
//!
//! ```
//! use evopolicy_network::{AgentFactory, SeedPolicy, Topology};
//!
//! let topology = Topology::new(3, vec![4], 2).unwrap();
//! let factory = AgentFactory::new(topology, 7, SeedPolicy::PerAgent);
//! let agent = factory.create(0);
//!
//! let action = agent.predict(&[0.1, -0.2, 0.3]).unwrap();
//! assert!(action < 2);
//! ```

pub use self::{agent::*, tensor::*, topology::*};

pub mod agent;
pub mod tensor;
pub mod topology;
