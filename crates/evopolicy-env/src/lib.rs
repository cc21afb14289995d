//! Simulation environment contract consumed by the evolutionary trainer.
//!
//! The trainer only needs a reset/step loop, the sizes of the observation and
//! action spaces, and optional rendering. Anything implementing
//! [`Environment`] can be used as a fitness source.
//!
//! # Modules
//!
//! - [`space`]: observation/action space descriptors and [`Action`]
//! - [`frame`]: rendered frames, recordings and the [`FrameExporter`] seam
//! - [`cart_pole`]: a classic cart-pole balancing task used by the CLI and tests

pub use self::{cart_pole::CartPole, frame::*, space::*};

pub mod cart_pole;
pub mod frame;
pub mod space;

/// The environment failed during a rollout.
///
/// The trainer never retries: a failing rollout is scored with a sentinel
/// worst score and the generation continues.
#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum SimulationError {
    #[display("environment was stepped before reset")]
    NotReset,
    #[display("action {action} is not valid for action space {space}")]
    InvalidAction {
        #[error(not(source))]
        action: Action,
        #[error(not(source))]
        space: ActionSpace,
    },
    #[display("environment failure: {message}")]
    Failure {
        #[error(not(source))]
        message: String,
    },
}

impl SimulationError {
    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure {
            message: message.into(),
        }
    }
}

/// Result of one environment transition.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub observation: Vec<f32>,
    pub reward: f32,
    pub done: bool,
}

/// A sequential-decision simulation.
pub trait Environment {
    fn observation_space(&self) -> ObservationSpace;

    fn action_space(&self) -> ActionSpace;

    /// Starts a new episode and returns the initial observation.
    fn reset(&mut self) -> Result<Vec<f32>, SimulationError>;

    /// Applies `action` and advances the simulation by one step.
    fn step(&mut self, action: &Action) -> Result<Step, SimulationError>;

    /// Renders the current state.
    ///
    /// [`RenderMode::RgbArray`] returns a frame; [`RenderMode::Human`] displays
    /// the state in an environment-specific way and returns `None`.
    /// Environments without visualization keep the default.
    fn render(&mut self, mode: RenderMode) -> Result<Option<Frame>, SimulationError> {
        let _ = mode;
        Ok(None)
    }
}

impl<E> Environment for Box<E>
where
    E: Environment + ?Sized,
{
    fn observation_space(&self) -> ObservationSpace {
        (**self).observation_space()
    }

    fn action_space(&self) -> ActionSpace {
        (**self).action_space()
    }

    fn reset(&mut self) -> Result<Vec<f32>, SimulationError> {
        (**self).reset()
    }

    fn step(&mut self, action: &Action) -> Result<Step, SimulationError> {
        (**self).step(action)
    }

    fn render(&mut self, mode: RenderMode) -> Result<Option<Frame>, SimulationError> {
        (**self).render(mode)
    }
}

/// Builds private environment instances, one per rollout worker.
///
/// The seed lets the caller keep parallel evaluation reproducible. Any
/// `Fn(u64) -> E` closure is a factory.
pub trait EnvironmentFactory: Sync {
    type Env: Environment;

    fn create(&self, seed: u64) -> Self::Env;
}

impl<F, E> EnvironmentFactory for F
where
    F: Fn(u64) -> E + Sync,
    E: Environment,
{
    type Env = E;

    fn create(&self, seed: u64) -> E {
        self(seed)
    }
}
